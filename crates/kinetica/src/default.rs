//! The process-wide default [`System`] and free functions operating on it.
//!
//! One default system is created lazily on first use. It can be replaced
//! with [`set_default_system`]; every free function below then operates on
//! the replacement. Each call locks the system for its duration, so the free
//! functions are safe to call from several threads.

use kinetica_compile::{CompileError, CompileOptions, Evaluator};
use kinetica_core::{
    Base, CoordinateSpec, Drawing3D, Expr, Frame, GravityDirection, IntoComponents, Matrix,
    Operand, Point, Ref, Result, Solid, Symbol, System, Target, Tensor3D, Vector3D, Wrench3D,
    WrenchKind, globals,
};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, LazyLock};
use tracing::debug;

pub type SharedSystem = Arc<Mutex<System>>;

static DEFAULT_SYSTEM: LazyLock<RwLock<SharedSystem>> =
    LazyLock::new(|| RwLock::new(Arc::new(Mutex::new(System::new()))));

pub fn get_default_system() -> SharedSystem {
    DEFAULT_SYSTEM.read().clone()
}

/// Makes `system` the default and returns the previous default.
pub fn set_default_system(system: SharedSystem) -> SharedSystem {
    debug!("default system replaced");
    std::mem::replace(&mut *DEFAULT_SYSTEM.write(), system)
}

/// Replaces the default with a fresh [`System`] and returns it.
pub fn reset_default_system() -> SharedSystem {
    let system = Arc::new(Mutex::new(System::new()));
    set_default_system(system.clone());
    system
}

/// Runs `f` with the default system locked.
///
/// The lock is not reentrant: inside `f`, work only through the `&mut System`
/// it is given. Calling a free function of this module from `f` deadlocks.
pub fn with_default_system<R>(f: impl FnOnce(&mut System) -> R) -> R {
    let system = get_default_system();
    let mut guard = system.lock();
    f(&mut guard)
}

// ---- process-wide settings ----

pub fn set_atomization_state(enabled: bool) {
    globals::set_atomization_state(enabled);
}

pub fn enable_atomization() {
    globals::set_atomization_state(true);
}

pub fn disable_atomization() {
    globals::set_atomization_state(false);
}

pub fn get_atomization_state() -> bool {
    globals::atomization_state()
}

pub fn set_gravity_direction(direction: GravityDirection) {
    globals::set_gravity_direction(direction);
}

pub fn set_gravity_up() {
    globals::set_gravity_direction(GravityDirection::Up);
}

pub fn set_gravity_down() {
    globals::set_gravity_direction(GravityDirection::Down);
}

pub fn get_gravity_direction() -> GravityDirection {
    globals::gravity_direction()
}

// ---- symbols ----

pub fn new_parameter(name: &str, value: impl Into<Operand>) -> Result<Symbol> {
    with_default_system(|sys| sys.new_parameter(name, value))
}

pub fn new_input(name: &str, value: impl Into<Operand>) -> Result<Symbol> {
    with_default_system(|sys| sys.new_input(name, value))
}

pub fn new_joint_unknown(name: &str, value: impl Into<Operand>) -> Result<Symbol> {
    with_default_system(|sys| sys.new_joint_unknown(name, value))
}

pub fn new_coordinate(name: &str, spec: impl Into<CoordinateSpec>) -> Result<[Symbol; 3]> {
    with_default_system(|sys| sys.new_coordinate(name, spec))
}

pub fn new_aux_coordinate(name: &str, spec: impl Into<CoordinateSpec>) -> Result<[Symbol; 3]> {
    with_default_system(|sys| sys.new_aux_coordinate(name, spec))
}

pub fn get_symbol(name: &str) -> Result<Symbol> {
    with_default_system(|sys| sys.get_symbol(name))
}

pub fn get_time() -> Symbol {
    with_default_system(|sys| sys.get_time())
}

pub fn get_coordinates() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_coordinates())
}

pub fn get_velocities() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_velocities())
}

pub fn get_accelerations() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_accelerations())
}

pub fn get_parameters() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_parameters())
}

pub fn get_inputs() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_inputs())
}

pub fn get_joint_unknowns() -> Vec<Symbol> {
    with_default_system(|sys| sys.get_joint_unknowns())
}

pub fn get_coordinates_matrix() -> Result<Matrix> {
    with_default_system(|sys| sys.get_coordinates_matrix())
}

pub fn get_velocities_matrix() -> Result<Matrix> {
    with_default_system(|sys| sys.get_velocities_matrix())
}

pub fn get_accelerations_matrix() -> Result<Matrix> {
    with_default_system(|sys| sys.get_accelerations_matrix())
}

pub fn get_value(target: impl Into<Target>) -> Result<f64> {
    with_default_system(|sys| sys.get_value(target))
}

pub fn set_value(target: impl Into<Target>, value: impl Into<Operand>) -> Result<()> {
    with_default_system(|sys| sys.set_value(target, value))
}

pub fn get_tex_name(target: impl Into<Target>) -> Result<String> {
    with_default_system(|sys| sys.get_tex_name(target))
}

pub fn set_tex_name(target: impl Into<Target>, tex: &str) -> Result<()> {
    with_default_system(|sys| sys.set_tex_name(target, tex))
}

// ---- entities ----

pub fn new_base<'a>(
    name: &str,
    previous: impl Into<Ref<'a, Base>>,
    axis: [f64; 3],
    angle: impl Into<Expr>,
) -> Result<Base> {
    with_default_system(|sys| sys.new_base(name, previous, axis, angle))
}

pub fn new_point<'a, 'b>(
    name: &str,
    previous: impl Into<Ref<'a, Point>>,
    position: impl Into<Ref<'b, Vector3D>>,
) -> Result<Point> {
    with_default_system(|sys| sys.new_point(name, previous, position))
}

pub fn new_vector<'a>(
    name: &str,
    components: impl IntoComponents,
    base: impl Into<Ref<'a, Base>>,
) -> Result<Vector3D> {
    with_default_system(|sys| sys.new_vector(name, components, base))
}

pub fn new_tensor<'a>(
    name: &str,
    matrix: Matrix,
    base: impl Into<Ref<'a, Base>>,
) -> Result<Tensor3D> {
    with_default_system(|sys| sys.new_tensor(name, matrix, base))
}

pub fn new_matrix(name: &str, matrix: Matrix) -> Result<Matrix> {
    with_default_system(|sys| sys.new_matrix(name, matrix))
}

pub fn new_frame<'a, 'b>(
    name: &str,
    point: impl Into<Ref<'a, Point>>,
    base: impl Into<Ref<'b, Base>>,
    scale: f64,
) -> Result<Frame> {
    with_default_system(|sys| sys.new_frame(name, point, base, scale))
}

pub fn set_frame_point<'a, 'b>(
    frame: impl Into<Ref<'a, Frame>>,
    point: impl Into<Ref<'b, Point>>,
) -> Result<Frame> {
    with_default_system(|sys| sys.set_frame_point(frame, point))
}

pub fn new_solid<'a, 'b, 'c, 'd>(
    name: &str,
    point: impl Into<Ref<'a, Point>>,
    base: impl Into<Ref<'b, Base>>,
    mass: impl Into<Target>,
    cm: impl Into<Ref<'c, Vector3D>>,
    inertia: impl Into<Ref<'d, Tensor3D>>,
) -> Result<Solid> {
    with_default_system(|sys| sys.new_solid(name, point, base, mass, cm, inertia))
}

pub fn new_wrench<'a, 'b, 'c, 'd>(
    name: &str,
    force: impl Into<Ref<'a, Vector3D>>,
    moment: impl Into<Ref<'b, Vector3D>>,
    point: impl Into<Ref<'c, Point>>,
    solid: impl Into<Ref<'d, Solid>>,
    kind: WrenchKind,
) -> Result<Wrench3D> {
    with_default_system(|sys| sys.new_wrench(name, force, moment, point, solid, kind))
}

pub fn new_drawing(name: &str, drawing: Drawing3D) -> Result<Drawing3D> {
    with_default_system(|sys| sys.new_drawing(name, drawing))
}

pub fn set_drawing_vector<'a>(name: &str, vector: impl Into<Ref<'a, Vector3D>>) -> Result<()> {
    with_default_system(|sys| sys.set_drawing_vector(name, vector))
}

pub fn get_base(name: &str) -> Result<Base> {
    with_default_system(|sys| sys.get_base(name))
}

pub fn get_point(name: &str) -> Result<Point> {
    with_default_system(|sys| sys.get_point(name))
}

pub fn get_frame(name: &str) -> Result<Frame> {
    with_default_system(|sys| sys.get_frame(name))
}

pub fn get_solid(name: &str) -> Result<Solid> {
    with_default_system(|sys| sys.get_solid(name))
}

pub fn get_vector(name: &str) -> Result<Vector3D> {
    with_default_system(|sys| sys.get_vector(name))
}

pub fn get_tensor(name: &str) -> Result<Tensor3D> {
    with_default_system(|sys| sys.get_tensor(name))
}

pub fn get_wrench(name: &str) -> Result<Wrench3D> {
    with_default_system(|sys| sys.get_wrench(name))
}

// ---- derivation ----

pub fn rotation_matrix<'a, 'b>(
    a: impl Into<Ref<'a, Base>>,
    b: impl Into<Ref<'b, Base>>,
) -> Result<Matrix> {
    with_default_system(|sys| sys.rotation_matrix(a, b))
}

pub fn position_vector<'a, 'b>(
    a: impl Into<Ref<'a, Point>>,
    b: impl Into<Ref<'b, Point>>,
) -> Result<Vector3D> {
    with_default_system(|sys| sys.position_vector(a, b))
}

pub fn velocity_vector<'a>(point: impl Into<Ref<'a, Point>>) -> Result<Vector3D> {
    with_default_system(|sys| sys.velocity_vector(point))
}

pub fn acceleration_vector<'a>(point: impl Into<Ref<'a, Point>>) -> Result<Vector3D> {
    with_default_system(|sys| sys.acceleration_vector(point))
}

pub fn angular_velocity<'a>(base: impl Into<Ref<'a, Base>>) -> Result<Vector3D> {
    with_default_system(|sys| sys.angular_velocity(base))
}

pub fn angular_acceleration<'a>(base: impl Into<Ref<'a, Base>>) -> Result<Vector3D> {
    with_default_system(|sys| sys.angular_acceleration(base))
}

pub fn twist<'a>(solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
    with_default_system(|sys| sys.twist(solid))
}

pub fn gravity_wrench<'a>(solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
    with_default_system(|sys| sys.gravity_wrench(solid))
}

pub fn inertia_wrench<'a>(solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
    with_default_system(|sys| sys.inertia_wrench(solid))
}

pub fn derivative(operand: impl Into<Operand>) -> Result<Operand> {
    with_default_system(|sys| sys.derivative(operand))
}

pub fn diff(operand: impl Into<Operand>, symbol: impl Into<Target>) -> Result<Operand> {
    with_default_system(|sys| sys.diff(operand, symbol))
}

pub fn jacobian<'a>(row: impl Into<Ref<'a, Matrix>>, vars: impl Into<Operand>) -> Result<Matrix> {
    with_default_system(|sys| sys.jacobian(row, vars))
}

pub fn dot(a: &Vector3D, b: &Vector3D) -> Result<Expr> {
    with_default_system(|sys| sys.dot(a, b))
}

pub fn cross(a: &Vector3D, b: &Vector3D) -> Result<Vector3D> {
    with_default_system(|sys| sys.cross(a, b))
}

pub fn subs(
    operand: impl Into<Operand>,
    old: impl Into<Operand>,
    new: impl Into<Operand>,
) -> Result<Operand> {
    with_default_system(|sys| sys.subs(operand, old, new))
}

pub fn unatomize(operand: impl Into<Operand>) -> Operand {
    with_default_system(|sys| sys.unatomize(operand))
}

pub fn compile_numeric_function(
    target: impl Into<Operand>,
    options: CompileOptions,
) -> Result<Evaluator, CompileError> {
    with_default_system(|sys| kinetica_compile::compile_numeric_function(sys, target, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let before = get_gravity_direction();
        set_gravity_up();
        assert_eq!(get_gravity_direction(), GravityDirection::Up);
        set_gravity_down();
        assert_eq!(get_gravity_direction(), GravityDirection::Down);
        set_gravity_direction(before);

        let before = get_atomization_state();
        disable_atomization();
        assert!(!get_atomization_state());
        enable_atomization();
        assert!(get_atomization_state());
        set_atomization_state(before);
    }
}
