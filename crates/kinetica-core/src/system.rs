//! The model facade: one symbol registry plus one entity graph.
//!
//! Constructors validate every referenced name before mutating anything, so
//! a failed `new_*` call leaves the system unchanged.

use crate::{
    error::{EntityKind, Error, Result},
    expr::Expr,
    geometry::{
        Base, Drawing3D, EntityGraph, Frame, Point, Ref, Solid, Tensor3D, Vector3D, Wrench3D,
        WrenchKind, vector::IntoComponents,
    },
    matrix::Matrix,
    operand::{Operand, Target},
    symbol::{CoordinateSpec, Symbol, SymbolKind, SymbolRegistry, SystemId, ValueTable},
};
use tracing::debug;

/// Value of the gravity parameter `g` created with every system.
pub const DEFAULT_GRAVITY: f64 = 9.8;

#[derive(Debug)]
pub struct System {
    id: SystemId,
    symbols: SymbolRegistry,
    graph: EntityGraph,
    time: Symbol,
    gravity: Symbol,
    xyz: Base,
    origin: Point,
    abs: Frame,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    /// A system with time `t`, parameter `g`, base `xyz`, point `O` and
    /// frame `abs` already defined.
    pub fn new() -> Self {
        let id = SystemId::next();
        let mut symbols = SymbolRegistry::new(id);
        let time = symbols.push("t", SymbolKind::Time, 0.0);
        let gravity = symbols.push("g", SymbolKind::Parameter, DEFAULT_GRAVITY);

        let mut graph = EntityGraph::new(id);
        let xyz = graph.add_base("xyz", None, [0.0, 0.0, 1.0], Expr::zero());
        let origin = graph.add_point("O", None, None);
        let abs = graph.add_frame("abs", origin.clone(), xyz.clone(), 1.0);
        debug!(system = ?id, "created system");

        Self {
            id,
            symbols,
            graph,
            time,
            gravity,
            xyz,
            origin,
            abs,
        }
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.symbols
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Shared table of current symbol values, read by compiled evaluators.
    pub fn values(&self) -> &ValueTable {
        self.symbols.values()
    }

    pub fn get_time(&self) -> Symbol {
        self.time.clone()
    }

    /// The gravity magnitude parameter `g`.
    pub fn gravity(&self) -> Symbol {
        self.gravity.clone()
    }

    pub fn xyz(&self) -> &Base {
        &self.xyz
    }

    pub fn origin(&self) -> &Point {
        &self.origin
    }

    pub fn abs(&self) -> &Frame {
        &self.abs
    }

    // ---- symbols ----

    pub fn new_symbol(&mut self, name: &str, kind: SymbolKind, value: f64) -> Result<Symbol> {
        let symbol = self.symbols.new_symbol(name, kind, value)?;
        debug!(name, kind = kind.as_str(), value, "new symbol");
        Ok(symbol)
    }

    pub fn new_parameter(&mut self, name: &str, value: impl Into<Operand>) -> Result<Symbol> {
        let value = numeric_value("new_parameter", value.into())?;
        self.new_symbol(name, SymbolKind::Parameter, value)
    }

    pub fn new_input(&mut self, name: &str, value: impl Into<Operand>) -> Result<Symbol> {
        let value = numeric_value("new_input", value.into())?;
        self.new_symbol(name, SymbolKind::Input, value)
    }

    pub fn new_joint_unknown(&mut self, name: &str, value: impl Into<Operand>) -> Result<Symbol> {
        let value = numeric_value("new_joint_unknown", value.into())?;
        self.new_symbol(name, SymbolKind::JointUnknown, value)
    }

    /// Creates `name` with its velocity and acceleration (`d<name>` and
    /// `dd<name>` unless named in `spec`).
    pub fn new_coordinate(
        &mut self,
        name: &str,
        spec: impl Into<CoordinateSpec>,
    ) -> Result<[Symbol; 3]> {
        let triple = self.symbols.new_coordinate(name, false, spec.into())?;
        debug!(name, "new coordinate");
        Ok(triple)
    }

    pub fn new_aux_coordinate(
        &mut self,
        name: &str,
        spec: impl Into<CoordinateSpec>,
    ) -> Result<[Symbol; 3]> {
        let triple = self.symbols.new_coordinate(name, true, spec.into())?;
        debug!(name, "new aux coordinate");
        Ok(triple)
    }

    pub fn get_symbol(&self, name: &str) -> Result<Symbol> {
        self.symbols.get(name)
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.find(name).is_some()
    }

    pub fn get_symbols(&self) -> Vec<Symbol> {
        self.symbols.list(None).cloned().collect()
    }

    pub fn get_symbols_matrix(&self) -> Matrix {
        Matrix::column(self.get_symbols())
    }

    fn symbol_of_kind(&self, name: &str, kind: SymbolKind) -> Result<Symbol> {
        match self.symbols.find(name) {
            Some(s) if s.kind() == kind => Ok(s.clone()),
            _ => Err(Error::lookup(EntityKind::Symbol, format!("{kind} {name}"))),
        }
    }

    fn symbols_of(&self, kind: SymbolKind) -> Vec<Symbol> {
        self.symbols.list(Some(kind)).cloned().collect()
    }

    /// Resolves a symbol given by name, handle or single-symbol expression.
    pub fn resolve_symbol(&self, target: impl Into<Target>) -> Result<Symbol> {
        match target.into() {
            Target::Name(name) => self.symbols.get(&name),
            Target::Symbol(symbol) => {
                self.symbols.check_owned(&symbol)?;
                Ok(symbol)
            }
            Target::Other(operand) => Err(Error::TypeMismatch {
                context: "symbol argument",
                expected: "symbol or symbol name",
                found: operand.kind().as_str(),
            }),
        }
    }

    pub fn get_value(&self, target: impl Into<Target>) -> Result<f64> {
        let symbol = self.resolve_symbol(target)?;
        self.symbols.value(&symbol)
    }

    pub fn set_value(&self, target: impl Into<Target>, value: impl Into<Operand>) -> Result<()> {
        let symbol = self.resolve_symbol(target)?;
        let value = numeric_value("set_value", value.into())?;
        self.symbols.set_value(&symbol, value)
    }

    pub fn get_tex_name(&self, target: impl Into<Target>) -> Result<String> {
        let symbol = self.resolve_symbol(target)?;
        self.symbols.tex_name(&symbol)
    }

    pub fn set_tex_name(&mut self, target: impl Into<Target>, tex: &str) -> Result<()> {
        let symbol = self.resolve_symbol(target)?;
        self.symbols.set_tex_name(&symbol, tex)
    }

    pub fn autogen_latex_names(&self) -> bool {
        self.symbols.autogen_latex_names()
    }

    pub fn set_autogen_latex_names(&mut self, enabled: bool) {
        self.symbols.set_autogen_latex_names(enabled);
    }

    /// Time derivative of `e`: coordinates advance to velocities, velocities
    /// to accelerations, `t` to one; everything else is constant.
    pub fn dt(&self, e: &Expr) -> Expr {
        e.total_derivative(|s| match s.kind() {
            SymbolKind::Time => Some(Expr::one()),
            _ => self.symbols.derivative_of(s).map(Expr::symbol),
        })
    }

    pub(crate) fn check_expr(&self, e: &Expr) -> Result<()> {
        e.symbols()
            .iter()
            .try_for_each(|s| self.symbols.check_owned(s))
    }

    // ---- geometry ----

    fn check_vector(&self, v: &Vector3D) -> Result<()> {
        self.graph.check_base(v.base())?;
        v.components().iter().try_for_each(|c| self.check_expr(c))
    }

    /// Rotated base: `axis` (any non-zero direction) and `angle` relate it to
    /// `previous`.
    pub fn new_base<'a>(
        &mut self,
        name: &str,
        previous: impl Into<Ref<'a, Base>>,
        axis: [f64; 3],
        angle: impl Into<Expr>,
    ) -> Result<Base> {
        self.graph.check_free(EntityKind::Base, name)?;
        let previous = self.graph.base(previous.into())?;
        let angle = angle.into();
        self.check_expr(&angle)?;
        if axis.iter().all(|a| *a == 0.0) || axis.iter().any(|a| !a.is_finite()) {
            return Err(Error::TypeMismatch {
                context: "new_base",
                expected: "finite non-zero rotation axis",
                found: "degenerate axis",
            });
        }
        let base = self
            .graph
            .add_base(name, Some(previous.id()), axis, angle);
        debug!(name, previous = previous.name(), "new base");
        Ok(base)
    }

    /// An additional root base, unrelated to `xyz`.
    pub fn new_absolute_base(&mut self, name: &str) -> Result<Base> {
        self.graph.check_free(EntityKind::Base, name)?;
        Ok(self.graph.add_base(name, None, [0.0, 0.0, 1.0], Expr::zero()))
    }

    pub fn new_point<'a, 'b>(
        &mut self,
        name: &str,
        previous: impl Into<Ref<'a, Point>>,
        position: impl Into<Ref<'b, Vector3D>>,
    ) -> Result<Point> {
        self.graph.check_free(EntityKind::Point, name)?;
        let previous = self.graph.point(previous.into())?;
        let position = self.graph.vector(position.into())?;
        self.check_vector(&position)?;
        let point = self
            .graph
            .add_point(name, Some(previous.id()), Some(position));
        debug!(name, previous = previous.name(), "new point");
        Ok(point)
    }

    /// An additional root point, unrelated to `O`.
    pub fn new_absolute_point(&mut self, name: &str) -> Result<Point> {
        self.graph.check_free(EntityKind::Point, name)?;
        Ok(self.graph.add_point(name, None, None))
    }

    /// An unregistered vector.
    pub fn vector<'a>(
        &self,
        components: impl IntoComponents,
        base: impl Into<Ref<'a, Base>>,
    ) -> Result<Vector3D> {
        let base = self.graph.base(base.into())?;
        let v = Vector3D::new(components.into_components(), base);
        self.check_vector(&v)?;
        Ok(v)
    }

    pub fn new_vector<'a>(
        &mut self,
        name: &str,
        components: impl IntoComponents,
        base: impl Into<Ref<'a, Base>>,
    ) -> Result<Vector3D> {
        self.graph.check_free(EntityKind::Vector, name)?;
        let v = self.vector(components, base)?;
        self.graph.vectors.push(name, v.clone());
        debug!(name, "new vector");
        Ok(v)
    }

    /// An unregistered tensor from a 3x3 matrix.
    pub fn tensor<'a>(&self, matrix: Matrix, base: impl Into<Ref<'a, Base>>) -> Result<Tensor3D> {
        let base = self.graph.base(base.into())?;
        matrix.iter().try_for_each(|c| self.check_expr(c))?;
        Tensor3D::new(matrix, base)
    }

    pub fn new_tensor<'a>(
        &mut self,
        name: &str,
        matrix: Matrix,
        base: impl Into<Ref<'a, Base>>,
    ) -> Result<Tensor3D> {
        self.graph.check_free(EntityKind::Tensor, name)?;
        let t = self.tensor(matrix, base)?;
        self.graph.tensors.push(name, t.clone());
        debug!(name, "new tensor");
        Ok(t)
    }

    pub fn new_matrix(&mut self, name: &str, matrix: Matrix) -> Result<Matrix> {
        self.graph.check_free(EntityKind::Matrix, name)?;
        matrix.iter().try_for_each(|c| self.check_expr(c))?;
        self.graph.matrices.push(name, matrix.clone());
        Ok(matrix)
    }

    pub fn new_frame<'a, 'b>(
        &mut self,
        name: &str,
        point: impl Into<Ref<'a, Point>>,
        base: impl Into<Ref<'b, Base>>,
        scale: f64,
    ) -> Result<Frame> {
        self.graph.check_free(EntityKind::Frame, name)?;
        let point = self.graph.point(point.into())?;
        let base = self.graph.base(base.into())?;
        let frame = self.graph.add_frame(name, point, base, scale);
        debug!(name, "new frame");
        Ok(frame)
    }

    /// Moves `frame` to `point`, keeping its base and scale. Earlier handles
    /// to the frame resolve to the moved one.
    pub fn set_frame_point<'a, 'b>(
        &mut self,
        frame: impl Into<Ref<'a, Frame>>,
        point: impl Into<Ref<'b, Point>>,
    ) -> Result<Frame> {
        let frame = self.graph.frame(frame.into())?;
        let point = self.graph.point(point.into())?;
        let moved = self.graph.move_frame(&frame, point);
        if moved == self.abs {
            self.abs = moved.clone();
        }
        debug!(name = moved.name(), point = moved.point().name(), "frame moved");
        Ok(moved)
    }

    /// Rigid body with mass `mass`, centre of mass at `point + cm` and
    /// inertia tensor `inertia` about the centre of mass.
    ///
    /// Also registers the centre-of-mass point `G<name>`.
    pub fn new_solid<'a, 'b, 'c, 'd>(
        &mut self,
        name: &str,
        point: impl Into<Ref<'a, Point>>,
        base: impl Into<Ref<'b, Base>>,
        mass: impl Into<Target>,
        cm: impl Into<Ref<'c, Vector3D>>,
        inertia: impl Into<Ref<'d, Tensor3D>>,
    ) -> Result<Solid> {
        let g_name = format!("G{name}");
        self.graph.check_free(EntityKind::Solid, name)?;
        self.graph.check_free(EntityKind::Point, &g_name)?;
        let point = self.graph.point(point.into())?;
        let base = self.graph.base(base.into())?;
        let mass = self.resolve_symbol(mass)?;
        let cm = self.graph.vector(cm.into())?;
        self.check_vector(&cm)?;
        let inertia = self.graph.tensor(inertia.into())?;
        inertia.matrix().iter().try_for_each(|c| self.check_expr(c))?;

        let g = self
            .graph
            .add_point(&g_name, Some(point.id()), Some(cm.clone()));
        let solid = self
            .graph
            .add_solid(name, point, base, mass, cm, inertia, g);
        debug!(name, "new solid");
        Ok(solid)
    }

    pub fn new_wrench<'a, 'b, 'c, 'd>(
        &mut self,
        name: &str,
        force: impl Into<Ref<'a, Vector3D>>,
        moment: impl Into<Ref<'b, Vector3D>>,
        point: impl Into<Ref<'c, Point>>,
        solid: impl Into<Ref<'d, Solid>>,
        kind: WrenchKind,
    ) -> Result<Wrench3D> {
        self.graph.check_free(EntityKind::Wrench, name)?;
        let force = self.graph.vector(force.into())?;
        let moment = self.graph.vector(moment.into())?;
        self.check_vector(&force)?;
        self.check_vector(&moment)?;
        let point = self.graph.point(point.into())?;
        let solid = self.graph.solid(solid.into())?;
        let wrench = Wrench3D::new(force, moment, point, solid, kind);
        self.graph.wrenches.push(name, wrench.clone());
        debug!(name, kind = kind.as_str(), "new wrench");
        Ok(wrench)
    }

    pub fn new_drawing(&mut self, name: &str, drawing: Drawing3D) -> Result<Drawing3D> {
        self.graph.check_free(EntityKind::Drawing, name)?;
        self.graph.point(Ref::Entity(drawing.point()))?;
        if let Some(v) = drawing.vector() {
            self.check_vector(v)?;
        }
        self.graph.drawings.push(name, drawing.clone());
        Ok(drawing)
    }

    /// Mutable access to a registered drawing, for the viewer-facing setters.
    pub fn drawing_mut(&mut self, name: &str) -> Result<&mut Drawing3D> {
        self.graph
            .drawings
            .get_mut(name)
            .ok_or_else(|| Error::lookup(EntityKind::Drawing, name))
    }

    /// Points drawing `name` along `vector`, whose base and symbols must
    /// belong to this system.
    pub fn set_drawing_vector<'a>(
        &mut self,
        name: &str,
        vector: impl Into<Ref<'a, Vector3D>>,
    ) -> Result<()> {
        let vector = self.graph.vector(vector.into())?;
        self.check_vector(&vector)?;
        self.drawing_mut(name)?.set_vector(vector);
        debug!(name, "drawing vector set");
        Ok(())
    }

    pub fn previous_base(&self, base: Ref<'_, Base>) -> Result<Option<Base>> {
        let base = self.graph.base(base)?;
        Ok(base.previous().map(|id| self.graph.base_by_id(id).clone()))
    }

    pub fn previous_point(&self, point: Ref<'_, Point>) -> Result<Option<Point>> {
        let point = self.graph.point(point)?;
        Ok(point.previous().map(|id| self.graph.point_by_id(id).clone()))
    }

    // ---- substitution ----

    /// Replaces `old` with `new` everywhere inside `operand`.
    ///
    /// `old` may be a symbol, an expression, or a matrix whose cells are all
    /// replaced by the same `new`. `new` must be a scalar.
    pub fn subs(
        &self,
        operand: impl Into<Operand>,
        old: impl Into<Operand>,
        new: impl Into<Operand>,
    ) -> Result<Operand> {
        let operand = operand.into();
        let new = new.into();
        let new = new.as_scalar().ok_or(Error::TypeMismatch {
            context: "subs",
            expected: "scalar replacement",
            found: new.kind().as_str(),
        })?;
        let pairs: Vec<(Expr, Expr)> = match old.into() {
            Operand::Matrix(m) => m.iter().map(|e| (e.clone(), new.clone())).collect(),
            old => match old.as_scalar() {
                Some(e) => vec![(e, new)],
                None => {
                    return Err(Error::TypeMismatch {
                        context: "subs",
                        expected: "scalar or matrix of scalars",
                        found: old.kind().as_str(),
                    });
                }
            },
        };
        Ok(operand.map_exprs(|e| e.subs_all(&pairs)))
    }

    /// Rebuilds every expression of `operand` from its canonical tree.
    pub fn unatomize(&self, operand: impl Into<Operand>) -> Operand {
        operand.into().map_exprs(|e| e.replace(&mut |_| None))
    }
}

fn numeric_value(context: &'static str, value: Operand) -> Result<f64> {
    value.as_number().ok_or(Error::TypeMismatch {
        context,
        expected: "number",
        found: value.kind().as_str(),
    })
}

macro_rules! symbol_kind_accessors {
    ($($kind:ident => $get:ident, $has:ident, $list:ident, $matrix:ident;)*) => {
        impl System {$(
            pub fn $get(&self, name: &str) -> Result<Symbol> {
                self.symbol_of_kind(name, SymbolKind::$kind)
            }

            pub fn $has(&self, name: &str) -> bool {
                self.symbol_of_kind(name, SymbolKind::$kind).is_ok()
            }

            pub fn $list(&self) -> Vec<Symbol> {
                self.symbols_of(SymbolKind::$kind)
            }

            /// Column of every symbol of this kind, in insertion order; a
            /// `Shape` error when there are none.
            pub fn $matrix(&self) -> Result<Matrix> {
                let symbols = self.$list();
                Matrix::from_vec(symbols.len(), 1, symbols.iter().map(Expr::from).collect())
            }
        )*}
    };
}

symbol_kind_accessors! {
    Coordinate => get_coordinate, has_coordinate, get_coordinates, get_coordinates_matrix;
    Velocity => get_velocity, has_velocity, get_velocities, get_velocities_matrix;
    Acceleration => get_acceleration, has_acceleration, get_accelerations, get_accelerations_matrix;
    AuxCoordinate => get_aux_coordinate, has_aux_coordinate, get_aux_coordinates,
        get_aux_coordinates_matrix;
    AuxVelocity => get_aux_velocity, has_aux_velocity, get_aux_velocities,
        get_aux_velocities_matrix;
    AuxAcceleration => get_aux_acceleration, has_aux_acceleration, get_aux_accelerations,
        get_aux_accelerations_matrix;
    Parameter => get_parameter, has_parameter, get_parameters, get_parameters_matrix;
    JointUnknown => get_joint_unknown, has_joint_unknown, get_joint_unknowns,
        get_joint_unknowns_matrix;
    Input => get_input, has_input, get_inputs, get_inputs_matrix;
}

macro_rules! entity_accessors {
    ($($ty:ty, $kind:ident, $arena:ident => $get:ident, $has:ident, $list:ident;)*) => {
        impl System {$(
            pub fn $get(&self, name: &str) -> Result<$ty> {
                self.graph
                    .$arena
                    .find(name)
                    .cloned()
                    .ok_or_else(|| Error::lookup(EntityKind::$kind, name))
            }

            pub fn $has(&self, name: &str) -> bool {
                self.graph.$arena.contains(name)
            }

            /// All registered entities of this kind, in insertion order.
            pub fn $list(&self) -> Vec<$ty> {
                self.graph.$arena.values().cloned().collect()
            }
        )*}
    };
}

entity_accessors! {
    Base, Base, bases => get_base, has_base, get_bases;
    Point, Point, points => get_point, has_point, get_points;
    Frame, Frame, frames => get_frame, has_frame, get_frames;
    Solid, Solid, solids => get_solid, has_solid, get_solids;
    Vector3D, Vector, vectors => get_vector, has_vector, get_vectors;
    Tensor3D, Tensor, tensors => get_tensor, has_tensor, get_tensors;
    Matrix, Matrix, matrices => get_matrix, has_matrix, get_matrices;
    Wrench3D, Wrench, wrenches => get_wrench, has_wrench, get_wrenches;
    Drawing3D, Drawing, drawings => get_drawing, has_drawing, get_drawings;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_system_has_builtins() {
        let sys = System::new();
        assert_eq!(sys.get_time().name(), "t");
        assert_eq!(sys.get_value("g").unwrap(), DEFAULT_GRAVITY);
        assert!(sys.has_parameter("g"));
        assert!(sys.has_base("xyz"));
        assert!(sys.has_point("O"));
        assert!(sys.has_frame("abs"));
        assert!(sys.get_base("xyz").unwrap().previous().is_none());
    }

    #[test]
    fn parameters_round_trip_values() {
        let mut sys = System::new();
        let a = sys.new_parameter("a", 0.0).unwrap();
        assert_eq!(sys.get_value(&a).unwrap(), 0.0);
        sys.new_parameter("b", 2.5).unwrap();
        assert_eq!(sys.get_value("b").unwrap(), 2.5);
        sys.set_value("a", 4.0).unwrap();
        assert_eq!(sys.get_value(Expr::from(&a)).unwrap(), 4.0);
    }

    #[test]
    fn value_access_errors() {
        let mut sys = System::new();
        let a = sys.new_parameter("a", 1.0).unwrap();
        assert!(matches!(
            sys.set_value("missing", 1.0),
            Err(Error::NameLookup { .. })
        ));
        assert!(matches!(
            sys.set_value("a", &a),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            sys.set_value(Matrix::zeros(1, 1), 1.0),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            sys.get_value(2.0),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            sys.get_value(Expr::from(&a) * 2.0),
            Err(Error::TypeMismatch { .. })
        ));

        let other = System::new();
        assert!(matches!(
            other.get_value(&a),
            Err(Error::ForeignSymbol { .. })
        ));
    }

    #[test]
    fn coordinates_are_created_as_triples() {
        let mut sys = System::new();
        let [a, da, dda] = sys.new_coordinate("a", ()).unwrap();
        assert_eq!([a.name(), da.name(), dda.name()], ["a", "da", "dda"]);
        assert_eq!(sys.get_value(&dda).unwrap(), 0.0);

        let [_, dq, ddq] = sys.new_coordinate("q", (1.0, 2.0, 3.0)).unwrap();
        assert_eq!(sys.get_value(&dq).unwrap(), 2.0);
        assert_eq!(sys.get_value(&ddq).unwrap(), 3.0);

        let [_, b, c] = sys.new_coordinate("p", ("b", "c")).unwrap();
        assert_eq!((b.name(), c.name()), ("b", "c"));
        assert_eq!(b.kind(), SymbolKind::Velocity);

        assert_eq!(sys.get_coordinates().len(), 3);
        assert_eq!(sys.get_velocities_matrix().unwrap().shape(), (3, 1));
        assert!(matches!(
            sys.get_aux_coordinates_matrix(),
            Err(Error::Shape { .. })
        ));
        assert!(sys.has_acceleration("ddq"));
        assert!(!sys.has_coordinate("dq"));
        assert!(sys.get_coordinate("dq").is_err());
    }

    #[test]
    fn tex_names() {
        let mut sys = System::new();
        sys.new_coordinate("theta1", ()).unwrap();
        assert_eq!(sys.get_tex_name("dtheta1").unwrap(), "\\dot{\\theta}_{1}");
        sys.set_tex_name("theta1", "q_1").unwrap();
        assert_eq!(sys.get_tex_name("theta1").unwrap(), "q_1");
        sys.set_autogen_latex_names(false);
        assert_eq!(sys.get_tex_name("ddtheta1").unwrap(), "ddtheta1");
    }

    #[test]
    fn entity_constructors_validate_references() {
        let mut sys = System::new();
        let q = sys.new_parameter("q", 0.0).unwrap();
        assert!(matches!(
            sys.new_base("b", "nope", [0.0, 0.0, 1.0], &q),
            Err(Error::NameLookup { .. })
        ));
        assert!(!sys.has_base("b"));
        assert!(sys.new_base("b", "xyz", [0.0, 0.0, 0.0], &q).is_err());

        let b = sys.new_base("b", "xyz", [0.0, 0.0, 1.0], &q).unwrap();
        assert!(matches!(
            sys.new_base("b", &b, [1.0, 0.0, 0.0], 0.0),
            Err(Error::DuplicateName { .. })
        ));
        assert_eq!(sys.previous_base(Ref::Entity(&b)).unwrap(), Some(sys.xyz().clone()));

        sys.new_vector("OA", (&q, 0.0, 1.0), "b").unwrap();
        let a = sys.new_point("A", "O", "OA").unwrap();
        assert_eq!(a.position_vector().unwrap().x(), &Expr::from(&q));
        assert!(sys.new_point("B", "A", "missing").is_err());
        assert_eq!(sys.get_points().len(), 2);
        assert_eq!(sys.get_bases().len(), 2);
    }

    #[test]
    fn solids_register_their_centre_of_mass() {
        let mut sys = System::new();
        sys.new_parameter("m", 1.0).unwrap();
        sys.new_vector("cm", (1.0, 0.0, 0.0), "xyz").unwrap();
        sys.new_tensor("I", Matrix::identity(3), "xyz").unwrap();
        let solid = sys.new_solid("Arm", "O", "xyz", "m", "cm", "I").unwrap();
        assert_eq!(solid.g().name(), "GArm");
        assert!(sys.has_point("GArm"));
        assert_eq!(solid.mass().name(), "m");

        assert!(sys.new_solid("Arm", "O", "xyz", "m", "cm", "I").is_err());
        assert!(sys.new_solid("Leg", "O", "xyz", "nope", "cm", "I").is_err());
        assert!(!sys.has_point("GLeg"));
    }

    #[test]
    fn solids_reject_inertia_with_foreign_symbols() {
        let mut sys = System::new();
        sys.new_parameter("m", 1.0).unwrap();
        sys.new_vector("cm", (1.0, 0.0, 0.0), "xyz").unwrap();
        let mut other = System::new();
        let k = other.new_parameter("k", 2.0).unwrap();

        let z = Expr::zero;
        let rows = [[Expr::from(&k), z(), z()], [z(), z(), z()], [z(), z(), z()]];
        let inertia = Tensor3D::new(Matrix::from_rows(rows).unwrap(), sys.xyz().clone()).unwrap();
        assert!(matches!(
            sys.new_solid("S", "O", "xyz", "m", "cm", &inertia),
            Err(Error::ForeignSymbol { .. })
        ));
        assert!(!sys.has_solid("S"));
        assert!(!sys.has_point("GS"));
    }

    #[test]
    fn drawings_are_mutable_in_place() {
        let mut sys = System::new();
        let o = sys.origin().clone();
        sys.new_drawing("ground", Drawing3D::solid("ground.stl", o))
            .unwrap();
        sys.drawing_mut("ground")
            .unwrap()
            .set_color([1.0, 0.0, 0.0, 1.0]);
        let d = sys.get_drawing("ground").unwrap();
        assert_eq!(d.color(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(d.file().and_then(|p| p.to_str()), Some("ground.stl"));
    }

    #[test]
    fn drawing_vectors_are_checked() {
        let mut sys = System::new();
        let o = sys.origin().clone();
        let up = sys.vector((0.0, 0.0, 1.0), "xyz").unwrap();
        sys.new_drawing("force", Drawing3D::arrow(up, o)).unwrap();

        let mut other = System::new();
        let k = other.new_parameter("k", 1.0).unwrap();
        let components = [Expr::from(&k), Expr::zero(), Expr::zero()];
        let foreign = Vector3D::new(components, sys.xyz().clone());
        assert!(matches!(
            sys.set_drawing_vector("force", &foreign),
            Err(Error::ForeignSymbol { .. })
        ));
        let elsewhere = other.vector((1.0, 0.0, 0.0), "xyz").unwrap();
        assert!(sys.set_drawing_vector("force", &elsewhere).is_err());
        let unchanged = sys.get_drawing("force").unwrap();
        assert!(unchanged.vector().unwrap().x().is_zero());

        let l = sys.new_parameter("l", 2.0).unwrap();
        sys.new_vector("side", (&l, 0.0, 0.0), "xyz").unwrap();
        sys.set_drawing_vector("force", "side").unwrap();
        let d = sys.get_drawing("force").unwrap();
        assert_eq!(d.vector().unwrap().x(), &Expr::from(&l));
        assert!(sys.set_drawing_vector("missing", "side").is_err());
    }

    #[test]
    fn subs_with_matrix_of_symbols() {
        let mut sys = System::new();
        let [q1, dq1, _] = sys.new_coordinate("q1", ()).unwrap();
        let [_, dq2, _] = sys.new_coordinate("q2", ()).unwrap();
        let e = Expr::from(&q1) * &dq1 + Expr::from(&dq2).pow(2.0);
        let out = sys
            .subs(e, sys.get_velocities_matrix().unwrap(), 0.0)
            .unwrap()
            .into_expr()
            .unwrap();
        assert!(out.is_zero());
        assert!(sys.subs(1.0, Matrix::zeros(1, 1), Matrix::zeros(1, 1)).is_err());
    }
}
