use crate::{
    error::{Error, Result},
    expr::Expr,
    geometry::{Point, Ref, Solid, Vector3D, Wrench3D, WrenchKind},
    globals::{self, GravityDirection},
    system::System,
};
use tracing::debug;

impl System {
    /// Kinematic twist of `solid`: angular velocity of the solid base in the
    /// force slot and velocity of the solid point in the moment slot.
    pub fn twist<'a>(&self, solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
        let solid = self.graph().solid(solid.into())?;
        let omega = self.angular_velocity(solid.base())?;
        let velocity = self.velocity_vector(solid.point())?;
        Ok(Wrench3D::new(
            omega,
            velocity,
            solid.point().clone(),
            solid,
            WrenchKind::Twist,
        ))
    }

    /// Weight of `solid` at its centre of mass, using the process-wide
    /// gravity direction.
    pub fn gravity_wrench<'a>(&self, solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
        self.gravity_wrench_with(solid, globals::gravity_direction())
    }

    pub fn gravity_wrench_with<'a>(
        &self,
        solid: impl Into<Ref<'a, Solid>>,
        direction: GravityDirection,
    ) -> Result<Wrench3D> {
        let solid = self.graph().solid(solid.into())?;
        let weight = direction.sign() * Expr::from(solid.mass()) * Expr::from(&self.gravity());
        let force = Vector3D::new([Expr::zero(), Expr::zero(), weight], self.xyz().clone());
        let moment = Vector3D::zero(self.xyz().clone());
        debug!(solid = solid.name(), %direction, "gravity wrench");
        Ok(Wrench3D::new(
            force,
            moment,
            solid.g().clone(),
            solid,
            WrenchKind::Gravity,
        ))
    }

    /// D'Alembert inertia wrench of `solid`, about the solid point:
    /// `F = -m a_G`, `M_G = -(I alpha + omega x I omega)`.
    pub fn inertia_wrench<'a>(&self, solid: impl Into<Ref<'a, Solid>>) -> Result<Wrench3D> {
        let solid = self.graph().solid(solid.into())?;
        let base = solid.base();
        let mass = Expr::from(solid.mass());

        let accel = self.acceleration_vector(solid.g())?;
        let force = accel.scale(&-mass);

        let omega = self.angular_velocity(base)?;
        let alpha = self.angular_acceleration(base)?;
        let inertia = self.tensor_in_base(solid.inertia(), base)?;
        let spin = inertia.apply_components(&omega);
        let gyro = omega.cross_components(&spin);
        let moment = inertia
            .apply_components(&alpha)
            .zip(&gyro, |x, y| -(x + y));

        debug!(solid = solid.name(), "inertia wrench");
        let at_g = Wrench3D::new(
            force,
            moment,
            solid.g().clone(),
            solid.clone(),
            WrenchKind::Inertia,
        );
        self.at_point(&at_g, solid.point())
    }

    /// The same wrench with its moment taken about `point`:
    /// `M_Q = M_P + r(Q->P) x F`.
    pub fn at_point<'a, 'b>(
        &self,
        wrench: impl Into<Ref<'a, Wrench3D>>,
        point: impl Into<Ref<'b, Point>>,
    ) -> Result<Wrench3D> {
        let wrench = self.graph().wrench(wrench.into())?;
        let point = self.graph().point(point.into())?;
        if &point == wrench.point() {
            return Ok(wrench);
        }
        let arm = self.position_vector(&point, wrench.point())?;
        let transport = self.cross(&arm, wrench.force())?;
        let transport = self.in_base(&transport, wrench.moment().base())?;
        let moment = wrench.moment().zip(&transport, |x, y| x + y);
        Ok(wrench.with_parts(wrench.force().clone(), moment, point))
    }

    /// Sum of two wrenches on the same solid, about the point of `a`.
    pub fn wrench_sum<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Wrench3D>>,
        b: impl Into<Ref<'b, Wrench3D>>,
    ) -> Result<Wrench3D> {
        let a = self.graph().wrench(a.into())?;
        let b = self.graph().wrench(b.into())?;
        if a.solid() != b.solid() {
            return Err(Error::IncompatibleWrench {
                lhs: a.solid().name().to_string(),
                rhs: b.solid().name().to_string(),
            });
        }
        let b = self.at_point(&b, a.point())?;
        let force = self.in_base(b.force(), a.force().base())?;
        let moment = self.in_base(b.moment(), a.moment().base())?;
        let sum = a.with_parts(
            a.force().zip(&force, |x, y| x + y),
            a.moment().zip(&moment, |x, y| x + y),
            a.point().clone(),
        );
        Ok(if a.kind() == b.kind() {
            sum
        } else {
            sum.with_kind(WrenchKind::Composite)
        })
    }

    /// Reciprocal product `F_a . M_b + M_a . F_b`, with `b` moved to the
    /// point of `a`. Twist times wrench is the virtual power.
    pub fn wrench_product<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Wrench3D>>,
        b: impl Into<Ref<'b, Wrench3D>>,
    ) -> Result<Expr> {
        let a = self.graph().wrench(a.into())?;
        let b = self.at_point(b, a.point())?;
        Ok(self.dot(a.force(), b.moment())? + self.dot(a.moment(), b.force())?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Expr, GravityDirection, Matrix, Symbol, System, WrenchKind};

    struct Link {
        sys: System,
        q: Symbol,
        dq: Symbol,
        ddq: Symbol,
        m: Symbol,
        l: Symbol,
    }

    /// Point mass on a massless rod, hinged at `O` about `y`.
    fn link() -> Link {
        let mut sys = System::new();
        let [q, dq, ddq] = sys.new_coordinate("q", ()).unwrap();
        let m = sys.new_parameter("m", 2.0).unwrap();
        let l = sys.new_parameter("l", 1.5).unwrap();
        sys.new_base("B", "xyz", [0.0, 1.0, 0.0], &q).unwrap();
        sys.new_vector("cm", (&l, 0.0, 0.0), "B").unwrap();
        sys.new_tensor("I", Matrix::zeros(3, 3), "B").unwrap();
        sys.new_solid("Rod", "O", "B", &m, "cm", "I").unwrap();
        Link {
            sys,
            q,
            dq,
            ddq,
            m,
            l,
        }
    }

    impl Link {
        fn eval(&self, e: &Expr) -> f64 {
            e.eval_with(&|s: &Symbol| {
                if *s == self.q {
                    Some(0.3)
                } else if *s == self.dq {
                    Some(2.0)
                } else if *s == self.ddq {
                    Some(0.5)
                } else {
                    self.sys.get_value(s).ok()
                }
            })
            .unwrap()
        }
    }

    #[test]
    fn gravity_follows_the_direction() {
        let link = link();
        let w = link.sys.gravity_wrench_with("Rod", GravityDirection::Down).unwrap();
        assert_eq!(w.kind(), WrenchKind::Gravity);
        assert_eq!(w.point().name(), "GRod");
        assert_eq!(link.eval(w.force().z()), -2.0 * 9.8);
        let up = link.sys.gravity_wrench_with("Rod", GravityDirection::Up).unwrap();
        assert_eq!(link.eval(up.force().z()), 2.0 * 9.8);
    }

    #[test]
    fn gravity_moment_about_the_hinge() {
        let link = link();
        let w = link.sys.gravity_wrench_with("Rod", GravityDirection::Down).unwrap();
        let at_o = link.sys.at_point(&w, "O").unwrap();
        let expected = 2.0 * 9.8 * 1.5 * 0.3f64.cos();
        assert!((link.eval(at_o.moment().y()) - expected).abs() < 1e-12);
        assert_eq!(at_o.force(), w.force());
    }

    #[test]
    fn virtual_power_of_a_pendulum() {
        let link = link();
        let sys = &link.sys;
        let twist = sys.twist("Rod").unwrap();
        let gravity = sys.gravity_wrench_with("Rod", GravityDirection::Down).unwrap();
        let inertia = sys.inertia_wrench("Rod").unwrap();
        let loads = sys.wrench_sum(&inertia, &gravity).unwrap();
        assert_eq!(loads.kind(), WrenchKind::Composite);
        assert_eq!(loads.point().name(), "O");

        let power = sys.wrench_product(&twist, &loads).unwrap();
        let (m, l, g) = (2.0, 1.5, 9.8);
        let expected = 2.0 * (m * g * l * 0.3f64.cos() - m * l * l * 0.5);
        assert!((link.eval(&power) - expected).abs() < 1e-9);
        assert!(power.depends_on(&link.m) && power.depends_on(&link.l));
    }

    #[test]
    fn sums_need_a_common_solid() {
        let mut link = link();
        link.sys.new_solid("Other", "O", "xyz", "m", "cm", "I").unwrap();
        let a = link.sys.gravity_wrench("Rod").unwrap();
        let b = link.sys.gravity_wrench("Other").unwrap();
        assert!(matches!(
            link.sys.wrench_sum(&a, &b),
            Err(Error::IncompatibleWrench { .. })
        ));
        let twice = link.sys.wrench_sum(&a, &a).unwrap();
        assert_eq!(twice.kind(), WrenchKind::Gravity);
    }
}
