use super::chain_until;
use crate::{
    error::Result,
    geometry::{Base, BaseId, Frame, Point, PointId, Ref, Tensor3D, Vector3D},
    system::System,
};
use tracing::debug;

impl System {
    /// Sum of `axis * d(angle)/dt` from `ancestor` down to `base`, in `target`.
    fn angular_velocity_from(
        &self,
        ancestor: BaseId,
        base: &Base,
        target: &Base,
    ) -> Result<Vector3D> {
        let graph = self.graph();
        let chain = graph.base_ancestry(base.id());
        let mut omega = Vector3D::zero(target.clone());
        for id in chain_until(&chain, ancestor) {
            let step = graph.base_by_id(*id);
            let rate = self.dt(step.rotation_angle());
            if rate.is_zero() {
                continue;
            }
            let axis = step.rotation_tupla();
            let norm = axis.iter().map(|a| a * a).sum::<f64>().sqrt();
            let local = Vector3D::new(axis.map(|a| a / norm * &rate), step.clone());
            let local = self.in_base(&local, target)?;
            omega = omega.zip(&local, |x, y| x + y);
        }
        Ok(omega)
    }

    /// Angular velocity of base `b` as seen from base `a`, expressed in `b`.
    pub fn angular_velocity_between<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Base>>,
        b: impl Into<Ref<'b, Base>>,
    ) -> Result<Vector3D> {
        let a = self.graph().base(a.into())?;
        let b = self.graph().base(b.into())?;
        let common = self.reduced_base(&a, &b)?.id();
        let of_b = self.angular_velocity_from(common, &b, &b)?;
        let of_a = self.angular_velocity_from(common, &a, &b)?;
        Ok(of_b.zip(&of_a, |x, y| x - y))
    }

    /// Angular velocity of `base` relative to `xyz`, expressed in `base`.
    pub fn angular_velocity<'a>(&self, base: impl Into<Ref<'a, Base>>) -> Result<Vector3D> {
        self.angular_velocity_between(self.xyz(), base)
    }

    pub fn angular_velocity_tensor<'a>(&self, base: impl Into<Ref<'a, Base>>) -> Result<Tensor3D> {
        Ok(self.angular_velocity(base)?.skew())
    }

    /// Angular acceleration of `base` relative to `xyz`, expressed in `base`.
    pub fn angular_acceleration<'a>(&self, base: impl Into<Ref<'a, Base>>) -> Result<Vector3D> {
        let omega = self.angular_velocity(base)?;
        Ok(omega.map(|c| self.dt(c)))
    }

    /// Time derivative of `v` as seen from an observer attached to `observer`,
    /// expressed in the base of `v`.
    pub(crate) fn vector_rate(&self, v: &Vector3D, observer: &Base) -> Result<Vector3D> {
        let local = v.map(|c| self.dt(c));
        if v.base() == observer {
            return Ok(local);
        }
        let omega = self.angular_velocity_between(observer, v.base())?;
        let transport = omega.cross_components(v);
        Ok(local.zip(&transport, |x, y| x + y))
    }

    fn point_segments(&self, ancestor: PointId, point: &Point) -> Vec<Vector3D> {
        let graph = self.graph();
        let chain = graph.point_ancestry(point.id());
        chain_until(&chain, ancestor)
            .iter()
            .filter_map(|id| graph.point_by_id(*id).position_vector().cloned())
            .collect()
    }

    /// Velocity of `point` relative to `frame`, in the frame base.
    pub fn velocity_vector_in<'a, 'b>(
        &self,
        point: impl Into<Ref<'a, Point>>,
        frame: impl Into<Ref<'b, Frame>>,
    ) -> Result<Vector3D> {
        let point = self.graph().point(point.into())?;
        let frame = self.graph().frame(frame.into())?;
        let observer = frame.base();
        debug!(point = point.name(), frame = frame.name(), "velocity vector");

        let common = self.reduced_point(&point, frame.point())?.id();
        let mut v = Vector3D::zero(observer.clone());
        for segment in self.point_segments(common, &point) {
            let rate = self.in_base(&self.vector_rate(&segment, observer)?, observer)?;
            v = v.zip(&rate, |x, y| x + y);
        }
        for segment in self.point_segments(common, frame.point()) {
            let rate = self.in_base(&self.vector_rate(&segment, observer)?, observer)?;
            v = v.zip(&rate, |x, y| x - y);
        }
        Ok(v)
    }

    /// Velocity of `point` relative to frame `abs`, in `xyz`.
    pub fn velocity_vector<'a>(&self, point: impl Into<Ref<'a, Point>>) -> Result<Vector3D> {
        self.velocity_vector_in(point, self.abs())
    }

    /// Acceleration of `point` relative to `frame`, in the frame base.
    pub fn acceleration_vector_in<'a, 'b>(
        &self,
        point: impl Into<Ref<'a, Point>>,
        frame: impl Into<Ref<'b, Frame>>,
    ) -> Result<Vector3D> {
        let v = self.velocity_vector_in(point, frame)?;
        Ok(v.map(|c| self.dt(c)))
    }

    pub fn acceleration_vector<'a>(&self, point: impl Into<Ref<'a, Point>>) -> Result<Vector3D> {
        self.acceleration_vector_in(point, self.abs())
    }
}

#[cfg(test)]
mod tests {
    use crate::{EntityKind, Error, Expr, Symbol, System};

    fn pendulum() -> (System, Symbol, Symbol, Symbol) {
        let mut sys = System::new();
        let [q, dq, ddq] = sys.new_coordinate("q", ()).unwrap();
        let l = sys.new_parameter("l", 1.0).unwrap();
        sys.new_base("B", "xyz", [0.0, 0.0, 1.0], &q).unwrap();
        sys.new_vector("OA", (&l, 0.0, 0.0), "B").unwrap();
        sys.new_point("A", "O", "OA").unwrap();
        (sys, dq, ddq, l)
    }

    #[test]
    fn angular_velocity_follows_the_rotation_axis() {
        let (sys, dq, ddq, _) = pendulum();
        let omega = sys.angular_velocity("B").unwrap();
        assert_eq!(omega.components(), &[Expr::zero(), Expr::zero(), Expr::from(&dq)]);
        let alpha = sys.angular_acceleration("B").unwrap();
        assert_eq!(alpha.z(), &Expr::from(&ddq));

        let back = sys.angular_velocity_between("B", "xyz").unwrap();
        assert_eq!(back.z(), &-Expr::from(&dq));
        assert!(sys.angular_velocity("xyz").unwrap().is_zero());
    }

    #[test]
    fn tip_velocity_is_tangential() {
        let (mut sys, dq, _, l) = pendulum();
        let v = sys.velocity_vector("A").unwrap();
        let q = sys.get_symbol("q").unwrap();
        let (l, q, dq) = (Expr::from(&l), Expr::from(&q), Expr::from(&dq));
        assert_eq!(v.x(), &-(&l * &dq * q.sin()));
        assert_eq!(v.y(), &(&l * &dq * q.cos()));
        assert!(v.z().is_zero());

        // Seen from the rotating frame the tip is at rest.
        let o = sys.origin().clone();
        sys.new_frame("moving", &o, "B", 1.0).unwrap();
        assert!(sys.velocity_vector_in("A", "moving").unwrap().is_zero());
    }

    #[test]
    fn moved_frames_observe_from_their_new_point() {
        let (mut sys, _, _, _) = pendulum();
        let o = sys.origin().clone();
        let fixed = sys.new_frame("fixed", &o, "xyz", 1.0).unwrap();
        assert!(!sys.velocity_vector_in("A", &fixed).unwrap().is_zero());

        let moved = sys.set_frame_point(&fixed, "A").unwrap();
        assert_eq!(moved.point().name(), "A");
        assert_eq!(moved.base().name(), "xyz");
        // The handle taken before the move resolves to the moved frame.
        assert!(sys.velocity_vector_in("A", &fixed).unwrap().is_zero());
        assert_eq!(sys.get_frame("fixed").unwrap().point().name(), "A");

        sys.set_frame_point("abs", "A").unwrap();
        assert_eq!(sys.abs().point().name(), "A");
        assert!(sys.velocity_vector("A").unwrap().is_zero());

        let other = System::new();
        let err = sys.set_frame_point("fixed", other.origin()).unwrap_err();
        assert!(matches!(err, Error::NameLookup { kind: EntityKind::Point, .. }));
        assert!(sys.set_frame_point("fixed", "Nowhere").is_err());
        assert!(sys.set_frame_point("nothing", "A").is_err());
        assert_eq!(sys.get_frame("fixed").unwrap().point().name(), "A");
    }

    #[test]
    fn centripetal_acceleration() {
        let (sys, dq, ddq, l) = pendulum();
        let a = sys.acceleration_vector("A").unwrap();
        let b = sys.get_base("B").unwrap();
        let in_b = sys.in_base(&a, &b).unwrap();
        let q = sys.get_symbol("q").unwrap();
        let values = |s: &Symbol| {
            if *s == q {
                Some(0.3)
            } else if *s == dq {
                Some(2.0)
            } else if *s == ddq {
                Some(0.5)
            } else if *s == l {
                Some(1.5)
            } else {
                None
            }
        };
        let radial = in_b.x().eval_with(&values).unwrap();
        let tangential = in_b.y().eval_with(&values).unwrap();
        assert!((radial + 1.5 * 4.0).abs() < 1e-12);
        assert!((tangential - 1.5 * 0.5).abs() < 1e-12);
    }
}
