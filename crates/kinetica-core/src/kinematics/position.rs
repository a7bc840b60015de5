use super::{chain_until, nearest_common};
use crate::{
    error::{EntityKind, Error, Result},
    geometry::{Point, PointId, Ref, Vector3D},
    system::System,
};
use tracing::trace;

impl System {
    pub fn reduced_point<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Point>>,
        b: impl Into<Ref<'b, Point>>,
    ) -> Result<Point> {
        let a = self.graph().point(a.into())?;
        let b = self.graph().point(b.into())?;
        let id = self.common_point(&a, &b)?;
        Ok(self.graph().point_by_id(id).clone())
    }

    fn common_point(&self, a: &Point, b: &Point) -> Result<PointId> {
        let graph = self.graph();
        nearest_common(
            &graph.point_ancestry(a.id()),
            &graph.point_ancestry(b.id()),
            EntityKind::Point,
            || (a.name().to_string(), b.name().to_string()),
        )
    }

    /// Points walked from `a` down to its descendant `b`, both included.
    pub fn pre_point_branch<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Point>>,
        b: impl Into<Ref<'b, Point>>,
    ) -> Result<Vec<Point>> {
        let graph = self.graph();
        let a = graph.point(a.into())?;
        let b = graph.point(b.into())?;
        let chain = graph.point_ancestry(b.id());
        let Some(end) = chain.iter().position(|id| *id == a.id()) else {
            return Err(Error::GraphConnectivity {
                kind: EntityKind::Point,
                from: a.name().to_string(),
                to: b.name().to_string(),
            });
        };
        Ok(chain[..=end]
            .iter()
            .rev()
            .map(|id| graph.point_by_id(*id).clone())
            .collect())
    }

    /// Sum of the position vectors from `ancestor` down to `point`, in `xyz`.
    fn position_from_ancestor(&self, ancestor: PointId, point: &Point) -> Result<Vector3D> {
        let graph = self.graph();
        let chain = graph.point_ancestry(point.id());
        let mut r = Vector3D::zero(self.xyz().clone());
        for id in chain_until(&chain, ancestor) {
            if let Some(step) = graph.point_by_id(*id).position_vector() {
                let step = self.in_base(step, self.xyz())?;
                r = r.zip(&step, |x, y| x + y);
            }
        }
        Ok(r)
    }

    /// Vector from `a` to `b`, expressed in `xyz`.
    pub fn position_vector<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Point>>,
        b: impl Into<Ref<'b, Point>>,
    ) -> Result<Vector3D> {
        let a = self.graph().point(a.into())?;
        let b = self.graph().point(b.into())?;
        trace!(from = a.name(), to = b.name(), "position vector");
        let common = self.common_point(&a, &b)?;
        let to_b = self.position_from_ancestor(common, &b)?;
        let to_a = self.position_from_ancestor(common, &a)?;
        Ok(to_b.zip(&to_a, |x, y| x - y))
    }

    /// Position of `point` measured from `O`, in `xyz`.
    pub fn get_position<'a>(&self, point: impl Into<Ref<'a, Point>>) -> Result<Vector3D> {
        self.position_vector(self.origin(), point)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Expr, System};

    fn arm() -> System {
        let mut sys = System::new();
        let [q, ..] = sys.new_coordinate("q", ()).unwrap();
        let l = sys.new_parameter("l", 2.0).unwrap();
        sys.new_base("B", "xyz", [0.0, 0.0, 1.0], &q).unwrap();
        sys.new_vector("OA", (&l, 0.0, 0.0), "B").unwrap();
        sys.new_vector("AB", (0.0, 0.0, 1.0), "xyz").unwrap();
        sys.new_vector("OC", (0.0, 3.0, 0.0), "xyz").unwrap();
        sys.new_point("A", "O", "OA").unwrap();
        sys.new_point("B", "A", "AB").unwrap();
        sys.new_point("C", "O", "OC").unwrap();
        sys
    }

    #[test]
    fn positions_accumulate_along_the_chain() {
        let sys = arm();
        let r = sys.get_position("B").unwrap();
        let (q, l) = (sys.get_symbol("q").unwrap(), sys.get_symbol("l").unwrap());
        assert_eq!(r.x(), &(Expr::from(&l) * Expr::from(&q).cos()));
        assert_eq!(r.y(), &(Expr::from(&l) * Expr::from(&q).sin()));
        assert_eq!(r.z(), &Expr::one());
        assert_eq!(r.base().name(), "xyz");
    }

    #[test]
    fn position_is_antisymmetric() {
        let sys = arm();
        let bc = sys.position_vector("B", "C").unwrap();
        let cb = sys.position_vector("C", "B").unwrap();
        assert_eq!(bc, -cb);
        assert_eq!(sys.reduced_point("B", "C").unwrap().name(), "O");
        assert!(sys.position_vector("A", "A").unwrap().is_zero());
    }

    #[test]
    fn branches_run_from_ancestor_to_descendant() {
        let mut sys = arm();
        let names: Vec<_> = sys
            .pre_point_branch("O", "B")
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["O", "A", "B"]);
        assert!(matches!(
            sys.pre_point_branch("B", "C"),
            Err(Error::GraphConnectivity { .. })
        ));

        sys.new_absolute_point("P").unwrap();
        assert!(matches!(
            sys.position_vector("P", "B"),
            Err(Error::GraphConnectivity { .. })
        ));
    }
}
