use super::{chain_until, nearest_common};
use crate::{
    error::{EntityKind, Result},
    expr::Expr,
    geometry::{Base, BaseId, Ref, Tensor3D, Vector3D},
    matrix::Matrix,
    system::System,
};

/// Rotation of `angle` about the normalized `axis` (Rodrigues):
/// `R = cos(a) (I - u u^T) + sin(a) [u]x + u u^T`.
fn axis_angle(axis: [f64; 3], angle: &Expr) -> Matrix {
    let norm = axis.iter().map(|a| a * a).sum::<f64>().sqrt();
    let u = axis.map(|a| a / norm);
    let skew = [
        [0.0, -u[2], u[1]],
        [u[2], 0.0, -u[0]],
        [-u[1], u[0], 0.0],
    ];
    let (c, s) = (angle.cos(), angle.sin());

    let data = (0..9)
        .map(|i| {
            let (r, k) = (i / 3, i % 3);
            let outer = u[r] * u[k];
            let delta = if r == k { 1.0 } else { 0.0 };
            (delta - outer) * &c + skew[r][k] * &s + outer
        })
        .collect();
    Matrix::from_parts(3, 3, data)
}

impl System {
    /// Rotation of `base` relative to its previous base: maps components in
    /// `base` to components in the previous one. Identity for roots.
    pub fn base_rotation(&self, base: &Base) -> Matrix {
        if base.has_previous() {
            axis_angle(base.rotation_tupla(), base.rotation_angle())
        } else {
            Matrix::identity(3)
        }
    }

    pub fn reduced_base<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Base>>,
        b: impl Into<Ref<'b, Base>>,
    ) -> Result<Base> {
        let a = self.graph().base(a.into())?;
        let b = self.graph().base(b.into())?;
        let id = self.common_base(&a, &b)?;
        Ok(self.graph().base_by_id(id).clone())
    }

    fn common_base(&self, a: &Base, b: &Base) -> Result<BaseId> {
        let graph = self.graph();
        nearest_common(
            &graph.base_ancestry(a.id()),
            &graph.base_ancestry(b.id()),
            EntityKind::Base,
            || (a.name().to_string(), b.name().to_string()),
        )
    }

    /// Product of the rotations walked from `ancestor` down to `base`.
    fn rotation_from_ancestor(&self, ancestor: BaseId, base: &Base) -> Result<Matrix> {
        let graph = self.graph();
        let chain = graph.base_ancestry(base.id());
        let mut m = Matrix::identity(3);
        for id in chain_until(&chain, ancestor) {
            m = self.base_rotation(graph.base_by_id(*id)).try_mul(&m)?;
        }
        Ok(m)
    }

    /// Matrix `M` with `v_a = M v_b` for components of one vector expressed
    /// in bases `a` and `b`.
    pub fn rotation_matrix<'a, 'b>(
        &self,
        a: impl Into<Ref<'a, Base>>,
        b: impl Into<Ref<'b, Base>>,
    ) -> Result<Matrix> {
        let a = self.graph().base(a.into())?;
        let b = self.graph().base(b.into())?;
        if a == b {
            return Ok(Matrix::identity(3));
        }
        let common = self.common_base(&a, &b)?;
        let to_a = self.rotation_from_ancestor(common, &a)?;
        let to_b = self.rotation_from_ancestor(common, &b)?;
        to_a.transpose().try_mul(&to_b)
    }

    /// The same vector with components expressed in `base`.
    pub fn in_base<'a>(&self, v: &Vector3D, base: impl Into<Ref<'a, Base>>) -> Result<Vector3D> {
        let base = self.graph().base(base.into())?;
        if v.base() == &base {
            return Ok(v.clone());
        }
        let r = self.rotation_matrix(&base, v.base())?;
        let m = r.try_mul(&v.to_matrix())?;
        Vector3D::from_matrix(&m, base)
    }

    /// The same tensor with components expressed in `base`: `R T R^T`.
    pub fn tensor_in_base<'a>(
        &self,
        t: &Tensor3D,
        base: impl Into<Ref<'a, Base>>,
    ) -> Result<Tensor3D> {
        let base = self.graph().base(base.into())?;
        if t.base() == &base {
            return Ok(t.clone());
        }
        let r = self.rotation_matrix(&base, t.base())?;
        let m = r.try_mul(t.matrix())?.try_mul(&r.transpose())?;
        Tensor3D::new(m, base)
    }

    /// Scalar product; `b` is brought into the base of `a`.
    pub fn dot(&self, a: &Vector3D, b: &Vector3D) -> Result<Expr> {
        let b = self.in_base(b, a.base())?;
        Ok(a.dot_components(&b))
    }

    /// Cross product, expressed in the base of `a`.
    pub fn cross(&self, a: &Vector3D, b: &Vector3D) -> Result<Vector3D> {
        let b = self.in_base(b, a.base())?;
        Ok(a.cross_components(&b))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Expr, Matrix, System};

    fn chain() -> System {
        let mut sys = System::new();
        let [a, ..] = sys.new_coordinate("a", ()).unwrap();
        let [b, ..] = sys.new_coordinate("b", ()).unwrap();
        sys.new_base("B1", "xyz", [0.0, 0.0, 1.0], &a).unwrap();
        sys.new_base("B2", "B1", [1.0, 0.0, 0.0], &b).unwrap();
        sys.new_base("C1", "xyz", [0.0, 2.0, 0.0], 0.5).unwrap();
        sys
    }

    fn numeric(sys: &System, m: &Matrix, a: f64, b: f64) -> Vec<f64> {
        let (qa, qb) = (sys.get_symbol("a").unwrap(), sys.get_symbol("b").unwrap());
        m.iter()
            .map(|e| {
                e.eval_with(&|s| {
                    if *s == qa {
                        Some(a)
                    } else if *s == qb {
                        Some(b)
                    } else {
                        None
                    }
                })
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn rotation_about_z() {
        let sys = chain();
        let r = sys.rotation_matrix("xyz", "B1").unwrap();
        insta::assert_snapshot!(r, @"[[cos(a), -sin(a), 0], [sin(a), cos(a), 0], [0, 0, 1]]");
        assert_eq!(sys.rotation_matrix("B2", "B2").unwrap(), Matrix::identity(3));
    }

    #[test]
    fn composition_is_associative_along_paths() {
        let sys = chain();
        let direct = sys.rotation_matrix("C1", "B2").unwrap();
        let composed = sys
            .rotation_matrix("C1", "B1")
            .unwrap()
            .try_mul(&sys.rotation_matrix("B1", "B2").unwrap())
            .unwrap();
        let lhs = numeric(&sys, &direct, 0.3, -1.2);
        let rhs = numeric(&sys, &composed, 0.3, -1.2);
        for (x, y) in lhs.iter().zip(&rhs) {
            assert!((x - y).abs() < 1e-12, "{x} != {y}");
        }
    }

    #[test]
    fn rotations_are_orthonormal() {
        let sys = chain();
        let r = sys.rotation_matrix("C1", "B2").unwrap();
        let rrt = r.try_mul(&r.transpose()).unwrap();
        let values = numeric(&sys, &rrt, 0.7, 2.1);
        for (i, v) in values.iter().enumerate() {
            let expected = if i % 4 == 0 { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn disjoint_forests_are_rejected() {
        let mut sys = chain();
        sys.new_absolute_base("free").unwrap();
        sys.new_base("F1", "free", [0.0, 0.0, 1.0], 1.0).unwrap();
        assert!(matches!(
            sys.rotation_matrix("F1", "B2"),
            Err(Error::GraphConnectivity { .. })
        ));
        assert_eq!(sys.reduced_base("B2", "C1").unwrap().name(), "xyz");
        assert_eq!(sys.reduced_base("B2", "B1").unwrap().name(), "B1");
    }

    #[test]
    fn vectors_change_base_and_multiply() {
        let sys = chain();
        let ex = sys.vector((1.0, 0.0, 0.0), "B1").unwrap();
        let in_xyz = sys.in_base(&ex, "xyz").unwrap();
        let a = Expr::from(sys.get_symbol("a").unwrap());
        assert_eq!(in_xyz.x(), &a.cos());
        assert_eq!(in_xyz.y(), &a.sin());

        let ey = sys.vector((0.0, 1.0, 0.0), "B1").unwrap();
        let ez = sys.cross(&ex, &ey).unwrap();
        assert_eq!(ez.components(), &[Expr::zero(), Expr::zero(), Expr::one()]);
        let qa = sys.get_symbol("a").unwrap();
        let unit = sys.dot(&in_xyz, &ex).unwrap();
        let value = unit.eval_with(&|s| (*s == qa).then_some(0.4)).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }
}
