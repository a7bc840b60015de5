use super::Base;
use crate::{
    error::{Error, Result},
    expr::Expr,
    matrix::Matrix,
    symbol::Symbol,
};
use std::{fmt, ops::Index};

/// Anything that can supply the three components of a vector.
pub trait IntoComponents {
    fn into_components(self) -> [Expr; 3];
}

impl<E: Into<Expr>> IntoComponents for [E; 3] {
    fn into_components(self) -> [Expr; 3] {
        self.map(Into::into)
    }
}

impl<A, B, C> IntoComponents for (A, B, C)
where
    A: Into<Expr>,
    B: Into<Expr>,
    C: Into<Expr>,
{
    fn into_components(self) -> [Expr; 3] {
        [self.0.into(), self.1.into(), self.2.into()]
    }
}

/// Three components expressed in `base`.
///
/// Arithmetic here assumes both operands share a base; mixing bases goes
/// through [`System`](crate::System), which can rotate components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vector3D {
    components: [Expr; 3],
    base: Base,
}

impl Vector3D {
    pub fn new(components: [Expr; 3], base: Base) -> Self {
        Self { components, base }
    }

    pub fn zero(base: Base) -> Self {
        Self::new([Expr::zero(), Expr::zero(), Expr::zero()], base)
    }

    /// From a 3x1 or 1x3 matrix.
    pub fn from_matrix(m: &Matrix, base: Base) -> Result<Self> {
        if m.len() != 3 || !(m.is_column() || m.is_row()) {
            return Err(Error::Shape {
                op: "vector",
                lhs: (3, 1),
                rhs: m.shape(),
            });
        }
        Ok(Self::new([m[0].clone(), m[1].clone(), m[2].clone()], base))
    }

    pub fn components(&self) -> &[Expr; 3] {
        &self.components
    }

    pub fn x(&self) -> &Expr {
        &self.components[0]
    }

    pub fn y(&self) -> &Expr {
        &self.components[1]
    }

    pub fn z(&self) -> &Expr {
        &self.components[2]
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    pub fn to_matrix(&self) -> Matrix {
        Matrix::column(self.components.iter().cloned())
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        Self::new(self.components.each_ref().map(f), self.base.clone())
    }

    pub fn scale(&self, factor: &Expr) -> Self {
        self.map(|c| c * factor)
    }

    pub fn subs(&self, old: &Expr, new: &Expr) -> Self {
        self.map(|c| c.subs(old, new))
    }

    pub fn diff(&self, var: &Symbol) -> Self {
        self.map(|c| c.diff(var))
    }

    pub fn is_zero(&self) -> bool {
        self.components.iter().all(Expr::is_zero)
    }

    /// Euclidean norm.
    pub fn module(&self) -> Expr {
        self.components
            .iter()
            .map(|c| c.pow(2.0))
            .sum::<Expr>()
            .sqrt()
    }

    /// Skew-symmetric tensor `[v]x` with `[v]x * w == v x w`.
    pub fn skew(&self) -> Tensor3D {
        let [x, y, z] = &self.components;
        let matrix = Matrix::from_parts(
            3,
            3,
            vec![
                Expr::zero(),
                -z,
                y.clone(),
                z.clone(),
                Expr::zero(),
                -x,
                -y,
                x.clone(),
                Expr::zero(),
            ],
        );
        Tensor3D {
            matrix,
            base: self.base.clone(),
        }
    }

    pub(crate) fn zip(&self, other: &Vector3D, f: impl Fn(&Expr, &Expr) -> Expr) -> Self {
        let [a0, a1, a2] = &self.components;
        let [b0, b1, b2] = &other.components;
        Self::new([f(a0, b0), f(a1, b1), f(a2, b2)], self.base.clone())
    }

    pub(crate) fn dot_components(&self, other: &Vector3D) -> Expr {
        self.components
            .iter()
            .zip(&other.components)
            .map(|(a, b)| a * b)
            .sum()
    }

    pub(crate) fn cross_components(&self, other: &Vector3D) -> Self {
        let [a0, a1, a2] = &self.components;
        let [b0, b1, b2] = &other.components;
        Self::new(
            [a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0],
            self.base.clone(),
        )
    }
}

impl Index<usize> for Vector3D {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.components[index]
    }
}

impl std::ops::Neg for &Vector3D {
    type Output = Vector3D;

    fn neg(self) -> Vector3D {
        self.map(|c| -c)
    }
}

impl std::ops::Neg for Vector3D {
    type Output = Vector3D;

    fn neg(self) -> Vector3D {
        -&self
    }
}

impl fmt::Display for Vector3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = &self.components;
        write!(f, "[{x}, {y}, {z}] in {}", self.base)
    }
}

/// 3x3 components expressed in `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tensor3D {
    matrix: Matrix,
    base: Base,
}

impl Tensor3D {
    pub fn new(matrix: Matrix, base: Base) -> Result<Self> {
        if matrix.shape() != (3, 3) {
            return Err(Error::Shape {
                op: "tensor",
                lhs: (3, 3),
                rhs: matrix.shape(),
            });
        }
        Ok(Self { matrix, base })
    }

    pub fn zero(base: Base) -> Self {
        Self {
            matrix: Matrix::zeros(3, 3),
            base,
        }
    }

    pub fn identity(base: Base) -> Self {
        Self {
            matrix: Matrix::identity(3),
            base,
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        self.matrix.get(row, col)
    }

    /// Replaces one component; indices outside 3x3 are a shape error.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Expr>) -> Result<()> {
        if row >= 3 || col >= 3 {
            return Err(Error::Shape {
                op: "tensor index",
                lhs: (3, 3),
                rhs: (row + 1, col + 1),
            });
        }
        self.matrix[(row, col)] = value.into();
        Ok(())
    }

    pub fn transpose(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
            base: self.base.clone(),
        }
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        Self {
            matrix: self.matrix.map(f),
            base: self.base.clone(),
        }
    }

    pub fn scale(&self, factor: &Expr) -> Self {
        self.map(|c| c * factor)
    }

    pub fn subs(&self, old: &Expr, new: &Expr) -> Self {
        self.map(|c| c.subs(old, new))
    }

    pub fn diff(&self, var: &Symbol) -> Self {
        self.map(|c| c.diff(var))
    }

    pub(crate) fn zip(&self, other: &Tensor3D, f: impl Fn(&Expr, &Expr) -> Expr) -> Self {
        let data = self
            .matrix
            .iter()
            .zip(other.matrix.iter())
            .map(|(a, b)| f(a, b))
            .collect();
        Self {
            matrix: Matrix::from_parts(3, 3, data),
            base: self.base.clone(),
        }
    }

    pub(crate) fn apply_components(&self, v: &Vector3D) -> Vector3D {
        let m = &self.matrix;
        let row = |r: usize| (0..3).map(|c| &m[(r, c)] * &v.components[c]).sum::<Expr>();
        Vector3D::new([row(0), row(1), row(2)], self.base.clone())
    }

    pub(crate) fn compose_components(&self, other: &Tensor3D) -> Self {
        let m = &self.matrix;
        let o = &other.matrix;
        let data = (0..9)
            .map(|i| {
                let (r, c) = (i / 3, i % 3);
                (0..3).map(|k| &m[(r, k)] * &o[(k, c)]).sum::<Expr>()
            })
            .collect();
        Self {
            matrix: Matrix::from_parts(3, 3, data),
            base: self.base.clone(),
        }
    }
}

impl std::ops::Neg for &Tensor3D {
    type Output = Tensor3D;

    fn neg(self) -> Tensor3D {
        self.map(|c| -c)
    }
}

impl fmt::Display for Tensor3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.matrix, self.base)
    }
}
