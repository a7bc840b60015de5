use crate::{
    error::{Error, Result},
    expr::Expr,
    symbol::Symbol,
};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Dense row-major grid of expressions. The shape is fixed at construction
/// and is at least 1x1.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl Matrix {
    /// Panics in debug builds if either dimension is zero.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        debug_assert!(rows > 0 && cols > 0, "empty matrix");
        Self {
            rows,
            cols,
            data: vec![Expr::zero(); rows * cols],
        }
    }

    /// Panics in debug builds if `n` is zero.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = Expr::one();
        }
        m
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<Expr>) -> Result<Self> {
        if rows == 0 || cols == 0 || data.len() != rows * cols {
            return Err(Error::Shape {
                op: "from_vec",
                lhs: (rows, cols),
                rhs: (data.len(), 1),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<Expr>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Builds a matrix from nested rows; ragged or empty input is a shape
    /// error.
    pub fn from_rows<R, I, E>(rows: R) -> Result<Self>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut data = Vec::new();
        let mut n_rows = 0;
        let mut n_cols = None;
        for row in rows {
            let before = data.len();
            data.extend(row.into_iter().map(Into::into));
            let width = data.len() - before;
            match n_cols {
                None => n_cols = Some(width),
                Some(expected) if expected != width => {
                    return Err(Error::Shape {
                        op: "from_rows",
                        lhs: (n_rows, expected),
                        rhs: (1, width),
                    });
                }
                Some(_) => {}
            }
            n_rows += 1;
        }
        Self::from_vec(n_rows, n_cols.unwrap_or(0), data)
    }

    /// Panics in debug builds if `items` is empty.
    pub fn row<E: Into<Expr>>(items: impl IntoIterator<Item = E>) -> Self {
        let data: Vec<Expr> = items.into_iter().map(Into::into).collect();
        debug_assert!(!data.is_empty(), "empty row matrix");
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    /// Panics in debug builds if `items` is empty.
    pub fn column<E: Into<Expr>>(items: impl IntoIterator<Item = E>) -> Self {
        let data: Vec<Expr> = items.into_iter().map(Into::into).collect();
        debug_assert!(!data.is_empty(), "empty column matrix");
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Assembles a `rows x cols` grid of blocks given in row-major order.
    pub fn block(rows: usize, cols: usize, blocks: &[Matrix]) -> Result<Self> {
        if blocks.len() != rows * cols {
            return Err(Error::Shape {
                op: "block",
                lhs: (rows, cols),
                rhs: (blocks.len(), 1),
            });
        }
        let widths: Vec<usize> = blocks.iter().take(cols).map(Matrix::cols).collect();
        let total_cols: usize = widths.iter().sum();
        let mut data = Vec::new();
        let mut total_rows = 0;

        for grid_row in blocks.chunks(cols.max(1)) {
            let height = grid_row.first().map_or(0, Matrix::rows);
            for (b, &width) in grid_row.iter().zip(&widths) {
                if b.rows != height || b.cols != width {
                    return Err(Error::Shape {
                        op: "block",
                        lhs: (height, width),
                        rhs: b.shape(),
                    });
                }
            }
            for r in 0..height {
                for b in grid_row {
                    data.extend_from_slice(&b.data[r * b.cols..(r + 1) * b.cols]);
                }
            }
            total_rows += height;
        }
        Self::from_vec(total_rows, total_cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_row(&self) -> bool {
        self.rows == 1
    }

    pub fn is_column(&self) -> bool {
        self.cols == 1
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[Expr] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.data.iter()
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.data[r * self.cols + c].clone());
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    fn zip_with(
        &self,
        other: &Matrix,
        op: &'static str,
        f: impl Fn(&Expr, &Expr) -> Expr,
    ) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(Error::Shape {
                op,
                lhs: self.shape(),
                rhs: other.shape(),
            });
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| f(a, b)).collect(),
        })
    }

    pub fn try_add(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Matrix product; `(r, k) x (k, c) -> (r, c)`.
    pub fn try_mul(&self, other: &Matrix) -> Result<Self> {
        if self.cols != other.rows {
            return Err(Error::Shape {
                op: "mul",
                lhs: self.shape(),
                rhs: other.shape(),
            });
        }
        let mut data = Vec::with_capacity(self.rows * other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                data.push(Expr::add_all((0..self.cols).map(|k| {
                    &self.data[r * self.cols + k] * &other.data[k * other.cols + c]
                })));
            }
        }
        Ok(Self {
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    pub fn scale(&self, factor: &Expr) -> Self {
        self.map(|e| e * factor)
    }

    pub fn subs(&self, old: &Expr, new: &Expr) -> Self {
        self.map(|e| e.subs(old, new))
    }

    pub fn subs_all(&self, pairs: &[(Expr, Expr)]) -> Self {
        self.map(|e| e.subs_all(pairs))
    }

    pub fn diff(&self, var: &Symbol) -> Self {
        self.map(|e| e.diff(var))
    }

    /// Distinct symbols of all cells, in registry order.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self.data.iter().flat_map(Expr::symbols).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Interprets every cell as a bare symbol.
    pub fn to_symbols(&self) -> Result<Vec<Symbol>> {
        self.data.iter().map(Expr::to_symbol).collect()
    }

    /// Partial derivatives of the `1 x n` row `self` with respect to the
    /// symbols of `vars` (an `m x 1` column or `1 x m` row of bare symbols).
    /// The result is `n x m`.
    pub fn jacobian(&self, vars: &Matrix) -> Result<Self> {
        if !self.is_row() || !(vars.is_column() || vars.is_row()) {
            return Err(Error::Shape {
                op: "jacobian",
                lhs: self.shape(),
                rhs: vars.shape(),
            });
        }
        let symbols = vars.to_symbols()?;
        Ok(self.jacobian_of(&symbols))
    }

    pub fn jacobian_symbol(&self, var: &Symbol) -> Result<Self> {
        if !self.is_row() {
            return Err(Error::Shape {
                op: "jacobian",
                lhs: self.shape(),
                rhs: (1, 1),
            });
        }
        Ok(self.jacobian_of(std::slice::from_ref(var)))
    }

    fn jacobian_of(&self, symbols: &[Symbol]) -> Self {
        let data = self
            .data
            .iter()
            .flat_map(|e| symbols.iter().map(move |s| e.diff(s)))
            .collect();
        Self {
            rows: self.data.len(),
            cols: symbols.len(),
            data,
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Expr;

    fn index(&self, (row, col): (usize, usize)) -> &Expr {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Expr {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

/// Row-major flat indexing, convenient for row and column vectors.
impl Index<usize> for Matrix {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.data[index]
    }
}

impl IndexMut<usize> for Matrix {
    fn index_mut(&mut self, index: usize) -> &mut Expr {
        &mut self.data[index]
    }
}

impl std::ops::Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self.map(|e| -e)
    }
}

impl std::ops::Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        -&self
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for r in 0..self.rows {
            if r > 0 {
                f.write_str(", ")?;
            }
            f.write_str("[")?;
            for c in 0..self.cols {
                if c > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", self.data[r * self.cols + c])?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix{:?}({self})", self.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{SymbolKind, SymbolRegistry, SystemId};

    fn ab() -> (Symbol, Symbol) {
        let mut reg = SymbolRegistry::new(SystemId::next());
        let a = reg.new_symbol("a", SymbolKind::Parameter, 0.0).unwrap();
        let b = reg.new_symbol("b", SymbolKind::Parameter, 0.0).unwrap();
        (a, b)
    }

    #[test]
    fn product_shapes() {
        let m = Matrix::zeros(3, 4).try_mul(&Matrix::zeros(4, 5)).unwrap();
        assert_eq!(m.shape(), (3, 5));

        let err = Matrix::zeros(3, 4).try_mul(&Matrix::zeros(5, 6)).unwrap_err();
        assert_eq!(
            err,
            Error::Shape {
                op: "mul",
                lhs: (3, 4),
                rhs: (5, 6)
            }
        );
    }

    #[test]
    fn product_values() {
        let (a, b) = ab();
        let m = Matrix::from_rows([
            [Expr::from(&a), Expr::from(&b)],
            [Expr::one(), Expr::zero()],
        ])
        .unwrap();
        let v = Matrix::column([Expr::from(&b), Expr::from(&a)]);
        let p = m.try_mul(&v).unwrap();
        insta::assert_snapshot!(p.to_string(), @"[[2*a*b], [b]]");
        assert_eq!(Matrix::identity(2).try_mul(&m).unwrap(), m);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(Matrix::from_rows(rows), Err(Error::Shape { .. })));
    }

    #[test]
    fn empty_shapes_are_rejected() {
        assert!(matches!(Matrix::from_vec(0, 0, vec![]), Err(Error::Shape { .. })));
        assert!(matches!(Matrix::from_vec(0, 3, vec![]), Err(Error::Shape { .. })));
        let no_rows: Vec<Vec<f64>> = vec![];
        assert!(matches!(Matrix::from_rows(no_rows), Err(Error::Shape { .. })));
        let empty_rows: Vec<Vec<f64>> = vec![vec![], vec![]];
        assert!(matches!(Matrix::from_rows(empty_rows), Err(Error::Shape { .. })));
        assert!(Matrix::block(0, 0, &[]).is_err());

        let one = Matrix::from_vec(1, 1, vec![Expr::one()]).unwrap();
        assert!(one.rows() >= 1 && one.cols() >= 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "empty matrix")]
    fn zero_sized_zeros_panic_in_debug() {
        let _ = Matrix::zeros(0, 0);
    }

    #[test]
    fn transpose_and_block() {
        let (a, b) = ab();
        let row = Matrix::row([Expr::from(&a), Expr::from(&b)]);
        assert_eq!(row.transpose().shape(), (2, 1));

        let one = Matrix::column([Expr::one()]);
        let stacked = Matrix::block(2, 1, &[row.transpose(), one]).unwrap();
        assert_eq!(stacked.shape(), (3, 1));
        assert_eq!(stacked[2], Expr::one());

        let side = Matrix::block(1, 2, &[Matrix::identity(2), row.transpose()]).unwrap();
        assert_eq!(side.shape(), (2, 3));
        assert!(Matrix::block(1, 2, &[Matrix::identity(2), row.clone()]).is_err());
        assert!(Matrix::block(2, 2, &[row]).is_err());
    }

    #[test]
    fn jacobian_shapes_and_errors() {
        let (a, b) = ab();
        let (ea, eb) = (Expr::from(&a), Expr::from(&b));
        let m = Matrix::from_rows([[ea.clone(), eb.clone()], [eb.clone(), ea.clone()]]).unwrap();
        let q = Matrix::row([ea.clone(), eb.clone()]);
        let r = Matrix::row([eb.clone(), ea.clone()]).transpose();

        assert_eq!(q.jacobian(&r).unwrap().shape(), (2, 2));
        assert_eq!(q.jacobian_symbol(&a).unwrap().shape(), (2, 1));
        assert!(matches!(m.jacobian(&r), Err(Error::Shape { .. })));
        assert!(matches!(q.jacobian(&m), Err(Error::Shape { .. })));
        assert!(m.jacobian(&m).is_err());

        let squares = Matrix::column([ea.pow(2.0), eb.pow(2.0)]);
        assert!(matches!(q.jacobian(&squares), Err(Error::NotASymbol { .. })));

        let q = Matrix::row([ea.pow(2.0), eb.pow(2.0), &ea + &eb]);
        let p = Matrix::column([ea.clone(), eb.clone()]);
        let j = q.jacobian(&p).unwrap();
        assert_eq!(j.shape(), (3, 2));
        assert_eq!(j[(0, 0)], 2.0 * &ea);
        assert!(j[(0, 1)].is_zero());
        assert_eq!(j[(2, 1)], Expr::one());
        assert_eq!(q.jacobian_symbol(&a).unwrap().shape(), (3, 1));
    }
}
