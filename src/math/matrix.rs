use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::Mul;

use crate::error::{Error, Result};

/// Dense row-major matrix of `f64`.
///
/// The shape is fixed at construction. Arithmetic returns a new matrix and
/// fails with `Error::DimensionMismatch` on incompatible operands; `set` is
/// the only in-place mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Unchecked wire form; converted through `TryFrom` so a JSON file can never
/// produce a matrix whose buffer disagrees with its shape.
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = String;

    fn try_from(raw: RawMatrix) -> std::result::Result<Self, Self::Error> {
        if raw.data.len() != raw.rows * raw.cols {
            return Err(format!(
                "matrix {}x{} holds {} values",
                raw.rows,
                raw.cols,
                raw.data.len()
            ));
        }
        Ok(Matrix { rows: raw.rows, cols: raw.cols, data: raw.data })
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix { rows, cols, data: vec![value; rows * cols] }
    }

    /// Wraps a row-major buffer; `data.len()` must equal `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(Error::DimensionMismatch {
                op: "from_vec",
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from nested rows. Ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = rows.first().map_or(0, |r| r.len());
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::DimensionMismatch {
                    op: "from_rows",
                    left: (n_rows, cols),
                    right: (1, row.len()),
                });
            }
            data.extend(row);
        }
        Ok(Matrix { rows: n_rows, cols, data })
    }

    /// n × 1 column vector.
    pub fn column(values: Vec<f64>) -> Matrix {
        Matrix { rows: values.len(), cols: 1, data: values }
    }

    /// 1 × n row vector.
    pub fn row(values: Vec<f64>) -> Matrix {
        Matrix { rows: 1, cols: values.len(), data: values }
    }

    /// Samples every element from U[0, 1).
    pub fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let data = (0..rows * cols).map(|_| rng.gen::<f64>()).collect();
        Matrix { rows, cols, data }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // (0, 1] keeps ln() finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Matrix { rows, cols, data }
    }

    /// He initialization: N(0, sqrt(2 / cols)).
    ///
    /// Suited to LeakyReLU layers. `cols` is the fan-in, since weights are
    /// stored as (outputs, inputs).
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / cols.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / cols)).
    ///
    /// Suited to Sigmoid and Linear layers.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / cols.max(1) as f64).sqrt(), rng)
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

    /// Row-major view of the elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.offset(row, col).map(|i| self.data[i])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data[i] = value;
        Ok(())
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::IndexOutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }
        Ok(row * self.cols + col)
    }

    fn same_shape(&self, rhs: &Matrix, op: &'static str) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(Error::DimensionMismatch { op, left: self.shape(), right: rhs.shape() });
        }
        Ok(())
    }

    fn zip_with<F>(&self, rhs: &Matrix, op: &'static str, f: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.same_shape(rhs, op)?;
        let data = self.data.iter().zip(&rhs.data).map(|(&a, &b)| f(a, b)).collect();
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    pub fn subtract(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "subtract", |a, b| a - b)
    }

    /// Hadamard product.
    pub fn elementwise_multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "elementwise_multiply", |a, b| a * b)
    }

    /// Matrix product; requires `self.cols == rhs.rows`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(Error::DimensionMismatch {
                op: "multiply",
                left: self.shape(),
                right: rhs.shape(),
            });
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let lhs_row = &self.data[i * self.cols..(i + 1) * self.cols];
            for (k, &a) in lhs_row.iter().enumerate() {
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                let out = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
                for (o, &b) in out.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }

        Ok(res)
    }

    pub fn scalar_multiply(&self, k: f64) -> Matrix {
        self.map(|x| x * k)
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    pub fn power(&self, p: f64) -> Matrix {
        self.map(|x| x.powf(p))
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

impl Mul<f64> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: f64) -> Matrix {
        self.scalar_multiply(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn m(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn multiply_matches_hand_computation() {
        let a = m(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let b = m(vec![vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]]);
        let c = a.multiply(&b).unwrap();
        assert_eq!(c, m(vec![vec![58.0, 64.0], vec![139.0, 154.0]]));
    }

    #[test]
    fn multiply_rejects_inner_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert!(matches!(
            a.multiply(&b),
            Err(Error::DimensionMismatch { op: "multiply", left: (2, 3), right: (2, 3) })
        ));
    }

    #[test]
    fn elementwise_ops_require_identical_shape() {
        let a = Matrix::zeros(2, 2);
        let b = Matrix::zeros(2, 1);
        assert!(a.add(&b).is_err());
        assert!(a.subtract(&b).is_err());
        assert!(a.elementwise_multiply(&b).is_err());
    }

    #[test]
    fn elementwise_ops() {
        let a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = m(vec![vec![0.5, 1.0], vec![2.0, -1.0]]);
        assert_eq!(a.add(&b).unwrap().as_slice(), &[1.5, 3.0, 5.0, 3.0]);
        assert_eq!(a.subtract(&b).unwrap().as_slice(), &[0.5, 1.0, 1.0, 5.0]);
        assert_eq!(a.elementwise_multiply(&b).unwrap().as_slice(), &[0.5, 2.0, 6.0, -4.0]);
        assert_eq!((&a * 2.0).as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn transpose_swaps_shape_and_elements() {
        let a = m(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let t = a.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 1).unwrap(), 6.0);
        assert_eq!(t.get(0, 1).unwrap(), 4.0);
        assert_eq!(t.transpose(), a);
    }

    #[test]
    fn power_and_sum() {
        let a = m(vec![vec![1.0, -2.0], vec![3.0, 0.0]]);
        assert_eq!(a.power(2.0).sum(), 14.0);
    }

    #[test]
    fn set_is_bounds_checked() {
        let mut a = Matrix::zeros(2, 2);
        a.set(1, 0, 5.0).unwrap();
        assert_eq!(a.get(1, 0).unwrap(), 5.0);
        assert!(matches!(a.set(2, 0, 1.0), Err(Error::IndexOutOfBounds { .. })));
        assert!(a.get(0, 2).is_err());
    }

    #[test]
    fn clone_is_deep() {
        let a = Matrix::zeros(1, 2);
        let mut b = a.clone();
        b.set(0, 0, 1.0).unwrap();
        assert_eq!(a.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(Matrix::from_vec(2, 2, vec![1.0]).is_err());
    }

    #[test]
    fn seeded_initializers_are_reproducible() {
        let a = Matrix::xavier(3, 4, &mut ChaCha8Rng::seed_from_u64(7));
        let b = Matrix::xavier(3, 4, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        let u = Matrix::uniform(5, 5, &mut ChaCha8Rng::seed_from_u64(1));
        assert!(u.as_slice().iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn deserialize_rejects_inconsistent_buffer() {
        let bad = r#"{"rows":2,"cols":2,"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<Matrix>(bad).is_err());
        let good = r#"{"rows":1,"cols":2,"data":[1.0,2.0]}"#;
        assert_eq!(serde_json::from_str::<Matrix>(good).unwrap().shape(), (1, 2));
    }

    proptest! {
        #[test]
        fn multiply_shape_is_outer_dims(r in 1usize..6, k in 1usize..6, c in 1usize..6, k2 in 1usize..6) {
            let a = Matrix::filled(r, k, 1.0);
            let b = Matrix::filled(k, c, 1.0);
            prop_assert_eq!(a.multiply(&b).unwrap().shape(), (r, c));
            if k2 != k {
                let bad = Matrix::filled(k2, c, 1.0);
                prop_assert!(a.multiply(&bad).is_err());
            }
        }
    }
}
