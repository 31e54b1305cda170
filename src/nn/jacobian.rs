use std::ops::Index;

/// Dense `n_out × n_in` matrix of output/input partial derivatives, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    n_out: usize,
    n_in: usize,
    data: Vec<f64>,
}

impl Jacobian {
    pub(crate) fn from_rows(n_out: usize, n_in: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n_out * n_in);
        Self { n_out, n_in, data }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_in.max(1)).take(self.n_out)
    }

    /// Matrix-vector product `J · v`.
    pub fn dot(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.n_in, "vector length must equal n_in");
        self.rows()
            .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }
}

impl Index<(usize, usize)> for Jacobian {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.n_in + j]
    }
}
