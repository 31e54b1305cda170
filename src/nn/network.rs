//! Feed-forward multilayer perceptron with min/max normalised inputs and outputs.
//!
//! A [`NeuralNet`] is immutable once built. Every evaluation allocates its own
//! layer buffers sized from the topology, so one instance can be shared by
//! reference (or behind an `Arc`) across worker threads without locking.

use super::activation::{ActivationMode, sigmoid};
use super::error::NetError;
use super::jacobian::Jacobian;

#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNet {
    in_min: Vec<f64>,
    in_max: Vec<f64>,
    out_min: Vec<f64>,
    out_max: Vec<f64>,
    layer_sizes: Vec<usize>,
    // Per plane, row-major `[size[p + 1]][size[p]]`.
    weights: Vec<Vec<f64>>,
    biases: Vec<Vec<f64>>,
    activation: ActivationMode,
}

impl NeuralNet {
    /// Builds a network from its ranges and per-plane `weights[plane][out][in]`
    /// and `biases[plane][out]`.
    pub fn new(
        in_range: (Vec<f64>, Vec<f64>),
        out_range: (Vec<f64>, Vec<f64>),
        layer_sizes: Vec<usize>,
        weights: Vec<Vec<Vec<f64>>>,
        biases: Vec<Vec<f64>>,
    ) -> Result<Self, NetError> {
        let (in_min, in_max) = in_range;
        let (out_min, out_max) = out_range;
        let n_planes = layer_sizes.len();

        if n_planes < 2 {
            return Err(NetError::InvalidTopology(format!(
                "at least 2 planes required, got {}",
                n_planes
            )));
        }
        if layer_sizes.contains(&0) {
            return Err(NetError::InvalidTopology(
                "plane sizes must be positive".to_string(),
            ));
        }
        if in_min.len() != in_max.len() || out_min.len() != out_max.len() {
            return Err(NetError::InvalidTopology(
                "min and max vectors differ in length".to_string(),
            ));
        }
        if layer_sizes[0] != in_min.len() {
            return Err(NetError::InvalidTopology(format!(
                "input plane has {} neurons but {} inputs are declared",
                layer_sizes[0],
                in_min.len()
            )));
        }
        if layer_sizes[n_planes - 1] != out_min.len() {
            return Err(NetError::InvalidTopology(format!(
                "output plane has {} neurons but {} outputs are declared",
                layer_sizes[n_planes - 1],
                out_min.len()
            )));
        }
        // Inputs are normalised by their range width.
        if let Some(index) = in_min
            .iter()
            .zip(&in_max)
            .position(|(lo, hi)| !(hi - lo).is_finite() || hi == lo)
        {
            return Err(NetError::DegenerateRange {
                index,
                min: in_min[index],
                max: in_max[index],
            });
        }
        if weights.len() != n_planes - 1 || biases.len() != n_planes - 1 {
            return Err(NetError::InvalidTopology(format!(
                "expected {} weight and bias blocks, got {} and {}",
                n_planes - 1,
                weights.len(),
                biases.len()
            )));
        }

        let mut flat_weights = Vec::with_capacity(n_planes - 1);
        for (plane, (w, b)) in weights.into_iter().zip(&biases).enumerate() {
            let (n_prev, n_next) = (layer_sizes[plane], layer_sizes[plane + 1]);
            if w.len() != n_next || b.len() != n_next || w.iter().any(|row| row.len() != n_prev)
            {
                return Err(NetError::InvalidTopology(format!(
                    "plane {} must map {} to {} neurons",
                    plane, n_prev, n_next
                )));
            }
            flat_weights.push(w.into_iter().flatten().collect());
        }

        Ok(Self {
            in_min,
            in_max,
            out_min,
            out_max,
            layer_sizes,
            weights: flat_weights,
            biases,
            activation: ActivationMode::default(),
        })
    }

    /// Returns the same network evaluating `forward` with the given activation.
    pub fn with_activation(mut self, activation: ActivationMode) -> Self {
        self.activation = activation;
        self
    }

    pub fn n_in(&self) -> usize {
        self.in_min.len()
    }

    pub fn n_out(&self) -> usize {
        self.out_min.len()
    }

    pub fn in_min(&self) -> &[f64] {
        &self.in_min
    }

    pub fn in_max(&self) -> &[f64] {
        &self.in_max
    }

    pub fn out_min(&self) -> &[f64] {
        &self.out_min
    }

    pub fn out_max(&self) -> &[f64] {
        &self.out_max
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn activation(&self) -> ActivationMode {
        self.activation
    }

    /// Row-major weights and biases per plane.
    pub(crate) fn parameters(&self) -> (&[Vec<f64>], &[Vec<f64>]) {
        (&self.weights, &self.biases)
    }

    /// True when any input lies outside the training range. NaN counts as outside.
    pub fn input_out_of_range(&self, x: &[f64]) -> bool {
        out_of_bounds(x, &self.in_min, &self.in_max)
    }

    /// True when any output lies outside the training range. NaN counts as outside.
    pub fn output_out_of_range(&self, y: &[f64]) -> bool {
        out_of_bounds(y, &self.out_min, &self.out_max)
    }

    /// Evaluates the network.
    ///
    /// Inputs are normalised without clamping; values outside the training
    /// range are legal and simply extrapolate.
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != self.n_in()`.
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.n_in(), "input length must equal n_in");

        let widest = self.layer_sizes.iter().copied().max().unwrap_or(0);
        let mut act = self.normalize(x);
        let mut next = Vec::with_capacity(widest);

        for plane in 0..self.layer_sizes.len() - 1 {
            let n_prev = self.layer_sizes[plane];
            next.clear();
            for (row, bias) in self.weights[plane]
                .chunks_exact(n_prev)
                .zip(&self.biases[plane])
            {
                next.push(self.activation.apply(bias + scalar_product(row, &act)));
            }
            std::mem::swap(&mut act, &mut next);
        }

        self.denormalize(&act)
    }

    /// Evaluates the network together with its Jacobian `∂out/∂x`.
    ///
    /// The derivative relies on `σ'(z) = σ(z)(1 − σ(z))`, which only holds for
    /// the exact logistic function, so this always evaluates the exact sigmoid
    /// regardless of [`Self::activation`]. The returned outputs therefore match
    /// `forward` under [`ActivationMode::Exact`].
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != self.n_in()`.
    pub fn jacobian(&self, x: &[f64]) -> (Vec<f64>, Jacobian) {
        let n_in = self.n_in();
        assert_eq!(x.len(), n_in, "input length must equal n_in");

        let mut act = self.normalize(x);

        // d(act)/dx, row-major [size[p]][n_in]; the input plane is diagonal.
        let mut d_act = vec![0.0; n_in * n_in];
        for i in 0..n_in {
            d_act[i * n_in + i] = 1.0 / (self.in_max[i] - self.in_min[i]);
        }

        for plane in 0..self.layer_sizes.len() - 1 {
            let n_prev = self.layer_sizes[plane];
            let n_next = self.layer_sizes[plane + 1];
            let mut next_act = Vec::with_capacity(n_next);
            let mut next_d_act = vec![0.0; n_next * n_in];

            for (i, (row, bias)) in self.weights[plane]
                .chunks_exact(n_prev)
                .zip(&self.biases[plane])
                .enumerate()
            {
                let a = sigmoid(bias + scalar_product(row, &act));
                let help = a * (1.0 - a);
                next_act.push(a);

                let out_row = &mut next_d_act[i * n_in..(i + 1) * n_in];
                for (k, w) in row.iter().enumerate() {
                    let scale = help * w;
                    for (dst, src) in out_row.iter_mut().zip(&d_act[k * n_in..(k + 1) * n_in]) {
                        *dst += scale * src;
                    }
                }
            }

            act = next_act;
            d_act = next_d_act;
        }

        let output = self.denormalize(&act);
        for (i, row) in d_act.chunks_exact_mut(n_in).enumerate() {
            let range = self.out_max[i] - self.out_min[i];
            row.iter_mut().for_each(|v| *v *= range);
        }

        (output, Jacobian::from_rows(self.n_out(), n_in, d_act))
    }

    /// First-order output perturbation `J(x) · dx` for an input perturbation `dx`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `dx` do not have length `n_in`.
    pub fn directional_derivative(&self, x: &[f64], dx: &[f64]) -> Vec<f64> {
        let (_, jacobian) = self.jacobian(x);
        jacobian.dot(dx)
    }

    fn normalize(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.in_min.iter().zip(&self.in_max))
            .map(|(v, (lo, hi))| (v - lo) / (hi - lo))
            .collect()
    }

    fn denormalize(&self, act: &[f64]) -> Vec<f64> {
        act.iter()
            .zip(self.out_min.iter().zip(&self.out_max))
            .map(|(a, (lo, hi))| a * (hi - lo) + lo)
            .collect()
    }
}

#[inline]
fn scalar_product(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

fn out_of_bounds(values: &[f64], min: &[f64], max: &[f64]) -> bool {
    values
        .iter()
        .zip(min.iter().zip(max))
        .any(|(v, (lo, hi))| !(v >= lo && v <= hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::activation::TABLE_EPSILON;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// 2 inputs, 2 hidden neurons, 1 output, unit ranges.
    fn fixture_net() -> NeuralNet {
        NeuralNet::new(
            (vec![0.0, 0.0], vec![1.0, 1.0]),
            (vec![0.0], vec![1.0]),
            vec![2, 2, 1],
            vec![
                vec![vec![1.0, -1.0], vec![0.5, 0.5]],
                vec![vec![2.0, -1.0]],
            ],
            vec![vec![0.0, -0.5], vec![0.1]],
        )
        .unwrap()
        .with_activation(ActivationMode::Exact)
    }

    fn random_net(rng: &mut StdRng, sizes: Vec<usize>) -> NeuralNet {
        let n_in = sizes[0];
        let n_out = *sizes.last().unwrap();
        let in_min: Vec<f64> = (0..n_in).map(|_| rng.random_range(-2.0..0.0)).collect();
        let in_max: Vec<f64> = in_min.iter().map(|m| m + rng.random_range(0.5..3.0)).collect();
        let out_min: Vec<f64> = (0..n_out).map(|_| rng.random_range(-5.0..0.0)).collect();
        let out_max: Vec<f64> = out_min.iter().map(|m| m + rng.random_range(0.5..4.0)).collect();

        let mut weights = Vec::new();
        let mut biases = Vec::new();
        for p in 0..sizes.len() - 1 {
            weights.push(
                (0..sizes[p + 1])
                    .map(|_| (0..sizes[p]).map(|_| rng.random_range(-2.0..2.0)).collect())
                    .collect(),
            );
            biases.push((0..sizes[p + 1]).map(|_| rng.random_range(-1.0..1.0)).collect());
        }

        NeuralNet::new((in_min, in_max), (out_min, out_max), sizes, weights, biases)
            .unwrap()
            .with_activation(ActivationMode::Exact)
    }

    #[test]
    fn test_single_layer_matches_hand_computation() {
        let net = NeuralNet::new(
            (vec![0.0, -1.0], vec![2.0, 1.0]),
            (vec![-1.0], vec![3.0]),
            vec![2, 1],
            vec![vec![vec![0.8, -0.4]]],
            vec![vec![0.2]],
        )
        .unwrap()
        .with_activation(ActivationMode::Exact);

        // a0 = [0.75, 0.75], z = 0.2 + 0.6 - 0.3 = 0.5
        let expected = sigmoid(0.5) * 4.0 - 1.0;
        let out = net.forward(&[1.5, 0.5]);
        assert_eq!(out.len(), 1);
        assert!((out[0] - expected).abs() < 1e-9, "{} vs {}", out[0], expected);
        assert!((out[0] - 1.4898373248074184).abs() < 1e-9);
    }

    #[test]
    fn test_three_layer_fixture() {
        let out = fixture_net().forward(&[0.5, 0.5]);
        assert!((out[0] - 0.6456563062257954).abs() < 1e-12, "{}", out[0]);
    }

    #[test]
    fn test_tabulated_forward_close_to_exact() {
        let exact = fixture_net();
        let fast = exact.clone().with_activation(ActivationMode::Tabulated);
        for x in [[0.5, 0.5], [0.0, 1.0], [3.0, -2.0], [-40.0, 40.0]] {
            let diff = (exact.forward(&x)[0] - fast.forward(&x)[0]).abs();
            // One hidden layer plus output: errors compound through a weight sum of 3.
            assert!(diff < 4.0 * TABLE_EPSILON, "x = {x:?}, diff = {diff}");
        }
    }

    #[test]
    fn test_jacobian_matches_central_difference() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let h = 1e-5;

        for _ in 0..20 {
            let n_in = rng.random_range(1..6);
            let hidden = rng.random_range(1..8);
            let n_out = rng.random_range(1..5);
            let sizes = if rng.random_bool(0.5) {
                vec![n_in, hidden, n_out]
            } else {
                vec![n_in, hidden, rng.random_range(1..6), n_out]
            };
            let net = random_net(&mut rng, sizes);

            let x: Vec<f64> = (0..n_in)
                .map(|i| rng.random_range(net.in_min()[i]..net.in_max()[i]))
                .collect();
            let (out, jac) = net.jacobian(&x);
            assert_eq!(out, net.forward(&x));

            for j in 0..n_in {
                let mut xp = x.clone();
                let mut xm = x.clone();
                xp[j] += h;
                xm[j] -= h;
                let fp = net.forward(&xp);
                let fm = net.forward(&xm);
                for i in 0..n_out {
                    let numeric = (fp[i] - fm[i]) / (2.0 * h);
                    let analytic = jac[(i, j)];
                    assert!(
                        (numeric - analytic).abs() < 1e-5 * (1.0 + analytic.abs()),
                        "d out[{i}] / d x[{j}]: numeric {numeric}, analytic {analytic}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_jacobian_ignores_tabulated_mode() {
        let exact = fixture_net();
        let fast = exact.clone().with_activation(ActivationMode::Tabulated);
        assert_eq!(exact.jacobian(&[0.2, 0.7]), fast.jacobian(&[0.2, 0.7]));
    }

    #[test]
    fn test_directional_derivative_is_jacobian_product() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = random_net(&mut rng, vec![4, 6, 3]);
        let x = [0.1, -0.3, 0.5, 0.0];
        let dx = [0.01, -0.02, 0.005, 0.3];

        let (_, jac) = net.jacobian(&x);
        assert_eq!(net.directional_derivative(&x, &dx), jac.dot(&dx));
    }

    #[test]
    fn test_out_of_range_inputs_extrapolate() {
        let net = fixture_net();
        assert!(net.input_out_of_range(&[1.5, 0.5]));
        assert!(net.input_out_of_range(&[f64::NAN, 0.5]));
        assert!(!net.input_out_of_range(&[1.0, 0.0]));
        assert!(net.forward(&[1.5, -0.5])[0].is_finite());
    }

    #[test]
    fn test_rejects_inconsistent_topology() {
        let err = NeuralNet::new(
            (vec![0.0], vec![1.0]),
            (vec![0.0], vec![1.0]),
            vec![1],
            vec![],
            vec![],
        );
        assert!(matches!(err, Err(NetError::InvalidTopology(_))));

        let err = NeuralNet::new(
            (vec![0.0, 0.0], vec![1.0, 1.0]),
            (vec![0.0], vec![1.0]),
            vec![2, 1],
            vec![vec![vec![1.0]]],
            vec![vec![0.0]],
        );
        assert!(matches!(err, Err(NetError::InvalidTopology(_))));
    }

    #[test]
    fn test_rejects_degenerate_input_range() {
        let err = NeuralNet::new(
            (vec![0.0, 2.0], vec![1.0, 2.0]),
            (vec![0.0], vec![1.0]),
            vec![2, 1],
            vec![vec![vec![1.0, 1.0]]],
            vec![vec![0.0]],
        );
        assert!(matches!(err, Err(NetError::DegenerateRange { index: 1, .. })));

        // a zero-width output range only pins the output
        let net = NeuralNet::new(
            (vec![0.0], vec![1.0]),
            (vec![3.0], vec![3.0]),
            vec![1, 1],
            vec![vec![vec![1.0]]],
            vec![vec![0.0]],
        )
        .unwrap();
        assert_eq!(net.forward(&[0.5]), vec![3.0]);
    }

    #[test]
    fn test_shared_across_threads() {
        let net = fixture_net();
        let expected = net.forward(&[0.3, 0.9]);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(net.forward(&[0.3, 0.9]), expected);
                    }
                });
            }
        });
    }
}
