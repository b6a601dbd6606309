//! Numerically stable log-domain primitives.
//!
//! Both evaluation passes live entirely in log space, so the two workhorses
//! here are `log(1 - exp(x))` and the max-shifted logsumexp reduction. The
//! tensor versions are generic over the backend and built from elementary
//! ops with defined derivatives, so they stay usable under autodiff.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

const LN_2: f64 = core::f64::consts::LN_2;

/// `log(1 - exp(-|x|))`, branch-stable at both extremes.
///
/// The input is negated to `-|x|` first; below `ln 2` in magnitude the
/// `log(-expm1(x))` form avoids the cancellation in `1 - exp(x)`, beyond it
/// `log1p(-exp(x))` avoids losing the tiny `exp(x)`.
/// See Maechler, "Accurately computing log(1 - exp(-|a|))".
pub fn log1mexp<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let x = x.abs().neg();
    let near_zero = x.clone().greater_elem(-LN_2);
    let near = x.clone().exp().sub_scalar(1.0).neg().log();
    let far = x.exp().neg().log1p();
    far.mask_where(near_zero, near)
}

/// Scalar `f64` counterpart of [`log1mexp`], using the fused `exp_m1` /
/// `ln_1p` primitives. Serves as the high-precision reference in tests and
/// for CPU-side scalar work.
pub fn log1mexp_f64(x: f64) -> f64 {
    let x = -x.abs();
    if x > -LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

/// Max-shifted `log(sum(exp(t)))` along `dim`, keeping the reduced axis
/// with size 1.
///
/// Subtracting the axis max before exponentiating keeps the sum in range;
/// operands holding the finite log-zero padding constant underflow to a
/// zero summand instead of producing NaN, and the result stays
/// differentiable.
pub fn logsumexp_dim<B: Backend, const D: usize>(t: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    let max = t.clone().max_dim(dim);
    (t - max.clone()).exp().sum_dim(dim).log() + max
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_log1mexp_f64_at_branch_boundary() {
        // log(1 - exp(-ln 2)) = log(1/2), exactly on the branch switch.
        assert!((log1mexp_f64(LN_2) + LN_2).abs() < 1e-15);
        assert!((log1mexp_f64(-LN_2) + LN_2).abs() < 1e-15);
    }

    #[test]
    fn test_log1mexp_f64_tiny_arguments() {
        // 1 - exp(-x) = x * (1 - x/2 + ...) for small x.
        for &x in &[1e-10f64, 1e-8, 1e-6] {
            let expected = x.ln() + (-x / 2.0 + x * x / 24.0).ln_1p();
            assert!(
                (log1mexp_f64(x) - expected).abs() < 1e-12,
                "x = {x}"
            );
        }
    }

    #[test]
    fn test_log1mexp_f64_large_arguments() {
        // log(1 - exp(-x)) -> -exp(-x) as x grows.
        for &x in &[20.0f64, 35.0, 50.0] {
            let expected = -(-x).exp();
            assert!(
                (log1mexp_f64(x) - expected).abs() < 1e-18,
                "x = {x}"
            );
        }
    }

    #[test]
    fn test_log1mexp_f64_matches_naive_in_safe_range() {
        // Where the naive formula is itself accurate, both must agree.
        let mut x = 0.1f64;
        while x < 30.0 {
            let naive = (1.0 - (-x).exp()).ln();
            assert!(
                (log1mexp_f64(x) - naive).abs() < 1e-12,
                "x = {x}"
            );
            x *= 1.7;
        }
    }

    #[test]
    fn test_log1mexp_tensor_matches_scalar_reference() {
        type B = NdArray;
        let device = Default::default();

        let sweep: Vec<f32> = vec![
            0.05, 0.2, 0.5, 0.683, 0.693, 0.6932, 0.703, 1.0, 2.0, 5.0, 10.0, 25.0, 40.0,
        ];
        let t: Tensor<B, 1> = Tensor::from_floats(sweep.as_slice(), &device);
        let out: Vec<f32> = log1mexp(t).into_data().to_vec().unwrap();
        for (x, y) in sweep.iter().zip(out) {
            let expected = log1mexp_f64(*x as f64) as f32;
            assert!(
                (y - expected).abs() < 1e-4,
                "x = {x}: {y} vs {expected}"
            );
        }
    }

    #[test]
    fn test_log1mexp_tensor_accepts_negated_input() {
        type B = NdArray;
        let device = Default::default();

        // log-probabilities arrive as negative numbers; |x| handles both signs.
        let t: Tensor<B, 1> = Tensor::from_data([-0.5f32, -2.0], &device);
        let out: Vec<f32> = log1mexp(t).into_data().to_vec().unwrap();
        assert!((out[0] - log1mexp_f64(0.5) as f32).abs() < 1e-5);
        assert!((out[1] - log1mexp_f64(2.0) as f32).abs() < 1e-5);
    }

    #[test]
    fn test_logsumexp_basic() {
        type B = NdArray;
        let device = Default::default();

        let t: Tensor<B, 2> =
            Tensor::from_data([[0.5f32.ln(), 0.25f32.ln(), 0.125f32.ln()]], &device);
        let out: Vec<f32> = logsumexp_dim(t, 1).into_data().to_vec().unwrap();
        assert!((out[0] - 0.875f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_logsumexp_ignores_log_zero_padding() {
        type B = NdArray;
        let device = Default::default();

        let t: Tensor<B, 2> = Tensor::from_data([[0.5f32.ln(), -1000.0, -1000.0]], &device);
        let out: Vec<f32> = logsumexp_dim(t, 1).into_data().to_vec().unwrap();
        assert!(out[0].is_finite());
        assert!((out[0] - 0.5f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_logsumexp_all_padding_stays_finite() {
        type B = NdArray;
        let device = Default::default();

        let t: Tensor<B, 2> = Tensor::from_data([[-1000.0f32, -1000.0]], &device);
        let out: Vec<f32> = logsumexp_dim(t, 1).into_data().to_vec().unwrap();
        assert!(out[0].is_finite());
        assert!((out[0] - (-1000.0 + 2.0f32.ln())).abs() < 1e-3);
    }
}
