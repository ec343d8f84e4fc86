//! Ratio-of-uniforms normal variate generation
//!
//! Rejection sampler over pairs of uniform draws (Kinderman-Monahan): a
//! candidate `x = v/u` is accepted immediately when it falls inside a cheap
//! squeeze region, and only borderline candidates pay for the exact
//! logarithmic test. Statistically exact, loops until acceptance, and fully
//! reproducible under a seeded generator.
//!
//! Used to build synthetic samples for estimator tests; production return
//! generation in the simulator goes through the same interface shape but is
//! free to substitute any seedable normal source.

use ndarray::Array2;
use rand::Rng;
use rand::distributions::OpenClosed01;
use rand_distr::ChiSquared;

/// Half-width of the `v` band, `sqrt(2/e)`.
const V_BOUND: f64 = 0.857_763_884_960_707;

/// Quick-accept boundary constant, `4·e^{1/4}`.
const QUICK_ACCEPT: f64 = 5.136_101_666_580_716;

/// Quick-reject boundary constant, `4·e^{-1.35}`.
const QUICK_REJECT: f64 = 1.036_961_042_583_566;

/// Draw one standard normal variate by the ratio-of-uniforms method.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        // u on (0, 1]: the ratio v/u must stay finite.
        let u: f64 = rng.sample(OpenClosed01);
        let v: f64 = rng.gen_range(-V_BOUND..V_BOUND);
        let x = v / u;
        let x2 = x * x;

        if x2 <= 5.0 - QUICK_ACCEPT * u {
            return x;
        }
        if x2 >= QUICK_REJECT / u + 1.4 {
            continue;
        }
        if x2 <= -4.0 * u.ln() {
            return x;
        }
    }
}

/// Draw an `n × 1` sample of normal variates with the given mean and
/// standard deviation.
pub fn normal_sample<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    mean: f64,
    std_dev: f64,
) -> Array2<f64> {
    let mut sample = Array2::<f64>::zeros((n, 1));
    for i in 0..n {
        sample[[i, 0]] = mean + std_dev * standard_normal(rng);
    }
    sample
}

/// Draw an `n × 1` sample of Student's t variates with the given location,
/// scale, and degrees of freedom, via `t = z / sqrt(w/ν)` with `w ~ χ²(ν)`.
pub fn student_t_sample<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    location: f64,
    scale: f64,
    degrees_of_freedom: f64,
) -> Array2<f64> {
    let chi_squared =
        ChiSquared::new(degrees_of_freedom).expect("degrees of freedom must be positive");
    let mut sample = Array2::<f64>::zeros((n, 1));
    for i in 0..n {
        let z = standard_normal(rng);
        let w: f64 = rng.sample(chi_squared);
        sample[[i, 0]] = location + scale * z / (w / degrees_of_freedom).sqrt();
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_reproducible_under_fixed_seed() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(99);
        let mut rng_b = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..100 {
            assert_eq!(standard_normal(&mut rng_a), standard_normal(&mut rng_b));
        }
    }

    #[test]
    fn test_moments_of_standard_normal() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let n = 200_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let x = standard_normal(&mut rng);
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n as f64;
        let variance = sum_sq / n as f64 - mean * mean;
        assert_relative_eq!(mean, 0.0, epsilon = 0.01);
        assert_relative_eq!(variance, 1.0, epsilon = 0.02);
    }

    #[test]
    fn test_tail_mass_is_two_sided() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let n = 50_000;
        let positive = (0..n)
            .filter(|_| standard_normal(&mut rng) > 0.0)
            .count() as f64;
        let share = positive / n as f64;
        assert!((share - 0.5).abs() < 0.01, "positive share {share}");
    }

    #[test]
    fn test_normal_sample_shape_and_location() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let sample = normal_sample(&mut rng, 10_000, 3.0, 0.5);
        assert_eq!(sample.dim(), (10_000, 1));
        let mean = sample.sum() / 10_000.0;
        assert_relative_eq!(mean, 3.0, epsilon = 0.05);
    }

    #[test]
    fn test_student_t_sample_is_heavier_tailed() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let n = 50_000;
        let t = student_t_sample(&mut rng, n, 0.0, 1.0, 3.0);
        let extreme = t.iter().filter(|v| v.abs() > 4.0).count() as f64 / n as f64;
        // P(|t₃| > 4) ≈ 1.4%; the normal tail beyond 4 is ~0.006%.
        assert!(extreme > 0.005, "extreme share {extreme}");
    }
}
