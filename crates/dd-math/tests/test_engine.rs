//! End-to-end tests of the fallback engine on the standard normal density:
//! segment cache, quantile table and Newton polishing working together.

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use dd_core::EngineConfig;
use dd_math::{adaptive_integrate, newton_refine, CdfSegmentCache, QuantileBuilder};
use proptest::prelude::*;
use statrs::function::erf::erfc;

const LEFT: f64 = -8.0;
const RIGHT: f64 = 8.0;

fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

fn reference_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / 2.0_f64.sqrt())
}

fn cache(samples: usize) -> CdfSegmentCache<f64, fn(f64) -> f64> {
    CdfSegmentCache::new(LEFT, RIGHT, pdf as fn(f64) -> f64, samples).unwrap()
}

// ─── Segment cache ────────────────────────────────────────────────────────────

#[test]
fn cache_matches_the_error_function() {
    let c = cache(64);
    let tail = reference_cdf(LEFT);
    for i in 0..=160 {
        let x = LEFT + 0.1 * i as f64;
        assert_abs_diff_eq!(c.lower(x).unwrap() + tail, reference_cdf(x), epsilon = 1e-14);
        assert_abs_diff_eq!(c.upper(x).unwrap() + tail, reference_cdf(-x), epsilon = 1e-14);
    }
}

#[test]
fn total_mass_matches_one_shot_integration() {
    let c = cache(32);
    let direct = adaptive_integrate(pdf, LEFT, RIGHT, 1e-16, -1).unwrap();
    assert_abs_diff_eq!(c.total(), direct.value, epsilon = 1e-14);
    assert_eq!(c.domain(), (LEFT, RIGHT));
    assert_eq!(c.lower_table().len(), 33);
    assert_eq!(c.upper_table()[32], 0.0);
}

#[test]
fn small_configurations_still_answer() {
    let config = EngineConfig {
        max_evaluations: 200,
        ..EngineConfig::default()
    };
    let c = CdfSegmentCache::with_config(LEFT, RIGHT, pdf, 1, &config).unwrap();
    assert_abs_diff_eq!(c.lower(0.0).unwrap(), 0.5 - reference_cdf(LEFT), epsilon = 1e-12);
}

proptest! {
    #[test]
    fn lower_and_upper_are_monotone(x in -9.0..9.0_f64, dx in 0.0..3.0_f64) {
        let c = cache(16);
        let y = x + dx;
        prop_assert!(c.lower(x).unwrap() <= c.lower(y).unwrap());
        prop_assert!(c.upper(x).unwrap() >= c.upper(y).unwrap());
    }

    #[test]
    fn lower_plus_upper_is_the_total(x in -8.0..8.0_f64) {
        let c = cache(16);
        let sum = c.lower(x).unwrap() + c.upper(x).unwrap();
        prop_assert!((sum - c.total()).abs() <= 1e-15, "{} vs {}", sum, c.total());
    }
}

// ─── Quantile inversion ───────────────────────────────────────────────────────

fn quantile(c: &CdfSegmentCache<f64, fn(f64) -> f64>, q: &QuantileBuilder<f64>, p: f64) -> f64 {
    newton_refine(|x| Ok(c.lower(x)? - p), pdf, q.estimate(p), 8).unwrap()
}

#[test]
fn quantiles_round_trip_through_the_cdf() {
    let c = cache(64);
    let q = QuantileBuilder::from_table(LEFT, RIGHT, c.lower_table().to_vec()).unwrap();
    for k in 1..=9 {
        let p = 0.1 * k as f64;
        let x = quantile(&c, &q, p);
        assert_abs_diff_eq!(c.lower(x).unwrap(), p, epsilon = 1e-15);
    }
    assert_abs_diff_eq!(quantile(&c, &q, 0.5), 0.0, epsilon = 1e-14);
}

#[test]
fn points_round_trip_through_the_quantile() {
    let c = cache(64);
    let q = QuantileBuilder::from_table(LEFT, RIGHT, c.lower_table().to_vec()).unwrap();
    for x in [-3.0, -1.25, -0.5, 0.75, 2.0] {
        let p = c.lower(x).unwrap();
        assert_abs_diff_eq!(quantile(&c, &q, p), x, epsilon = 1e-13);
    }
}

#[test]
fn deep_tail_quantiles_use_the_log_table() {
    let c = cache(64);
    let q = QuantileBuilder::from_table(LEFT, RIGHT, c.lower_table().to_vec()).unwrap();
    for x in [-7.3, -6.1, -4.4] {
        let p = c.lower(x).unwrap();
        let seed = q.estimate(p);
        assert!(seed.x0 <= x && x <= seed.x1, "{seed:?}");
        assert!((seed.x - x).abs() < 0.001, "{seed:?}");
        assert_abs_diff_eq!(quantile(&c, &q, p), x, epsilon = 1e-12);
    }
}

#[test]
fn out_of_range_targets_saturate() {
    let c = cache(8);
    let q = QuantileBuilder::from_table(LEFT, RIGHT, c.lower_table().to_vec()).unwrap();
    let below = q.estimate(-0.25);
    assert_eq!((below.x, below.x0, below.x1), (LEFT, f64::NEG_INFINITY, LEFT));
    let above = q.estimate(1.5);
    assert_eq!((above.x, above.x0, above.x1), (RIGHT, RIGHT, f64::INFINITY));
}
