//! Gauss–Kronrod rules computed in the precision of the scalar type.
//!
//! The abscissas and weights are not tabulated: they are generated by Newton
//! iteration on the Legendre polynomial (Gauss nodes) and on the Stieltjes
//! polynomial expressed in its Chebyshev expansion (Kronrod nodes), following
//! Piessens & Branders, *Math. Comp.* 28 (1974). A double-double scalar thus
//! gets nodes accurate to its own epsilon instead of `f64` copies.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use dd_core::{ensure, ensure_post, errors::Result, Scalar};

const MAX_NEWTON_ITERATIONS: usize = 50;

/// The pair of nested rules: `n`-point Gauss inside a `2n+1`-point Kronrod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GaussKronrodOrder {
    /// 7-point Gauss, 15-point Kronrod.
    G7K15,
    /// 15-point Gauss, 31-point Kronrod.
    G15K31,
    /// 31-point Gauss, 63-point Kronrod.
    #[default]
    G31K63,
}

impl GaussKronrodOrder {
    /// Number of Gauss points.
    pub fn gauss_points(self) -> usize {
        match self {
            Self::G7K15 => 7,
            Self::G15K31 => 15,
            Self::G31K63 => 31,
        }
    }

    /// Number of Kronrod points, i.e. integrand evaluations per application.
    pub fn kronrod_points(self) -> usize {
        2 * self.gauss_points() + 1
    }
}

/// One application of the rule on an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RuleEstimate<T> {
    /// Kronrod estimate of the integral.
    pub value: T,
    /// `|Kronrod - Gauss|`.
    pub error: T,
    /// Kronrod estimate of the integral of `|f|`.
    pub magnitude: T,
}

/// A Gauss–Kronrod rule on `[-1, 1]`.
///
/// Only the non-negative half of the symmetric node set is stored, in
/// decreasing order. Gauss weights are zero on the Kronrod-only nodes.
#[derive(Debug, Clone)]
pub struct GaussKronrodRule<T> {
    order: GaussKronrodOrder,
    nodes: Vec<T>,
    kronrod_weights: Vec<T>,
    gauss_weights: Vec<T>,
}

type RuleRegistry = Mutex<HashMap<(TypeId, GaussKronrodOrder), Arc<dyn Any + Send + Sync>>>;

static RULES: OnceLock<RuleRegistry> = OnceLock::new();

impl<T: Scalar> GaussKronrodRule<T> {
    /// Compute the nodes and weights of `order`.
    pub fn new(order: GaussKronrodOrder) -> Result<Self> {
        let (nodes, kronrod_weights, gauss_weights) = kronrod_nodes(order.gauss_points())?;
        Ok(Self {
            order,
            nodes,
            kronrod_weights,
            gauss_weights,
        })
    }

    /// Return the process-wide instance of `order` for this scalar type,
    /// computing it on first request.
    pub fn shared(order: GaussKronrodOrder) -> Result<Arc<Self>> {
        let registry = RULES.get_or_init(Default::default);
        let key = (TypeId::of::<T>(), order);
        let cached = registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        if let Some(rule) = cached.and_then(|r| r.downcast::<Self>().ok()) {
            return Ok(rule);
        }
        let rule = Arc::new(Self::new(order)?);
        let stored = registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert_with(|| rule.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        Ok(stored.downcast::<Self>().unwrap_or(rule))
    }

    /// The order of this rule.
    pub fn order(&self) -> GaussKronrodOrder {
        self.order
    }

    /// Number of integrand evaluations per application.
    pub fn points(&self) -> usize {
        self.order.kronrod_points()
    }

    /// Non-negative abscissas, decreasing.
    pub fn nodes(&self) -> &[T] {
        &self.nodes
    }

    /// Kronrod weights matching [`nodes`](Self::nodes).
    pub fn kronrod_weights(&self) -> &[T] {
        &self.kronrod_weights
    }

    /// Gauss weights matching [`nodes`](Self::nodes); zero on Kronrod-only
    /// nodes.
    pub fn gauss_weights(&self) -> &[T] {
        &self.gauss_weights
    }

    /// Apply the rule once on `[a, b]`, returning `(value, error)` with
    /// `error = |Kronrod - Gauss|`.
    ///
    /// Reversed bounds flip the sign of the value.
    ///
    /// # Errors
    /// Returns an error if `b - a` is not finite.
    pub fn integrate<F>(&self, f: F, a: T, b: T) -> Result<(T, T)>
    where
        F: Fn(T) -> T,
    {
        ensure!(
            (b - a).is_finite(),
            "Gauss-Kronrod rule needs a finite interval, got [{a}, {b}]"
        );
        if a == b {
            return Ok((T::zero(), T::zero()));
        }
        let estimate = self.evaluate(&f, a, b);
        Ok((estimate.value, estimate.error))
    }

    pub(crate) fn evaluate<F>(&self, f: &F, a: T, b: T) -> RuleEstimate<T>
    where
        F: Fn(T) -> T,
    {
        let half = T::real(0.5);
        let center = (a + b) * half;
        let radius = (b - a) * half;

        let mut kronrod = T::zero();
        let mut gauss = T::zero();
        let mut magnitude = T::zero();
        for ((&x, &wk), &wg) in self
            .nodes
            .iter()
            .zip(&self.kronrod_weights)
            .zip(&self.gauss_weights)
        {
            let (sum, abs_sum) = if x == T::zero() {
                let fc = f(center);
                (fc, fc.abs())
            } else {
                let dx = radius * x;
                let (f1, f2) = (f(center - dx), f(center + dx));
                (f1 + f2, f1.abs() + f2.abs())
            };
            kronrod = kronrod + wk * sum;
            gauss = gauss + wg * sum;
            magnitude = magnitude + wk * abs_sum;
        }

        RuleEstimate {
            value: kronrod * radius,
            error: ((kronrod - gauss) * radius).abs(),
            magnitude: magnitude * radius.abs(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Node generation
// ═══════════════════════════════════════════════════════════════════════════════

/// Chebyshev-expanded Stieltjes polynomial `E_{n+1}` and the constants used to
/// evaluate it and the Legendre polynomial `P_n`.
struct KronrodBasis<T> {
    n: usize,
    m: usize,
    even: bool,
    b: Vec<T>,
    weight_factor: T,
    tolerance: T,
}

impl<T: Scalar> KronrodBasis<T> {
    fn new(n: usize) -> Self {
        let m = (n + 1) / 2;
        let even = 2 * m == n;
        let (one, two, three) = (T::one(), T::real(2.0), T::real(3.0));
        let an = T::count(n);

        let mut b = vec![T::zero(); m + 1];
        let mut tau = vec![T::zero(); m];
        tau[0] = (an + two) / (an + an + three);
        b[m - 1] = tau[0] - one;
        let mut ak = an;
        for l in 1..m {
            ak = ak + two;
            tau[l] = ((ak - one) * ak - an * (an + one)) * (ak + two) * tau[l - 1]
                / (ak * ((ak + three) * (ak + two) - an * (an + one)));
            b[m - l - 1] = tau[l];
            for ll in 1..=l {
                b[m - l - 1] = b[m - l - 1] + tau[ll - 1] * b[m - l + ll - 1];
            }
        }
        b[m] = one;

        // 2^(2n+1) (n!)^2 / (2n+1)!
        let mut weight_factor = two / T::count(2 * n + 1);
        for i in 1..=n {
            weight_factor = weight_factor * T::real(4.0) * T::count(i) / T::count(n + i);
        }

        Self {
            n,
            m,
            even,
            b,
            weight_factor,
            tolerance: T::epsilon().sqrt(),
        }
    }

    /// `(P_n(x), P_n'(x), P_{n-1}(x))` by the three-term recurrence.
    fn legendre(&self, x: T) -> (T, T, T) {
        let (mut p0, mut p1) = (T::one(), x);
        let (mut pd0, mut pd1) = (T::zero(), T::one());
        for k in 1..self.n {
            let (kk, k1) = (T::count(k), T::count(k + 1));
            let c = T::count(2 * k + 1);
            let p2 = (c * x * p1 - kk * p0) / k1;
            let pd2 = (c * (p1 + x * pd1) - kk * pd0) / k1;
            p0 = p1;
            p1 = p2;
            pd0 = pd1;
            pd1 = pd2;
        }
        (p1, pd1, p0)
    }

    /// Stieltjes polynomial and its derivative (up to a common factor).
    fn stieltjes(&self, x: T) -> (T, T) {
        let m = self.m;
        let yy = T::real(4.0) * x * x - T::real(2.0);
        let (mut b0, mut b1, mut b2) = (T::zero(), T::zero(), self.b[m]);
        let mut d1 = T::zero();
        let (mut ai, mut d2, step) = if self.even {
            let ai = T::count(2 * m + 1);
            (ai, ai * self.b[m], T::real(2.0))
        } else {
            (T::count(m + 1), T::zero(), T::one())
        };

        for k in 1..=m {
            ai = ai - step;
            let i = m - k;
            b0 = b1;
            b1 = b2;
            let d0 = d1;
            d1 = d2;
            b2 = yy * b1 - b0 + self.b[i];
            let j = if self.even { i } else { i + 1 };
            d2 = yy * d1 - d0 + ai * self.b[j];
        }

        if self.even {
            (x * (b2 - b1), d2 + d1)
        } else {
            (T::real(0.5) * (b2 - b0), T::real(4.0) * x * d2)
        }
    }

    /// Chebyshev sum of the Stieltjes expansion, last three partial values.
    fn chebyshev_tail(&self, x: T) -> (T, T, T) {
        let yy = T::real(4.0) * x * x - T::real(2.0);
        let (mut p0, mut p1, mut p2) = (T::zero(), T::zero(), self.b[self.m]);
        for i in (0..self.m).rev() {
            p0 = p1;
            p1 = p2;
            p2 = yy * p1 - p0 + self.b[i];
        }
        (p0, p1, p2)
    }

    /// Newton iteration; one extra step is taken after the step size drops
    /// below tolerance.
    fn newton<F>(&self, mut x: T, value_and_slope: F) -> Result<T>
    where
        F: Fn(T) -> (T, T),
    {
        let mut polish = x == T::zero();
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (f, fd) = value_and_slope(x);
            let delta = f / fd;
            x = x - delta;
            if polish {
                return Ok(x);
            }
            if delta.abs() <= self.tolerance {
                polish = true;
            }
        }
        ensure_post!(
            polish,
            "Kronrod node iteration for n = {} did not converge near {x}",
            self.n
        );
        Ok(x)
    }

    /// A Kronrod-only abscissa and its weight.
    fn kronrod_abscissa(&self, guess: T) -> Result<(T, T)> {
        let x = self.newton(guess, |x| self.stieltjes(x))?;
        let (_, slope) = self.stieltjes(x);
        let (pn, _, _) = self.legendre(x);
        Ok((x, self.weight_factor / (slope * pn)))
    }

    /// A Gauss abscissa with its Kronrod and Gauss weights.
    fn gauss_abscissa(&self, guess: T) -> Result<(T, T, T)> {
        let x = self.newton(guess, |x| {
            let (p, pd, _) = self.legendre(x);
            (p, pd)
        })?;
        let (_, pd, pm) = self.legendre(x);
        let gauss_weight = T::real(2.0) / (T::count(self.n) * pd * pm);
        let (p0, p1, p2) = self.chebyshev_tail(x);
        let kronrod_weight = if self.even {
            gauss_weight + self.weight_factor / (pd * x * (p2 - p1))
        } else {
            gauss_weight + T::real(2.0) * self.weight_factor / (pd * (p2 - p0))
        };
        Ok((x, kronrod_weight, gauss_weight))
    }
}

/// Non-negative nodes (decreasing), Kronrod weights and Gauss weights of the
/// `(2n+1)`-point Kronrod extension of the `n`-point Gauss–Legendre rule.
fn kronrod_nodes<T: Scalar>(n: usize) -> Result<(Vec<T>, Vec<T>, Vec<T>)> {
    ensure!(n >= 2, "Gauss-Kronrod rule needs at least 2 Gauss points, got {n}");
    let basis = KronrodBasis::<T>::new(n);
    let one = T::one();
    let an = T::count(n);

    // Initial guesses walk down cos((k - 1/2) π / (2n + 1)).
    let mut bb = (T::FRAC_PI_2() / (an + an + one)).sin();
    let mut x1 = (one - bb * bb).sqrt();
    let s = T::real(2.0) * bb * x1;
    let c = (one - s * s).sqrt();
    let coef = one - (one - one / an) / (T::real(8.0) * an * an);
    let rotate = |x1: &mut T, bb: &mut T| {
        let y = *x1;
        *x1 = y * c - *bb * s;
        *bb = y * s + *bb * c;
    };

    let mut nodes = vec![T::zero(); n + 1];
    let mut kronrod_weights = vec![T::zero(); n + 1];
    let mut gauss_weights = vec![T::zero(); n + 1];

    let mut guess = coef * x1;
    let mut k = 0;
    while k < n {
        let (x, w) = basis.kronrod_abscissa(guess)?;
        nodes[k] = x;
        kronrod_weights[k] = w;
        rotate(&mut x1, &mut bb);

        guess = if k + 1 == n { T::zero() } else { coef * x1 };
        let (x, wk, wg) = basis.gauss_abscissa(guess)?;
        nodes[k + 1] = x;
        kronrod_weights[k + 1] = wk;
        gauss_weights[k + 1] = wg;
        rotate(&mut x1, &mut bb);

        guess = coef * x1;
        k += 2;
    }
    if basis.even {
        let (x, w) = basis.kronrod_abscissa(T::zero())?;
        nodes[n] = x;
        kronrod_weights[n] = w;
    }

    // Both rules must integrate a constant exactly; absorb the rounding left
    // by the Newton iterations.
    for weights in [&mut kronrod_weights, &mut gauss_weights] {
        let total = weights
            .iter()
            .zip(&nodes)
            .fold(T::zero(), |acc, (&w, &x)| if x == T::zero() { acc + w } else { acc + w + w });
        let scale = T::real(2.0) / total;
        for w in weights.iter_mut() {
            *w = *w * scale;
        }
    }

    Ok((nodes, kronrod_weights, gauss_weights))
}
