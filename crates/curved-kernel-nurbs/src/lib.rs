#![warn(missing_docs)]

//! Rational B-spline curves and surfaces for the curved-shapes kernel.
//!
//! Knot vectors are stored the way CAD kernels exchange them: distinct knot
//! values plus a multiplicity per value, with an explicit periodic flag.
//! Evaluation expands them to a flat knot vector (unrolled for periodic
//! splines) and runs De Boor's basis recurrence in homogeneous coordinates.
//!
//! # Key types
//!
//! - [`BSplineCurve`]: (rational) B-spline curve in 3D
//! - [`BSplineSurface`]: (rational) tensor-product B-spline surface
//!
//! Construction is validated up front and returns [`NurbsError`] on
//! inconsistent input, so callers can choose a fallback instead of panicking.

mod curve;
mod fit;
mod surface;

pub use curve::BSplineCurve;
pub use fit::interpolate_points;
pub use surface::{BSplineSurface, SurfaceSpec};

use thiserror::Error;

/// Highest polynomial degree accepted by the constructors.
pub const MAX_DEGREE: usize = 25;

/// Two knot values closer than this are treated as the same knot.
const KNOT_RESOLUTION: f64 = 1e-12;

/// Errors from B-spline construction and fitting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NurbsError {
    /// Degree is zero or above [`MAX_DEGREE`].
    #[error("invalid degree {0}")]
    InvalidDegree(usize),

    /// Knot and multiplicity arrays differ in length.
    #[error("{knots} knots but {mults} multiplicities")]
    KnotMultiplicityMismatch {
        /// Number of distinct knots.
        knots: usize,
        /// Number of multiplicities.
        mults: usize,
    },

    /// Fewer than two distinct knots.
    #[error("at least 2 knots required, got {0}")]
    TooFewKnots(usize),

    /// Knot values are not strictly increasing at the given index.
    #[error("knots not strictly increasing at index {0}")]
    KnotsNotIncreasing(usize),

    /// A multiplicity is zero or exceeds what the degree allows.
    #[error("multiplicity {mult} at knot {index} exceeds limit {max}")]
    InvalidMultiplicity {
        /// Knot index.
        index: usize,
        /// Offending multiplicity.
        mult: usize,
        /// Largest multiplicity allowed there.
        max: usize,
    },

    /// Periodic knot vectors need equal end multiplicities.
    #[error("periodic end multiplicities differ: {first} vs {last}")]
    PeriodicEndMultiplicities {
        /// First multiplicity.
        first: usize,
        /// Last multiplicity.
        last: usize,
    },

    /// The pole count does not match the knot structure.
    #[error("knot structure requires {expected} poles, got {found}")]
    PoleCountMismatch {
        /// Pole count implied by the knots and degree.
        expected: usize,
        /// Pole count supplied.
        found: usize,
    },

    /// A pole row has a different length than the first row.
    #[error("pole row {row} has {found} poles, expected {expected}")]
    RaggedPoles {
        /// Row index.
        row: usize,
        /// Expected row length.
        expected: usize,
        /// Actual row length.
        found: usize,
    },

    /// Weight count does not match pole count.
    #[error("{found} weights for {expected} poles")]
    WeightCountMismatch {
        /// Number of poles.
        expected: usize,
        /// Number of weights.
        found: usize,
    },

    /// A weight is zero, negative or not finite.
    #[error("non-positive weight at index {0}")]
    NonPositiveWeight(usize),

    /// Not enough points for the requested operation.
    #[error("at least {required} points required, got {found}")]
    TooFewPoints {
        /// Minimum count.
        required: usize,
        /// Supplied count.
        found: usize,
    },

    /// The interpolation system could not be solved.
    #[error("interpolation system is singular")]
    SingularSystem,
}

/// Result type for B-spline operations.
pub type Result<T> = std::result::Result<T, NurbsError>;

// =============================================================================
// Knot vector utilities
// =============================================================================

/// Expand distinct knots and multiplicities into a flat knot vector.
pub fn expand_knots(knots: &[f64], mults: &[usize]) -> Vec<f64> {
    knots
        .iter()
        .zip(mults)
        .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
        .collect()
}

/// Group a flat knot vector into distinct knots and multiplicities.
pub fn group_knots(flat: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut knots: Vec<f64> = Vec::new();
    let mut mults: Vec<usize> = Vec::new();
    for &k in flat {
        match knots.last() {
            Some(&last) if (k - last).abs() <= KNOT_RESOLUTION => {
                if let Some(m) = mults.last_mut() {
                    *m += 1;
                }
            }
            _ => {
                knots.push(k);
                mults.push(1);
            }
        }
    }
    (knots, mults)
}

/// Check that `knots`/`mults` describe a valid B-spline with `n_poles` poles.
pub fn validate_knots(
    knots: &[f64],
    mults: &[usize],
    degree: usize,
    periodic: bool,
    n_poles: usize,
) -> Result<()> {
    if degree == 0 || degree > MAX_DEGREE {
        return Err(NurbsError::InvalidDegree(degree));
    }
    if knots.len() != mults.len() {
        return Err(NurbsError::KnotMultiplicityMismatch {
            knots: knots.len(),
            mults: mults.len(),
        });
    }
    if knots.len() < 2 {
        return Err(NurbsError::TooFewKnots(knots.len()));
    }
    for i in 1..knots.len() {
        if knots[i] - knots[i - 1] <= KNOT_RESOLUTION {
            return Err(NurbsError::KnotsNotIncreasing(i));
        }
    }

    let last = mults.len() - 1;
    for (index, &mult) in mults.iter().enumerate() {
        let is_end = index == 0 || index == last;
        let max = if is_end && !periodic { degree + 1 } else { degree };
        if mult == 0 || mult > max {
            return Err(NurbsError::InvalidMultiplicity { index, mult, max });
        }
    }

    let sum: usize = mults.iter().sum();
    let expected = if periodic {
        if mults[0] != mults[last] {
            return Err(NurbsError::PeriodicEndMultiplicities {
                first: mults[0],
                last: mults[last],
            });
        }
        sum - mults[last]
    } else {
        // sum = n + p + 1
        sum.checked_sub(degree + 1).unwrap_or(0)
    };
    if expected != n_poles || n_poles < 2 {
        return Err(NurbsError::PoleCountMismatch {
            expected,
            found: n_poles,
        });
    }
    Ok(())
}

/// Check pole weights: one per pole, all strictly positive.
pub(crate) fn validate_weights(weights: &[f64], n_poles: usize) -> Result<()> {
    if weights.len() != n_poles {
        return Err(NurbsError::WeightCountMismatch {
            expected: n_poles,
            found: weights.len(),
        });
    }
    match weights.iter().position(|w| !(w.is_finite() && *w > 0.0)) {
        Some(i) => Err(NurbsError::NonPositiveWeight(i)),
        None => Ok(()),
    }
}

/// Find the knot span index for parameter `t`.
///
/// Returns the largest `i` in `[degree, n]` with `knots[i] <= t < knots[i+1]`.
/// For `t` at the end of the domain, returns the last non-empty span.
fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n = number of control points - 1 (last index)
    if t >= knots[n + 1] {
        let mut i = n;
        while i > degree && knots[i] >= knots[n + 1] {
            i -= 1;
        }
        return i;
    }
    let mut low = degree;
    let mut high = n + 1;
    while high - low > 1 {
        let mid = (low + high) / 2;
        if knots[mid] <= t {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Compute non-zero basis function values at parameter `t`.
///
/// Returns a vector of `degree + 1` values `N[span-degree..=span]` at `t`.
fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            if denom.abs() < 1e-30 {
                // Zero-length knot interval: avoid division by zero
                n[j] = saved;
                continue;
            }
            let temp = n[r] / denom;
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

/// Flat evaluation data for one parametric direction.
///
/// Periodic knot vectors are unrolled by `degree` knots on each side so the
/// ordinary clamped-style evaluation applies; pole indices wrap around.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KnotAxis {
    flat: Vec<f64>,
    degree: usize,
    n_poles: usize,
    periodic: bool,
}

impl KnotAxis {
    /// Build from validated knots. Call [`validate_knots`] first.
    pub(crate) fn new(
        knots: &[f64],
        mults: &[usize],
        degree: usize,
        periodic: bool,
        n_poles: usize,
    ) -> Self {
        let flat = if periodic {
            unroll_periodic(knots, mults, degree)
        } else {
            expand_knots(knots, mults)
        };
        Self {
            flat,
            degree,
            n_poles,
            periodic,
        }
    }

    fn n_ext(&self) -> usize {
        if self.periodic {
            self.n_poles + self.degree
        } else {
            self.n_poles
        }
    }

    /// Parameter domain.
    pub(crate) fn domain(&self) -> (f64, f64) {
        (self.flat[self.degree], self.flat[self.n_ext()])
    }

    /// Non-zero basis values at `t`, paired with the pole index each weights.
    pub(crate) fn basis(&self, t: f64) -> Vec<(usize, f64)> {
        let n = self.n_ext() - 1;
        let (lo, hi) = self.domain();
        let t = t.clamp(lo, hi);
        let span = find_span(&self.flat, n, self.degree, t);
        basis_functions(&self.flat, span, self.degree, t)
            .into_iter()
            .enumerate()
            .map(|(i, b)| (self.pole_index(span - self.degree + i), b))
            .collect()
    }

    fn pole_index(&self, ext: usize) -> usize {
        if self.periodic {
            ext % self.n_poles
        } else {
            ext
        }
    }
}

/// Flat knots of a periodic spline extended by `degree` knots on both ends.
///
/// Knot `j` (for any integer `j`) is `one[j mod n] + period * floor(j / n)`,
/// where `one` holds the flat knots of a single period.
fn unroll_periodic(knots: &[f64], mults: &[usize], degree: usize) -> Vec<f64> {
    let last = knots.len() - 1;
    let period = knots[last] - knots[0];
    let one = expand_knots(&knots[..last], &mults[..last]);
    let n = one.len() as isize;
    let p = degree as isize;
    (-p..=n + p)
        .map(|j| one[j.rem_euclid(n) as usize] + period * j.div_euclid(n) as f64)
        .collect()
}
