//! Deterministic float ordering.
//!
//! Nearest-hit searches and sorted outputs must not depend on how NaN or
//! signed zero happen to compare, so every float comparison that picks a
//! winner goes through [`stable_total_cmp_f64`].

use core::cmp::Ordering;

/// Canonicalizes `-0.0` to `0.0` and every NaN payload to one NaN.
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Total ordering over canonicalized floats.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}
