//! Numeric helpers shared by tree construction and scoring.

use rand::Rng;

/// Euler–Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Draw `k` rows uniformly at random, independently, with replacement.
///
/// `k` may exceed `rows.len()`. Returns an empty sample when `rows` is empty.
pub fn sample<'a>(rows: &[&'a [f64]], k: usize, rng: &mut impl Rng) -> Vec<&'a [f64]> {
    if rows.is_empty() {
        return Vec::new();
    }
    (0..k).map(|_| rows[rng.gen_range(0..rows.len())]).collect()
}

/// Return the values of feature `index` across all rows.
#[must_use]
pub fn column(rows: &[&[f64]], index: usize) -> Vec<f64> {
    rows.iter().map(|row| row[index]).collect()
}

/// Return `(min, max)` of `values` in a single pass, or `None` when empty.
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let (&first, rest) = values.split_first()?;
    Some(
        rest.iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Sample quantile of `values` at `q`.
///
/// Sorts a copy and interpolates linearly between the two closest ranks
/// (position `q * (n - 1)`). `q` is clamped to `[0, 1]`. Returns `None` when
/// `values` is empty.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Expected path length c(n) of an unsuccessful search in a binary search
/// tree built from `n` points.
///
/// Normalizes raw isolation depths: `c(n) = 2·(ln(n−1) + γ) − 2·(n−1)/n`,
/// with `c(0) = c(1) = 0` and `c(2) = 1`.
#[must_use]
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
