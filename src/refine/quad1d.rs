//! Parabolic peak fit through three equally spaced samples.

/// Largest offset reported by [`quad_peak_offset_1d`], in sample steps.
pub(crate) const MAX_OFFSET: f32 = 0.5;

/// Estimates the peak offset of a parabola through samples at `-1, 0, +1`.
///
/// Returns a value in `[-0.5, 0.5]`. A non-concave or flat triple, or any
/// non-finite sample, yields 0 so the center sample is kept.
pub(crate) fn quad_peak_offset_1d(fm: f32, f0: f32, fp: f32) -> f32 {
    if !fm.is_finite() || !f0.is_finite() || !fp.is_finite() {
        return 0.0;
    }
    let denom = fm - 2.0 * f0 + fp;
    if denom > -1e-6 {
        return 0.0;
    }
    let dx = 0.5 * (fm - fp) / denom;
    if dx.is_finite() {
        dx.clamp(-MAX_OFFSET, MAX_OFFSET)
    } else {
        0.0
    }
}
