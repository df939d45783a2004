//! Angle helpers shared by training, voting and refinement.

/// Number of orientation buckets in a direction index.
pub(crate) const DIRECTION_BINS: usize = 36;

/// Width of one orientation bucket in degrees.
pub(crate) const BIN_WIDTH_DEG: f32 = 360.0 / DIRECTION_BINS as f32;

/// Wraps an angle in degrees to the range [-180, 180).
pub(crate) fn wrap_deg(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped < -180.0 {
        wrapped += 360.0;
    }
    if wrapped >= 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}

/// Returns the direction of `(dx, dy)` in degrees within [0, 360).
pub(crate) fn direction_deg(dx: f32, dy: f32) -> f32 {
    let deg = dy.atan2(dx).to_degrees();
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Maps a direction in degrees (any range) to its 10-degree bucket.
pub(crate) fn direction_bin(angle_deg: f32) -> usize {
    let wrapped = angle_deg.rem_euclid(360.0);
    let bin = (wrapped / BIN_WIDTH_DEG) as usize;
    bin.min(DIRECTION_BINS - 1)
}

/// Offsets a bucket index circularly.
pub(crate) fn bin_offset(bin: usize, delta: isize) -> usize {
    let n = DIRECTION_BINS as isize;
    (bin as isize + delta).rem_euclid(n) as usize
}
