//! Sub-sample peak interpolation.

pub(crate) mod quad1d;
