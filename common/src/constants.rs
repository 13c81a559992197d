/// Number of components in a 3-axis sensor sample.
pub const N_XYZ_COORDINATES: usize = 3;

/// Standard gravity [m/s^2].
pub const STANDARD_GRAVITY: f32 = 9.806_65;
