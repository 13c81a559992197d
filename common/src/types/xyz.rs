use nalgebra::Vector3;

use crate::constants::N_XYZ_COORDINATES;

/// 3-axis sensor measurement, stored with the single precision delivered by
/// phone motion sensors.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct XYZ(Vector3<f32>);

impl XYZ {
    pub fn new(data: [f32; N_XYZ_COORDINATES]) -> Self {
        Self(Vector3::from(data))
    }

    pub fn inner(&self) -> [f32; N_XYZ_COORDINATES] {
        [self.0.x, self.0.y, self.0.z]
    }

    /// Returns true if no component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl TryFrom<&[f32]> for XYZ {
    type Error = &'static str;

    fn try_from(value: &[f32]) -> Result<Self, Self::Error> {
        if value.len() != N_XYZ_COORDINATES {
            return Err("Can't convert to XYZ");
        }
        Ok(Self::new([value[0], value[1], value[2]]))
    }
}
