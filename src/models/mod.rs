//! Built-in controller models.
//!
//! Each model is a [`ModelProfile`] plus a thin typed facade over
//! [`DeviceService`](crate::service::DeviceService) with a strum-iterable button enum.

pub mod extreme_3d_pro;
pub mod xbox360;

pub use extreme_3d_pro::{Extreme3dPro, Extreme3dProButton, Extreme3dProState};
pub use xbox360::{Xbox360, Xbox360Button, Xbox360State};

use crate::profile::ModelProfile;

pub fn builtin_profiles() -> Vec<ModelProfile> {
    vec![extreme_3d_pro::profile(), xbox360::profile()]
}
