//! Data-driven controller model descriptions.
//!
//! A [`ModelProfile`] says which vendor/product pairs belong to a model and how its raw
//! input codes read as named axes and buttons. One generic
//! [`DeviceService`](crate::service::DeviceService) does the filtering and decoding for any
//! profile, so adding a model is a matter of describing it, in code or in TOML:
//!
//! ```toml
//! name = "Example Pedals"
//! descriptors = [{ vendor_id = 0x06a3, product_id = 0x0763 }]
//!
//! [[axes]]
//! name = "rudder"
//! code = 5
//! min = 0
//! max = 1023
//!
//! [[axes]]
//! name = "left_brake"
//! code = 0
//! min = 0
//! max = 1023
//! kind = "unipolar"
//! ```
//!
//! Codes live in the Linux input-event code space (`ABS_*` for axes, `BTN_*` for buttons).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decode::{normalize_axis, normalize_unipolar};
use crate::device::DeviceDescriptor;
use crate::error::ConfigError;
use crate::report::ReportLayout;

/// How an axis's calibrated range maps to the logical range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    /// Sticks and twist: `[-100, 100]`.
    #[default]
    Bipolar,
    /// Sliders and triggers: `[0, 100]`.
    Unipolar,
}

/// A named axis and its calibration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub name: String,
    pub code: u16,
    pub min: i32,
    pub max: i32,
    #[serde(default)]
    pub kind: AxisKind,
    /// Flip the logical direction (e.g. so that pushing a stick up reads positive).
    #[serde(default)]
    pub invert: bool,
}

impl AxisSpec {
    pub fn new(name: &str, code: u16, min: i32, max: i32) -> Self {
        Self {
            name: name.into(),
            code,
            min,
            max,
            kind: AxisKind::Bipolar,
            invert: false,
        }
    }

    pub fn unipolar(mut self) -> Self {
        self.kind = AxisKind::Unipolar;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Raw register value to logical value.
    pub fn normalize(&self, raw: i32) -> i32 {
        match (self.kind, self.invert) {
            (AxisKind::Bipolar, false) => normalize_axis(raw, self.min, self.max),
            (AxisKind::Bipolar, true) => -normalize_axis(raw, self.min, self.max),
            (AxisKind::Unipolar, false) => normalize_unipolar(raw, self.min, self.max),
            (AxisKind::Unipolar, true) => 100 - normalize_unipolar(raw, self.min, self.max),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub name: String,
    pub code: u16,
}

impl ButtonSpec {
    pub fn new(name: &str, code: u16) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Everything needed to recognize and decode one controller model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelProfile {
    pub name: String,
    pub descriptors: Vec<DeviceDescriptor>,
    pub axes: Vec<AxisSpec>,
    pub buttons: Vec<ButtonSpec>,
    /// The model has a hat / d-pad.
    pub hat: bool,
    /// Raw report layout for backends that decode HID reports themselves.
    pub hid_report: Option<ReportLayout>,
}

impl ModelProfile {
    pub fn recognizes(&self, descriptor: &DeviceDescriptor) -> bool {
        self.descriptors.contains(descriptor)
    }

    pub fn axis(&self, name: &str) -> Option<&AxisSpec> {
        self.axes.iter().find(|a| a.name == name)
    }

    pub fn button(&self, name: &str) -> Option<&ButtonSpec> {
        self.buttons.iter().find(|b| b.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("profile without a name".into()));
        }
        if self.descriptors.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "profile {:?} recognizes no descriptors",
                self.name
            )));
        }
        for axis in &self.axes {
            if axis.max <= axis.min {
                return Err(ConfigError::Invalid(format!(
                    "axis {:?} of {:?} has an empty range {}..{}",
                    axis.name, self.name, axis.min, axis.max
                )));
            }
        }
        let mut names: Vec<&str> = self
            .axes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.buttons.iter().map(|b| b.name.as_str()))
            .collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid(format!(
                "{:?} is defined twice in {:?}",
                pair[0], self.name
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let profile: ModelProfile = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEDALS: &str = r#"
        name = "Example Pedals"
        descriptors = [{ vendor_id = 0x06a3, product_id = 0x0763 }]

        [[axes]]
        name = "rudder"
        code = 5
        min = 0
        max = 1023

        [[axes]]
        name = "left_brake"
        code = 0
        min = 0
        max = 1023
        kind = "unipolar"
        invert = true
    "#;

    #[test]
    fn parses_toml_profile() {
        let profile = ModelProfile::from_toml_str(PEDALS).unwrap();
        assert!(profile.recognizes(&DeviceDescriptor::new(0x06a3, 0x0763)));
        assert!(!profile.recognizes(&DeviceDescriptor::new(0x06a3, 0x0764)));
        assert!(!profile.hat);

        let brake = profile.axis("left_brake").unwrap();
        assert_eq!(brake.kind, AxisKind::Unipolar);
        assert_eq!(brake.normalize(0), 100);
        assert_eq!(brake.normalize(1023), 0);
        assert_eq!(profile.axis("rudder").unwrap().normalize(1023), 100);
    }

    #[test]
    fn inverted_bipolar_axis() {
        let y = AxisSpec::new("y", 1, 0, 1023).inverted();
        assert_eq!(y.normalize(0), 100);
        assert_eq!(y.normalize(1023), -100);
    }

    #[test]
    fn rejects_bad_profiles() {
        let empty_range = PEDALS.replace("max = 1023\n        kind", "max = 0\n        kind");
        assert!(matches!(
            ModelProfile::from_toml_str(&empty_range),
            Err(ConfigError::Invalid(_))
        ));

        let duplicate = PEDALS.replace("left_brake", "rudder");
        assert!(matches!(
            ModelProfile::from_toml_str(&duplicate),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            ModelProfile::from_toml_str("name = \"x\"\nhat = \"yes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
