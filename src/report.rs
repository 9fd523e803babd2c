//! Data-driven decoding of fixed-format HID input reports.
//!
//! Backends that only see raw report bytes (hidapi) describe each model's report as a
//! [`ReportLayout`]: a list of bit fields and the input code each one feeds. Decoding a
//! report yields one [`RawEvent`] per field, so the cached state always holds the latest
//! full report.
//!
//! Bit offsets count from the least significant bit of the first payload byte; multi-bit
//! fields are little-endian, matching HID report descriptors.

use serde::{Deserialize, Serialize};

use crate::decode::ANGLE_STEP;
use crate::error::BackendError;
use crate::event::{HatInput, RawEvent};

/// A run of `width` bits starting at bit `offset` of the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    pub offset: u32,
    pub width: u8,
}

impl BitField {
    pub const fn new(offset: u32, width: u8) -> Self {
        Self { offset, width }
    }

    /// Whole byte `index`.
    pub const fn byte(index: u32) -> Self {
        Self::new(index * 8, 8)
    }

    /// One past the last payload byte this field touches.
    pub fn end_byte(&self) -> usize {
        (self.offset as usize + self.width as usize).div_ceil(8)
    }

    /// Read the field as an unsigned value. `None` if the payload is too short.
    pub fn extract(&self, payload: &[u8]) -> Option<u32> {
        if self.width == 0 || self.width > 32 || payload.len() < self.end_byte() {
            return None;
        }
        let mut value = 0u32;
        for i in 0..u32::from(self.width) {
            let bit = self.offset + i;
            let byte = payload[(bit / 8) as usize];
            if (byte >> (bit % 8)) & 1 == 1 {
                value |= 1 << i;
            }
        }
        Some(value)
    }

    /// Read the field as a two's-complement signed value.
    pub fn extract_signed(&self, payload: &[u8]) -> Option<i32> {
        let raw = self.extract(payload)?;
        let shift = 32 - u32::from(self.width);
        Some(((raw << shift) as i32) >> shift)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisField {
    pub code: u16,
    pub field: BitField,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonField {
    pub code: u16,
    /// Bit offset of the button in the payload.
    pub bit: u32,
}

fn default_positions() -> u32 {
    8
}

fn default_step() -> u32 {
    ANGLE_STEP
}

/// A hat reported as a position index; indices past `positions` mean centered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatField {
    pub field: BitField,
    #[serde(default = "default_positions")]
    pub positions: u32,
    /// Hundredths of a degree per index step.
    #[serde(default = "default_step")]
    pub step: u32,
}

/// How to turn one input report into [`RawEvent`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    /// If set, reports start with this id byte, which is checked and stripped.
    pub report_id: Option<u8>,
    pub axes: Vec<AxisField>,
    pub buttons: Vec<ButtonField>,
    pub hat: Option<HatField>,
}

impl ReportLayout {
    /// Payload bytes needed to decode every field.
    pub fn payload_len(&self) -> usize {
        let axes = self.axes.iter().map(|a| a.field.end_byte());
        let buttons = self
            .buttons
            .iter()
            .map(|b| BitField::new(b.bit, 1).end_byte());
        let hat = self.hat.iter().map(|h| h.field.end_byte());
        axes.chain(buttons).chain(hat).max().unwrap_or(0)
    }

    /// Buffer size to read into, including the id byte.
    pub fn report_len(&self) -> usize {
        self.payload_len() + usize::from(self.report_id.is_some())
    }

    /// Decode `report` and append one event per field to `out`.
    ///
    /// Reports with a foreign id are skipped without error. Short reports are rejected
    /// before anything is pushed.
    pub fn decode(&self, report: &[u8], out: &mut Vec<RawEvent>) -> Result<(), BackendError> {
        let payload = match self.report_id {
            Some(id) => match report.split_first() {
                Some((&first, rest)) if first == id => rest,
                Some(_) => return Ok(()),
                None => return Err(BackendError::Malformed("empty report".into())),
            },
            None => report,
        };
        if payload.len() < self.payload_len() {
            return Err(BackendError::Malformed(format!(
                "report payload is {} bytes, layout needs {}",
                payload.len(),
                self.payload_len()
            )));
        }

        for axis in &self.axes {
            let value = if axis.signed {
                axis.field.extract_signed(payload)
            } else {
                axis.field.extract(payload).map(|v| v as i32)
            };
            if let Some(value) = value {
                out.push(RawEvent::Axis {
                    code: axis.code,
                    value,
                });
            }
        }
        for button in &self.buttons {
            if let Some(bit) = BitField::new(button.bit, 1).extract(payload) {
                out.push(RawEvent::Button {
                    code: button.code,
                    pressed: bit == 1,
                });
            }
        }
        if let Some(hat) = &self.hat {
            if let Some(index) = hat.field.extract(payload) {
                // An angle that does not fit reads as centered.
                let angle = (index < hat.positions)
                    .then(|| index.checked_mul(hat.step))
                    .flatten();
                out.push(RawEvent::Hat(HatInput::Angle(angle)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fields_across_byte_boundaries() {
        // x = 0x3FF (10 bits), y = 0x155 (10 bits) packed from bit 0.
        let x: u32 = 0x3FF;
        let y: u32 = 0x155;
        let packed = x | (y << 10);
        let bytes = packed.to_le_bytes();

        assert_eq!(BitField::new(0, 10).extract(&bytes), Some(0x3FF));
        assert_eq!(BitField::new(10, 10).extract(&bytes), Some(0x155));
        assert_eq!(BitField::new(20, 12).extract(&bytes[..2]), None);
    }

    #[test]
    fn signed_fields_sign_extend() {
        assert_eq!(BitField::byte(0).extract_signed(&[0xFF]), Some(-1));
        assert_eq!(BitField::byte(0).extract_signed(&[0x7F]), Some(127));
        assert_eq!(BitField::new(0, 16).extract_signed(&[0x00, 0x80]), Some(-32768));
    }

    fn layout() -> ReportLayout {
        ReportLayout {
            report_id: Some(1),
            axes: vec![AxisField {
                code: 0,
                field: BitField::byte(0),
                signed: false,
            }],
            buttons: vec![
                ButtonField {
                    code: 0x120,
                    bit: 8,
                },
                ButtonField {
                    code: 0x121,
                    bit: 9,
                },
            ],
            hat: Some(HatField {
                field: BitField::new(12, 4),
                positions: 8,
                step: ANGLE_STEP,
            }),
        }
    }

    #[test]
    fn decodes_one_event_per_field() {
        let layout = layout();
        assert_eq!(layout.payload_len(), 2);
        assert_eq!(layout.report_len(), 3);

        let mut out = Vec::new();
        layout.decode(&[1, 200, 0b0010_0001], &mut out).unwrap();
        assert_eq!(
            out,
            [
                RawEvent::Axis {
                    code: 0,
                    value: 200
                },
                RawEvent::Button {
                    code: 0x120,
                    pressed: true
                },
                RawEvent::Button {
                    code: 0x121,
                    pressed: false
                },
                RawEvent::Hat(HatInput::Angle(Some(2 * ANGLE_STEP))),
            ]
        );

        out.clear();
        layout.decode(&[1, 0, 0xF0], &mut out).unwrap();
        assert_eq!(out.last(), Some(&RawEvent::Hat(HatInput::Angle(None))));
    }

    #[test]
    fn oversized_hat_step_reads_centered() {
        let mut layout = layout();
        layout.hat = Some(HatField {
            field: BitField::new(12, 4),
            positions: 16,
            step: u32::MAX / 2,
        });
        let mut out = Vec::new();
        layout.decode(&[1, 0, 0x30], &mut out).unwrap();
        assert_eq!(out.last(), Some(&RawEvent::Hat(HatInput::Angle(None))));

        out.clear();
        layout.decode(&[1, 0, 0x10], &mut out).unwrap();
        assert_eq!(
            out.last(),
            Some(&RawEvent::Hat(HatInput::Angle(Some(u32::MAX / 2))))
        );
    }

    #[test]
    fn foreign_and_short_reports() {
        let layout = layout();
        let mut out = Vec::new();
        layout.decode(&[2, 1, 2], &mut out).unwrap();
        assert!(out.is_empty());
        assert!(layout.decode(&[1, 5], &mut out).is_err());
        assert!(out.is_empty());
    }
}
