use std::fmt;

use serde::Serialize;

use super::ValidationError;

/// Label color, persisted as RRGGBBAA hex (the store default is 'FFFFFFFF').
/// Parsing also accepts RRGGBB with alpha defaulting to FF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl LabelColor {
    pub const WHITE: LabelColor = LabelColor {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
        a: 0xFF,
    };

    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidColor(value.to_string());
        let digits = value.trim().trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte_at = |idx: usize| u8::from_str_radix(&digits[idx..idx + 2], 16);
        let r = byte_at(0).map_err(|_| invalid())?;
        let g = byte_at(2).map_err(|_| invalid())?;
        let b = byte_at(4).map_err(|_| invalid())?;
        let a = if digits.len() == 8 {
            byte_at(6).map_err(|_| invalid())?
        } else {
            0xFF
        };
        Ok(LabelColor { r, g, b, a })
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
