use serde::Serialize;

use super::ValidationError;

/// Label typography style flags. Stored in the database as a single integer
/// in 0..=3 (bit 0 = bold, bit 1 = italic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle {
        bold: false,
        italic: false,
    };

    pub fn from_bits(bits: i64) -> Result<Self, ValidationError> {
        match bits {
            0..=3 => Ok(FontStyle {
                bold: bits & 0b1 != 0,
                italic: bits & 0b10 != 0,
            }),
            other => Err(ValidationError::InvalidFontStyle(other)),
        }
    }

    pub fn bits(self) -> i64 {
        (self.bold as i64) | ((self.italic as i64) << 1)
    }
}

/// The font a commodity label is drawn with: family name, point size, style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontSpec {
    family: String,
    size: f32,
    style: FontStyle,
}

impl FontSpec {
    pub fn new(
        family: impl Into<String>,
        size: f32,
        style: FontStyle,
    ) -> Result<Self, ValidationError> {
        let family = family.into();
        if family.trim().is_empty() {
            return Err(ValidationError::EmptyFontFamily);
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(ValidationError::InvalidFontSize(size));
        }
        Ok(FontSpec {
            family,
            size,
            style,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }
}
