use std::error::Error;
use std::fmt;

pub mod color;
pub mod commodity;
pub mod font;
pub mod image;

/// Rejected field assignment. Raised synchronously by entity setters; an
/// invalid value never reaches memory, let alone the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyName,
    NegativeAmount { field: &'static str, value: f64 },
    NonFiniteAmount { field: &'static str },
    LocationOutOfBounds { x: f64, y: f64, width: u32, height: u32 },
    InvalidFontSize(f32),
    InvalidFontStyle(i64),
    EmptyFontFamily,
    InvalidColor(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "name must not be empty"),
            ValidationError::NegativeAmount { field, value } => {
                write!(f, "{} can't be negative (got {})", field, value)
            }
            ValidationError::NonFiniteAmount { field } => {
                write!(f, "{} must be a finite number", field)
            }
            ValidationError::LocationOutOfBounds {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "label location ({}, {}) must lie within [(0, 0), ({}, {})]",
                x, y, width, height
            ),
            ValidationError::InvalidFontSize(size) => {
                write!(f, "font size must be > 0 and finite (got {})", size)
            }
            ValidationError::InvalidFontStyle(bits) => {
                write!(f, "font style value {} is outside 0..=3", bits)
            }
            ValidationError::EmptyFontFamily => write!(f, "font family name must not be empty"),
            ValidationError::InvalidColor(value) => {
                write!(f, "'{}' is not a valid RRGGBB/RRGGBBAA hex color", value)
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn check_amount(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteAmount { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{check_amount, ValidationError};

    #[test]
    fn rejects_negative_amounts() {
        let err = check_amount("cost", -0.5).expect_err("negative amount should be rejected");
        assert_eq!(
            err,
            ValidationError::NegativeAmount {
                field: "cost",
                value: -0.5
            }
        );
    }

    #[test]
    fn rejects_non_finite_amounts() {
        assert!(check_amount("cost", f64::NAN).is_err());
        assert!(check_amount("cost", f64::INFINITY).is_err());
        assert_eq!(check_amount("cost", 0.0), Ok(0.0));
    }
}
