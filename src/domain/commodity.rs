use serde::Serialize;

use super::color::LabelColor;
use super::font::FontSpec;
use super::{check_amount, ValidationError};

/// Placement and typography of a commodity label on its owning image.
/// Present only for commodities anchored to an image; the owning image id is
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    image_id: i64,
    font: FontSpec,
    location: (f64, f64),
    color: LabelColor,
}

impl Label {
    pub(crate) fn new(image_id: i64, font: FontSpec, location: (f64, f64), color: LabelColor) -> Self {
        Label {
            image_id,
            font,
            location,
            color,
        }
    }

    pub fn image_id(&self) -> i64 {
        self.image_id
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn location(&self) -> (f64, f64) {
        self.location
    }

    pub fn color(&self) -> LabelColor {
        self.color
    }

    pub(crate) fn set_font(&mut self, font: FontSpec) {
        self.font = font;
    }

    pub(crate) fn set_color(&mut self, color: LabelColor) {
        self.color = color;
    }

    /// Bounds come from the owning image; the catalog passes them in because
    /// the label itself holds no back-reference.
    pub(crate) fn set_location(
        &mut self,
        x: f64,
        y: f64,
        bounds: (u32, u32),
    ) -> Result<(), ValidationError> {
        let (width, height) = bounds;
        if !x.is_finite()
            || !y.is_finite()
            || x < 0.0
            || y < 0.0
            || x > f64::from(width)
            || y > f64::from(height)
        {
            return Err(ValidationError::LocationOutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        self.location = (x, y);
        Ok(())
    }

    pub(crate) fn remap_image_id(&mut self, image_id: i64) {
        self.image_id = image_id;
    }
}

/// A priced line item. Setters validate and mutate memory only; persistence
/// happens through the catalog's save/reload operations. Position is owned by
/// the catalog's reorder machinery and has no public setter here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commodity {
    id: i64,
    name: String,
    cost: f64,
    whole_price: f64,
    partial_price: f64,
    cash_price: f64,
    is_exported: bool,
    position: i64,
    label: Option<Label>,
}

impl Commodity {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: i64,
        name: String,
        cost: f64,
        whole_price: f64,
        partial_price: f64,
        cash_price: f64,
        is_exported: bool,
        position: i64,
        label: Option<Label>,
    ) -> Self {
        Commodity {
            id,
            name,
            cost,
            whole_price,
            partial_price,
            cash_price,
            is_exported,
            position,
            label,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn whole_price(&self) -> f64 {
        self.whole_price
    }

    pub fn partial_price(&self) -> f64 {
        self.partial_price
    }

    pub fn cash_price(&self) -> f64 {
        self.cash_price
    }

    pub fn is_exported(&self) -> bool {
        self.is_exported
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    /// Id of the owning image, when this commodity is anchored to one.
    pub fn image_id(&self) -> Option<i64> {
        self.label.as_ref().map(Label::image_id)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.name = name;
        Ok(())
    }

    pub fn set_cost(&mut self, value: f64) -> Result<(), ValidationError> {
        self.cost = check_amount("cost", value)?;
        Ok(())
    }

    pub fn set_whole_price(&mut self, value: f64) -> Result<(), ValidationError> {
        self.whole_price = check_amount("whole price", value)?;
        Ok(())
    }

    pub fn set_partial_price(&mut self, value: f64) -> Result<(), ValidationError> {
        self.partial_price = check_amount("partial price", value)?;
        Ok(())
    }

    pub fn set_cash_price(&mut self, value: f64) -> Result<(), ValidationError> {
        self.cash_price = check_amount("cash price", value)?;
        Ok(())
    }

    pub fn set_exported(&mut self, exported: bool) {
        self.is_exported = exported;
    }

    pub(crate) fn set_position_value(&mut self, position: i64) {
        self.position = position;
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub(crate) fn label_mut(&mut self) -> Option<&mut Label> {
        self.label.as_mut()
    }

    pub(crate) fn overwrite(&mut self, other: Commodity) {
        *self = other;
    }
}
