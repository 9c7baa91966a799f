use serde::Serialize;

use super::{check_amount, ValidationError};

/// An image hosted by the catalog directory. Pixel dimensions are derived
/// from the backing file at open time (and again whenever the file is
/// replaced), never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogImage {
    id: i64,
    contrast: f64,
    brightness: f64,
    is_exported: bool,
    width: u32,
    height: u32,
    commodity_ids: Vec<i64>,
}

impl CatalogImage {
    pub(crate) fn new(
        id: i64,
        contrast: f64,
        brightness: f64,
        is_exported: bool,
        size: (u32, u32),
        commodity_ids: Vec<i64>,
    ) -> Self {
        CatalogImage {
            id,
            contrast,
            brightness,
            is_exported,
            width: size.0,
            height: size.1,
            commodity_ids,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn is_exported(&self) -> bool {
        self.is_exported
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ids of the commodities drawn on this image, in no particular order;
    /// ordering questions are answered by commodity positions.
    pub fn commodity_ids(&self) -> &[i64] {
        &self.commodity_ids
    }

    pub fn set_contrast(&mut self, value: f64) -> Result<(), ValidationError> {
        self.contrast = check_amount("contrast", value)?;
        Ok(())
    }

    pub fn set_brightness(&mut self, value: f64) -> Result<(), ValidationError> {
        self.brightness = check_amount("brightness", value)?;
        Ok(())
    }

    pub fn set_exported(&mut self, exported: bool) {
        self.is_exported = exported;
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub(crate) fn set_size(&mut self, size: (u32, u32)) {
        self.width = size.0;
        self.height = size.1;
    }

    pub(crate) fn attach_commodity(&mut self, commodity_id: i64) {
        self.commodity_ids.push(commodity_id);
    }

    pub(crate) fn detach_commodity(&mut self, commodity_id: i64) {
        self.commodity_ids.retain(|id| *id != commodity_id);
    }

    pub(crate) fn set_commodity_ids(&mut self, ids: Vec<i64>) {
        self.commodity_ids = ids;
    }

    pub(crate) fn set_fields(&mut self, contrast: f64, brightness: f64, is_exported: bool) {
        self.contrast = contrast;
        self.brightness = brightness;
        self.is_exported = is_exported;
    }
}

#[cfg(test)]
mod tests {
    use super::CatalogImage;

    #[test]
    fn contrast_and_brightness_must_be_non_negative() {
        let mut image = CatalogImage::new(1, 1.0, 1.0, true, (640, 480), Vec::new());
        assert!(image.set_contrast(-0.1).is_err());
        assert!(image.set_brightness(f64::NEG_INFINITY).is_err());
        image.set_contrast(0.0).expect("zero contrast is valid");
        image.set_brightness(2.5).expect("positive brightness is valid");
        assert_eq!(image.contrast(), 0.0);
        assert_eq!(image.brightness(), 2.5);
    }

    #[test]
    fn attach_and_detach_commodities() {
        let mut image = CatalogImage::new(1, 1.0, 1.0, true, (10, 10), vec![3]);
        image.attach_commodity(5);
        assert_eq!(image.commodity_ids(), &[3, 5]);
        image.detach_commodity(3);
        assert_eq!(image.commodity_ids(), &[5]);
    }
}
