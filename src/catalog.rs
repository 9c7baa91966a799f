use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::{self, StoreError};
use crate::domain::color::LabelColor;
use crate::domain::commodity::{Commodity, Label};
use crate::domain::font::{FontSpec, FontStyle};
use crate::domain::image::CatalogImage;
use crate::domain::ValidationError;
use crate::events::{CatalogEvent, EventBus, SubscriberId};
use crate::fonts::{FontCatalog, StaticFontCatalog};
use crate::imaging::{IdentifyError, ImageIdentifier, StandardIdentifier};
use crate::locks::{CatalogLock, LockError};
use crate::position;
use crate::tidy;
use crate::verify::{verify_catalog, CorruptError};

#[derive(Debug)]
pub enum CatalogError {
    Lock(LockError),
    Store(StoreError),
    Corrupt(CorruptError),
    Validation(ValidationError),
    Identify(IdentifyError),
    CommodityNotFound(i64),
    ImageNotFound(i64),
    /// The commodity exists but is not anchored to an image, so it has no
    /// label to operate on.
    NotAnImageCommodity(i64),
    UnknownFontFamily(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Lock(err) => write!(f, "{}", err),
            CatalogError::Store(err) => write!(f, "{}", err),
            CatalogError::Corrupt(err) => write!(f, "{}", err),
            CatalogError::Validation(err) => write!(f, "{}", err),
            CatalogError::Identify(err) => write!(f, "{}", err),
            CatalogError::CommodityNotFound(id) => write!(f, "no commodity with id {}", id),
            CatalogError::ImageNotFound(id) => write!(f, "no image with id {}", id),
            CatalogError::NotAnImageCommodity(id) => {
                write!(f, "commodity {} is not anchored to an image", id)
            }
            CatalogError::UnknownFontFamily(family) => {
                write!(f, "font family '{}' is not installed", family)
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CatalogError::Lock(err) => Some(err),
            CatalogError::Store(err) => Some(err),
            CatalogError::Corrupt(err) => Some(err),
            CatalogError::Validation(err) => Some(err),
            CatalogError::Identify(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LockError> for CatalogError {
    fn from(value: LockError) -> Self {
        CatalogError::Lock(value)
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        CatalogError::Store(value)
    }
}

impl From<CorruptError> for CatalogError {
    fn from(value: CorruptError) -> Self {
        CatalogError::Corrupt(value)
    }
}

impl From<ValidationError> for CatalogError {
    fn from(value: ValidationError) -> Self {
        CatalogError::Validation(value)
    }
}

impl From<IdentifyError> for CatalogError {
    fn from(value: IdentifyError) -> Self {
        CatalogError::Identify(value)
    }
}

/// The open catalog: exclusive owner of one catalog directory for its whole
/// lifetime. Holds the directory lock, the store connection, and the
/// in-memory entities, which mirror the store between operations.
///
/// Every mutating operation takes `&mut self`, so reordering and compaction
/// can never interleave; they are serialized by construction.
pub struct Catalog {
    dir: PathBuf,
    conn: Connection,
    commodities: Vec<Commodity>,
    images: Vec<CatalogImage>,
    events: EventBus,
    identifier: Box<dyn ImageIdentifier>,
    fonts: Box<dyn FontCatalog>,
    _lock: CatalogLock,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("dir", &self.dir)
            .field("commodities", &self.commodities.len())
            .field("images", &self.images.len())
            .finish()
    }
}

impl Catalog {
    /// Creates a fresh catalog in `dir` and opens it. Fails if `dir` already
    /// holds one.
    pub fn create(dir: &Path) -> Result<Option<Catalog>, CatalogError> {
        db::create_schema(dir)?;
        Catalog::open(dir)
    }

    pub fn create_with(
        dir: &Path,
        identifier: Box<dyn ImageIdentifier>,
        fonts: Box<dyn FontCatalog>,
    ) -> Result<Option<Catalog>, CatalogError> {
        db::create_schema(dir)?;
        Catalog::open_with(dir, identifier, fonts)
    }

    pub fn open(dir: &Path) -> Result<Option<Catalog>, CatalogError> {
        Catalog::open_with(
            dir,
            Box::new(StandardIdentifier),
            Box::new(StaticFontCatalog::default()),
        )
    }

    /// Opens the catalog in `dir`: acquire the lock, verify integrity, load
    /// every entity. `Ok(None)` means another holder has the catalog open.
    /// If anything after the lock fails, the lock is released on unwind.
    pub fn open_with(
        dir: &Path,
        identifier: Box<dyn ImageIdentifier>,
        fonts: Box<dyn FontCatalog>,
    ) -> Result<Option<Catalog>, CatalogError> {
        let Some(lock) = CatalogLock::try_acquire(dir)? else {
            return Ok(None);
        };
        let conn = db::open_connection(dir)?;
        let sizes = verify_catalog(&conn, dir, identifier.as_ref(), fonts.as_ref())?;

        let mut commodities = Vec::new();
        for row in db::list_commodities(&conn)? {
            commodities.push(commodity_from_store(&conn, row)?);
        }
        let mut images = Vec::new();
        for row in db::list_images(&conn)? {
            let size = sizes.get(&row.id).copied().ok_or_else(|| {
                CorruptError::new(format!("image {} vanished while opening", row.id))
            })?;
            let hosted = db::labels_for_image(&conn, row.id)?
                .into_iter()
                .map(|label| label.id)
                .collect();
            images.push(CatalogImage::new(
                row.id,
                row.contrast,
                row.brightness,
                row.is_exported,
                size,
                hosted,
            ));
        }

        Ok(Some(Catalog {
            dir: dir.to_path_buf(),
            conn,
            commodities,
            images,
            events: EventBus::new(),
            identifier,
            fonts,
            _lock: lock,
        }))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Commodities in position order.
    pub fn commodities(&self) -> &[Commodity] {
        &self.commodities
    }

    pub fn images(&self) -> &[CatalogImage] {
        &self.images
    }

    pub fn commodity(&self, id: i64) -> Option<&Commodity> {
        self.commodities.iter().find(|c| c.id() == id)
    }

    pub fn commodity_mut(&mut self, id: i64) -> Option<&mut Commodity> {
        self.commodities.iter_mut().find(|c| c.id() == id)
    }

    pub fn image(&self, id: i64) -> Option<&CatalogImage> {
        self.images.iter().find(|img| img.id() == id)
    }

    pub fn image_mut(&mut self, id: i64) -> Option<&mut CatalogImage> {
        self.images.iter_mut().find(|img| img.id() == id)
    }

    pub fn image_file_path(&self, image_id: i64) -> PathBuf {
        db::image_file_path(&self.dir, image_id)
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&CatalogEvent) + 'static,
    ) -> SubscriberId {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    /// Adds a standalone commodity with store defaults at the next position.
    /// Returns its id.
    pub fn add_commodity(&mut self) -> Result<i64, CatalogError> {
        let id = db::insert_commodity(&self.conn)?;
        let row = db::get_commodity(&self.conn, id)?
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let commodity = commodity_from_store(&self.conn, row)?;
        self.commodities.push(commodity);
        self.events.emit(&CatalogEvent::CommodityAdded { id });
        Ok(id)
    }

    /// Adds an image from encoded bytes: identify first, then the row, then
    /// the backing file. Returns its id.
    pub fn add_image(&mut self, bytes: &[u8]) -> Result<i64, CatalogError> {
        let size = self.identifier.identify(bytes)?;
        let id = db::insert_image(&self.conn)?;
        std::fs::write(db::image_file_path(&self.dir, id), bytes).map_err(StoreError::from)?;
        let row = db::get_image(&self.conn, id)?.ok_or(CatalogError::ImageNotFound(id))?;
        self.images.push(CatalogImage::new(
            row.id,
            row.contrast,
            row.brightness,
            row.is_exported,
            size,
            Vec::new(),
        ));
        self.events.emit(&CatalogEvent::ImageAdded { id });
        Ok(id)
    }

    /// Adds a commodity anchored to `image_id`, with a default label.
    /// Returns its id.
    pub fn add_image_commodity(&mut self, image_id: i64) -> Result<i64, CatalogError> {
        if self.image(image_id).is_none() {
            return Err(CatalogError::ImageNotFound(image_id));
        }
        // The store's default family may not be installed under the
        // configured catalog; pick one that is, so a fresh row always
        // verifies.
        let family = if self.fonts.contains_family(db::DEFAULT_FONT_FAMILY) {
            db::DEFAULT_FONT_FAMILY.to_string()
        } else {
            self.fonts
                .installed_families()
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| {
                    CatalogError::UnknownFontFamily(db::DEFAULT_FONT_FAMILY.to_string())
                })?
        };
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let id = db::insert_commodity(&tx)?;
        db::insert_image_commodity(&tx, id, image_id, &family)?;
        tx.commit().map_err(StoreError::from)?;

        let row = db::get_commodity(&self.conn, id)?
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let commodity = commodity_from_store(&self.conn, row)?;
        self.commodities.push(commodity);
        if let Some(image) = self.image_mut(image_id) {
            image.attach_commodity(id);
        }
        self.events.emit(&CatalogEvent::CommodityAdded { id });
        Ok(id)
    }

    /// Persists a commodity's in-memory fields (and its label, if any).
    pub fn save_commodity(&mut self, id: i64) -> Result<(), CatalogError> {
        let commodity = self
            .commodity(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let row = db::CommodityRow {
            id: commodity.id(),
            name: commodity.name().to_string(),
            position: Some(commodity.position()),
            cost: commodity.cost(),
            whole_price: commodity.whole_price(),
            partial_price: commodity.partial_price(),
            cash_price: commodity.cash_price(),
            is_exported: commodity.is_exported(),
        };
        db::update_commodity_fields(&self.conn, &row)?;
        if let Some(label) = commodity.label() {
            let (x, y) = label.location();
            let row = db::LabelRow {
                id: commodity.id(),
                image_id: label.image_id(),
                font_family: label.font().family().to_string(),
                font_style: label.font().style().bits(),
                font_size: f64::from(label.font().size()),
                location_x: x,
                location_y: y,
                label_color: label.color().to_hex(),
            };
            db::update_label_fields(&self.conn, &row)?;
        }
        Ok(())
    }

    /// Discards a commodity's in-memory fields in favour of the store's.
    pub fn reload_commodity(&mut self, id: i64) -> Result<(), CatalogError> {
        let row = db::get_commodity(&self.conn, id)?
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let fresh = commodity_from_store(&self.conn, row)?;
        let commodity = self
            .commodity_mut(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        commodity.overwrite(fresh);
        Ok(())
    }

    pub fn save_image(&mut self, id: i64) -> Result<(), CatalogError> {
        let image = self.image(id).ok_or(CatalogError::ImageNotFound(id))?;
        let row = db::ImageRow {
            id: image.id(),
            contrast: image.contrast(),
            brightness: image.brightness(),
            is_exported: image.is_exported(),
        };
        db::update_image_fields(&self.conn, &row)?;
        Ok(())
    }

    pub fn reload_image(&mut self, id: i64) -> Result<(), CatalogError> {
        let row = db::get_image(&self.conn, id)?.ok_or(CatalogError::ImageNotFound(id))?;
        let image = self.image_mut(id).ok_or(CatalogError::ImageNotFound(id))?;
        image.set_fields(row.contrast, row.brightness, row.is_exported);
        Ok(())
    }

    /// Moves a commodity to `requested` (clamped), shifting the commodities
    /// in between by one. Emits a position-changed event per moved
    /// commodity, the mover last.
    pub fn set_position(&mut self, id: i64, requested: i64) -> Result<(), CatalogError> {
        let idx = self
            .commodities
            .iter()
            .position(|c| c.id() == id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let changed =
            position::move_commodity(&mut self.conn, &mut self.commodities, idx, requested)?;
        self.commodities.sort_by_key(Commodity::position);
        for (id, position) in changed {
            self.events
                .emit(&CatalogEvent::PositionChanged { id, position });
        }
        Ok(())
    }

    /// Removes a commodity and closes the gap it leaves, so positions stay
    /// `0..N-1`. Shifted commodities get position-changed events after the
    /// removal event.
    pub fn delete_commodity(&mut self, id: i64) -> Result<(), CatalogError> {
        let commodity = self
            .commodity(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let removed_position = commodity.position();
        let image_id = commodity.image_id();

        // Rows above the gap, closest first, so each step lands in the slot
        // just vacated.
        let shifted: Vec<(i64, i64)> = self
            .commodities
            .iter()
            .filter(|c| c.position() > removed_position)
            .map(|c| (c.id(), c.position() - 1))
            .collect();

        let tx = self.conn.transaction().map_err(StoreError::from)?;
        db::delete_commodity(&tx, id)?;
        for &(shift_id, target) in &shifted {
            tx.execute(
                "UPDATE commodity SET position = ?2 WHERE id = ?1",
                rusqlite::params![shift_id, target],
            )
            .map_err(StoreError::from)?;
        }
        tx.commit().map_err(StoreError::from)?;

        self.commodities.retain(|c| c.id() != id);
        for &(shift_id, target) in &shifted {
            if let Some(c) = self.commodity_mut(shift_id) {
                c.set_position_value(target);
            }
        }
        if let Some(image_id) = image_id {
            if let Some(image) = self.image_mut(image_id) {
                image.detach_commodity(id);
            }
        }
        self.events.emit(&CatalogEvent::CommodityRemoved { id });
        for (shift_id, target) in shifted {
            self.events.emit(&CatalogEvent::PositionChanged {
                id: shift_id,
                position: target,
            });
        }
        Ok(())
    }

    /// Removes an image, its hosted commodities, and its backing file. The
    /// row deletions and the position repack of the survivors run in one
    /// store transaction.
    pub fn delete_image(&mut self, id: i64) -> Result<(), CatalogError> {
        let image = self.image(id).ok_or(CatalogError::ImageNotFound(id))?;
        let hosted: Vec<i64> = image.commodity_ids().to_vec();

        // Survivors in position order; each one whose rank differs from its
        // current position shifts down into a slot a deleted row or an
        // earlier shift has already vacated.
        let shifted: Vec<(i64, i64)> = self
            .commodities
            .iter()
            .filter(|c| !hosted.contains(&c.id()))
            .enumerate()
            .filter(|(rank, c)| c.position() != *rank as i64)
            .map(|(rank, c)| (c.id(), rank as i64))
            .collect();

        let tx = self.conn.transaction().map_err(StoreError::from)?;
        for &commodity_id in &hosted {
            db::delete_commodity(&tx, commodity_id)?;
        }
        db::delete_image(&tx, id)?;
        for &(shift_id, target) in &shifted {
            tx.execute(
                "UPDATE commodity SET position = ?2 WHERE id = ?1",
                rusqlite::params![shift_id, target],
            )
            .map_err(StoreError::from)?;
        }
        tx.commit().map_err(StoreError::from)?;

        self.commodities.retain(|c| !hosted.contains(&c.id()));
        for &(shift_id, target) in &shifted {
            if let Some(c) = self.commodity_mut(shift_id) {
                c.set_position_value(target);
            }
        }
        self.images.retain(|img| img.id() != id);
        let file = db::image_file_path(&self.dir, id);
        if file.exists() {
            std::fs::remove_file(file).map_err(StoreError::from)?;
        }
        for commodity_id in hosted {
            self.events
                .emit(&CatalogEvent::CommodityRemoved { id: commodity_id });
        }
        for (shift_id, target) in shifted {
            self.events.emit(&CatalogEvent::PositionChanged {
                id: shift_id,
                position: target,
            });
        }
        self.events.emit(&CatalogEvent::ImageRemoved { id });
        Ok(())
    }

    /// Moves a label within its owning image; bounds come from the image's
    /// identified size. Memory-only until `save_commodity`.
    pub fn set_label_location(&mut self, id: i64, x: f64, y: f64) -> Result<(), CatalogError> {
        let commodity = self
            .commodity(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        let image_id = commodity
            .image_id()
            .ok_or(CatalogError::NotAnImageCommodity(id))?;
        let bounds = self
            .image(image_id)
            .ok_or(CatalogError::ImageNotFound(image_id))?
            .size();
        let commodity = self
            .commodity_mut(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        match commodity.label_mut() {
            Some(label) => label.set_location(x, y, bounds)?,
            None => return Err(CatalogError::NotAnImageCommodity(id)),
        }
        Ok(())
    }

    /// Swaps a label's font; the family must be installed.
    pub fn set_label_font(&mut self, id: i64, font: FontSpec) -> Result<(), CatalogError> {
        if !self.fonts.contains_family(font.family()) {
            return Err(CatalogError::UnknownFontFamily(font.family().to_string()));
        }
        let commodity = self
            .commodity_mut(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        match commodity.label_mut() {
            Some(label) => label.set_font(font),
            None => return Err(CatalogError::NotAnImageCommodity(id)),
        }
        Ok(())
    }

    pub fn set_label_color(&mut self, id: i64, color: LabelColor) -> Result<(), CatalogError> {
        let commodity = self
            .commodity_mut(id)
            .ok_or(CatalogError::CommodityNotFound(id))?;
        match commodity.label_mut() {
            Some(label) => label.set_color(color),
            None => return Err(CatalogError::NotAnImageCommodity(id)),
        }
        Ok(())
    }

    /// Replaces an image's backing file with new encoded bytes and refreshes
    /// its identified size.
    pub fn replace_image_file(&mut self, id: i64, bytes: &[u8]) -> Result<(), CatalogError> {
        if self.image(id).is_none() {
            return Err(CatalogError::ImageNotFound(id));
        }
        let size = self.identifier.identify(bytes)?;
        std::fs::write(db::image_file_path(&self.dir, id), bytes).map_err(StoreError::from)?;
        if let Some(image) = self.image_mut(id) {
            image.set_size(size);
        }
        self.events.emit(&CatalogEvent::FileUpdated { image_id: id });
        Ok(())
    }

    /// Repacks every id and position to a minimal contiguous layout.
    pub fn tidy(&mut self) -> Result<(), CatalogError> {
        tidy::tidy(
            &mut self.conn,
            &self.dir,
            &mut self.commodities,
            &mut self.images,
        )?;
        Ok(())
    }
}

fn commodity_from_store(
    conn: &Connection,
    row: db::CommodityRow,
) -> Result<Commodity, CatalogError> {
    let Some(position) = row.position else {
        return Err(CorruptError::new(format!("commodity {} has no position", row.id)).into());
    };
    let label = match db::get_label(conn, row.id)? {
        Some(label) => Some(label_from_store(label)?),
        None => None,
    };
    Ok(Commodity::new(
        row.id,
        row.name,
        row.cost,
        row.whole_price,
        row.partial_price,
        row.cash_price,
        row.is_exported,
        position,
        label,
    ))
}

fn label_from_store(row: db::LabelRow) -> Result<Label, CatalogError> {
    let style = FontStyle::from_bits(row.font_style)?;
    let font = FontSpec::new(row.font_family, row.font_size as f32, style)?;
    let color = LabelColor::from_hex(&row.label_color)
        .map_err(|err| CorruptError::with_cause("stored label color is unparseable", err))?;
    Ok(Label::new(
        row.image_id,
        font,
        (row.location_x, row.location_y),
        color,
    ))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use uuid::Uuid;

    use crate::catalog::{Catalog, CatalogError};
    use crate::db;
    use crate::domain::color::LabelColor;
    use crate::domain::font::{FontSpec, FontStyle};
    use crate::events::CatalogEvent;
    use crate::fonts::StaticFontCatalog;
    use crate::imaging::{png_bytes, StandardIdentifier};

    fn unique_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pricebook-catalog-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("test directory should be creatable");
        dir
    }

    fn fresh_catalog(dir: &std::path::Path) -> Catalog {
        Catalog::create(dir)
            .expect("create should succeed")
            .expect("a fresh directory is never already open")
    }

    #[test]
    fn second_open_gets_the_already_open_signal() {
        let dir = unique_dir();
        let first = fresh_catalog(&dir);
        let second = Catalog::open(&dir).expect("second open should not fail");
        assert!(second.is_none());
        drop(first);
        let third = Catalog::open(&dir).expect("open after close should not fail");
        assert!(third.is_some());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_backing_file_refuses_the_open() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let image_id = catalog
            .add_image(&png_bytes(32, 32))
            .expect("add image should succeed");
        drop(catalog);
        std::fs::remove_file(db::image_file_path(&dir, image_id))
            .expect("backing file should be removable");
        let err = Catalog::open(&dir).expect_err("corrupt catalog must refuse to open");
        assert!(matches!(err, CatalogError::Corrupt(_)));
        // The failed open must not leave the lock behind.
        assert!(!db::lock_path(&dir).exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn save_then_reload_reproduces_every_field() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let image_id = catalog
            .add_image(&png_bytes(200, 100))
            .expect("add image should succeed");
        let id = catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");

        let commodity = catalog.commodity_mut(id).expect("commodity exists");
        commodity.set_name("Olive Oil").expect("name is valid");
        commodity.set_cost(3.25).expect("cost is valid");
        commodity.set_whole_price(5.5).expect("price is valid");
        commodity.set_partial_price(6.0).expect("price is valid");
        commodity.set_cash_price(5.75).expect("price is valid");
        commodity.set_exported(false);
        catalog.set_label_location(id, 120.0, 40.0).expect("location in bounds");
        let font = FontSpec::new(
            "DejaVu Sans",
            36.0,
            FontStyle { bold: true, italic: false },
        )
        .expect("font is valid");
        catalog.set_label_font(id, font.clone()).expect("family is installed");
        catalog
            .set_label_color(id, LabelColor::from_hex("#11223344").expect("color parses"))
            .expect("color applies");
        catalog.save_commodity(id).expect("save should succeed");

        // Scribble over memory, then reload from the store.
        let commodity = catalog.commodity_mut(id).expect("commodity exists");
        commodity.set_name("clobbered").expect("name is valid");
        commodity.set_cost(99.0).expect("cost is valid");
        catalog.reload_commodity(id).expect("reload should succeed");

        let commodity = catalog.commodity(id).expect("commodity exists");
        assert_eq!(commodity.name(), "Olive Oil");
        assert_eq!(commodity.cost(), 3.25);
        assert_eq!(commodity.whole_price(), 5.5);
        assert_eq!(commodity.partial_price(), 6.0);
        assert_eq!(commodity.cash_price(), 5.75);
        assert!(!commodity.is_exported());
        let label = commodity.label().expect("label survives");
        assert_eq!(label.location(), (120.0, 40.0));
        assert_eq!(label.font(), &font);
        assert_eq!(label.color().to_hex(), "11223344");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn image_save_reload_round_trip() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let id = catalog
            .add_image(&png_bytes(10, 10))
            .expect("add image should succeed");
        let image = catalog.image_mut(id).expect("image exists");
        image.set_contrast(0.5).expect("contrast is valid");
        image.set_brightness(1.5).expect("brightness is valid");
        image.set_exported(false);
        catalog.save_image(id).expect("save should succeed");

        let image = catalog.image_mut(id).expect("image exists");
        image.set_contrast(9.0).expect("contrast is valid");
        catalog.reload_image(id).expect("reload should succeed");
        let image = catalog.image(id).expect("image exists");
        assert_eq!(image.contrast(), 0.5);
        assert_eq!(image.brightness(), 1.5);
        assert!(!image.is_exported());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn deleting_a_commodity_closes_the_position_gap() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let ids: Vec<i64> = (0..4)
            .map(|_| {
                catalog
                    .add_commodity()
                    .expect("add commodity should succeed")
            })
            .collect();
        catalog.delete_commodity(ids[1]).expect("delete should succeed");
        let layout: Vec<(i64, i64)> = catalog
            .commodities()
            .iter()
            .map(|c| (c.id(), c.position()))
            .collect();
        assert_eq!(layout, vec![(ids[0], 0), (ids[2], 1), (ids[3], 2)]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn reorder_emits_position_changes_with_the_mover_last() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let ids: Vec<i64> = (0..4)
            .map(|_| {
                catalog
                    .add_commodity()
                    .expect("add commodity should succeed")
            })
            .collect();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        catalog.subscribe(move |event| {
            if let CatalogEvent::PositionChanged { id, position } = event {
                sink.borrow_mut().push((*id, *position));
            }
        });
        catalog.set_position(ids[3], 0).expect("move should succeed");
        assert_eq!(
            *seen.borrow(),
            vec![(ids[2], 3), (ids[1], 2), (ids[0], 1), (ids[3], 0)]
        );
        let positions: Vec<i64> = catalog.commodities().iter().map(|c| c.position()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unsubscribed_callbacks_no_longer_see_mutations() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let subscription = catalog.subscribe(move |_| *counter.borrow_mut() += 1);
        catalog.add_commodity().expect("add commodity should succeed");
        catalog.unsubscribe(subscription);
        catalog.add_commodity().expect("add commodity should succeed");
        assert_eq!(*count.borrow(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn deleting_an_image_takes_its_commodities_and_file() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let standalone = catalog
            .add_commodity()
            .expect("add commodity should succeed");
        let image_id = catalog
            .add_image(&png_bytes(16, 16))
            .expect("add image should succeed");
        let hosted = catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");
        catalog.delete_image(image_id).expect("delete should succeed");

        assert!(catalog.image(image_id).is_none());
        assert!(catalog.commodity(hosted).is_none());
        assert!(catalog.commodity(standalone).is_some());
        assert_eq!(catalog.commodity(standalone).map(|c| c.position()), Some(0));
        assert!(!db::image_file_path(&dir, image_id).exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn deleting_an_image_repacks_surviving_positions() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let first = catalog
            .add_commodity()
            .expect("add commodity should succeed");
        let image_id = catalog
            .add_image(&png_bytes(16, 16))
            .expect("add image should succeed");
        catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");
        let second = catalog
            .add_commodity()
            .expect("add commodity should succeed");
        catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");

        catalog.delete_image(image_id).expect("delete should succeed");

        assert_eq!(catalog.commodity(first).map(|c| c.position()), Some(0));
        assert_eq!(catalog.commodity(second).map(|c| c.position()), Some(1));
        let rows = db::list_commodities(
            &db::open_connection(&dir).expect("second connection should open"),
        )
        .expect("list should succeed");
        let layout: Vec<(i64, Option<i64>)> = rows.iter().map(|r| (r.id, r.position)).collect();
        assert_eq!(layout, vec![(first, Some(0)), (second, Some(1))]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn default_label_family_follows_the_installed_catalog() {
        let dir = unique_dir();
        let mut catalog = Catalog::create_with(
            &dir,
            Box::new(StandardIdentifier),
            Box::new(StaticFontCatalog::new(["Custom Grotesk".to_string()])),
        )
        .expect("create should succeed")
        .expect("a fresh directory is never already open");
        let image_id = catalog
            .add_image(&png_bytes(16, 16))
            .expect("add image should succeed");
        let id = catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");
        let label = catalog
            .commodity(id)
            .expect("commodity exists")
            .label()
            .expect("label exists");
        assert_eq!(label.font().family(), "Custom Grotesk");

        // The fresh row must survive the open-time integrity pass under the
        // same font catalog.
        drop(catalog);
        let reopened = Catalog::open_with(
            &dir,
            Box::new(StandardIdentifier),
            Box::new(StaticFontCatalog::new(["Custom Grotesk".to_string()])),
        )
        .expect("reopen should succeed");
        assert!(reopened.is_some());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn replace_image_file_refreshes_the_size() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let id = catalog
            .add_image(&png_bytes(10, 10))
            .expect("add image should succeed");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        catalog.subscribe(move |event| sink.borrow_mut().push(*event));
        catalog
            .replace_image_file(id, &png_bytes(300, 200))
            .expect("replace should succeed");
        assert_eq!(catalog.image(id).map(|img| img.size()), Some((300, 200)));
        assert_eq!(*seen.borrow(), vec![CatalogEvent::FileUpdated { image_id: id }]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn label_operations_reject_standalone_commodities() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let id = catalog
            .add_commodity()
            .expect("add commodity should succeed");
        let err = catalog
            .set_label_location(id, 0.0, 0.0)
            .expect_err("standalone commodity has no label");
        assert!(matches!(err, CatalogError::NotAnImageCommodity(_)));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_font_family_is_rejected_before_mutation() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let image_id = catalog
            .add_image(&png_bytes(16, 16))
            .expect("add image should succeed");
        let id = catalog
            .add_image_commodity(image_id)
            .expect("add image commodity should succeed");
        let font = FontSpec::new("No Such Family", 20.0, FontStyle::REGULAR).expect("font builds");
        let err = catalog
            .set_label_font(id, font)
            .expect_err("unknown family must be rejected");
        assert!(matches!(err, CatalogError::UnknownFontFamily(_)));
        let label = catalog.commodity(id).expect("commodity exists").label().expect("label exists");
        assert_eq!(label.font().family(), "Arial");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn tidy_after_deletions_repacks_ids() {
        let dir = unique_dir();
        let mut catalog = fresh_catalog(&dir);
        let ids: Vec<i64> = (0..3)
            .map(|_| {
                catalog
                    .add_commodity()
                    .expect("add commodity should succeed")
            })
            .collect();
        catalog.delete_commodity(ids[0]).expect("delete should succeed");
        catalog.tidy().expect("tidy should succeed");
        let layout: Vec<(i64, i64)> = catalog
            .commodities()
            .iter()
            .map(|c| (c.id(), c.position()))
            .collect();
        assert_eq!(layout, vec![(0, 0), (1, 1)]);
        let rows = db::list_commodities(
            &db::open_connection(&dir).expect("second connection should open"),
        )
        .expect("list should succeed");
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<i64>>(), vec![0, 1]);
        let _ = std::fs::remove_dir_all(dir);
    }
}
