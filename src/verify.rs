use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;

use crate::db;
use crate::domain::color::LabelColor;
use crate::fonts::FontCatalog;
use crate::imaging::ImageIdentifier;

/// The catalog failed its open-time integrity pass. Carries a human-readable
/// description and, where one exists, the lower-level cause. Opening is
/// refused entirely; no partial state escapes.
#[derive(Debug)]
pub struct CorruptError {
    message: String,
    cause: Option<Box<dyn Error + Send + Sync>>,
}

impl CorruptError {
    pub fn new(message: impl Into<String>) -> Self {
        CorruptError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Error + Send + Sync + 'static,
    ) -> Self {
        CorruptError {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CorruptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catalog corrupt: {}", self.message)
    }
}

impl Error for CorruptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

// Unexpected lower-level failures during verification are corruption too:
// the catalog can't be vouched for either way.
impl From<db::StoreError> for CorruptError {
    fn from(value: db::StoreError) -> Self {
        CorruptError::with_cause("store failure during verification", value)
    }
}

/// Read-only pass over the store, run before any entity is constructed.
/// Returns the identified pixel dimensions per image so the open path does
/// not identify twice.
pub fn verify_catalog(
    conn: &Connection,
    dir: &Path,
    identifier: &dyn ImageIdentifier,
    fonts: &dyn FontCatalog,
) -> Result<HashMap<i64, (u32, u32)>, CorruptError> {
    match db::get_meta(conn, "schema_version")? {
        Some(version) if version == db::CURRENT_SCHEMA_VERSION.to_string() => {}
        Some(version) => {
            return Err(CorruptError::new(format!(
                "unsupported schema version {version}"
            )));
        }
        None => return Err(CorruptError::new("schema version is missing")),
    }

    let mut sizes = HashMap::new();

    for image in db::list_images(conn)? {
        if image.contrast < 0.0 {
            return Err(CorruptError::new(format!(
                "image {} has negative contrast {}",
                image.id, image.contrast
            )));
        }
        if image.brightness < 0.0 {
            return Err(CorruptError::new(format!(
                "image {} has negative brightness {}",
                image.id, image.brightness
            )));
        }

        let file = db::image_file_path(dir, image.id);
        if !file.exists() {
            return Err(CorruptError::new(format!(
                "image {} has no backing file at {}",
                image.id,
                file.display()
            )));
        }
        let bytes = std::fs::read(&file).map_err(|err| {
            CorruptError::with_cause(
                format!("backing file {} is unreadable", file.display()),
                err,
            )
        })?;
        let size = identifier.identify(&bytes).map_err(|err| {
            CorruptError::with_cause(
                format!("backing file {} is not a decodable image", file.display()),
                err,
            )
        })?;

        for label in db::labels_for_image(conn, image.id)? {
            verify_label(&label, size, fonts)?;
        }
        sizes.insert(image.id, size);
    }

    let mut seen_positions = HashSet::new();
    for commodity in db::list_commodities(conn)? {
        for (field, value) in [
            ("cost", commodity.cost),
            ("whole price", commodity.whole_price),
            ("partial price", commodity.partial_price),
            ("cash price", commodity.cash_price),
        ] {
            if value < 0.0 {
                return Err(CorruptError::new(format!(
                    "commodity {} has negative {} {}",
                    commodity.id, field, value
                )));
            }
        }
        if commodity.name.trim().is_empty() {
            return Err(CorruptError::new(format!(
                "commodity {} has an empty name",
                commodity.id
            )));
        }
        let Some(position) = commodity.position else {
            return Err(CorruptError::new(format!(
                "commodity {} has no position",
                commodity.id
            )));
        };
        if position < 0 {
            return Err(CorruptError::new(format!(
                "commodity {} has negative position {}",
                commodity.id, position
            )));
        }
        if !seen_positions.insert(position) {
            return Err(CorruptError::new(format!(
                "position {} is held by more than one commodity",
                position
            )));
        }
    }

    Ok(sizes)
}

fn verify_label(
    label: &db::LabelRow,
    image_size: (u32, u32),
    fonts: &dyn FontCatalog,
) -> Result<(), CorruptError> {
    let (width, height) = image_size;
    if label.location_x < 0.0
        || label.location_y < 0.0
        || label.location_x > f64::from(width)
        || label.location_y > f64::from(height)
    {
        return Err(CorruptError::new(format!(
            "commodity {} label location ({}, {}) lies outside its {}x{} image",
            label.id, label.location_x, label.location_y, width, height
        )));
    }
    if label.font_size <= 0.0 {
        return Err(CorruptError::new(format!(
            "commodity {} has non-positive font size {}",
            label.id, label.font_size
        )));
    }
    if !(0..=3).contains(&label.font_style) {
        return Err(CorruptError::new(format!(
            "commodity {} has font style {} outside 0..=3",
            label.id, label.font_style
        )));
    }
    if let Err(err) = LabelColor::from_hex(&label.label_color) {
        return Err(CorruptError::with_cause(
            format!(
                "commodity {} has unparseable label color '{}'",
                label.id, label.label_color
            ),
            err,
        ));
    }
    if !fonts.contains_family(&label.font_family) {
        return Err(CorruptError::new(format!(
            "commodity {} uses font family '{}' which is not installed",
            label.id, label.font_family
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use rusqlite::Connection;
    use uuid::Uuid;

    use crate::db;
    use crate::fonts::StaticFontCatalog;
    use crate::imaging::{png_bytes, StandardIdentifier};

    use super::verify_catalog;

    fn unique_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pricebook-verify-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("test directory should be creatable");
        dir
    }

    fn catalog_with_image(dir: &Path) -> (Connection, i64, i64) {
        db::create_schema(dir).expect("schema should create");
        let conn = db::open_connection(dir).expect("connection should open");
        let image_id = db::insert_image(&conn).expect("image insert should succeed");
        std::fs::write(db::image_file_path(dir, image_id), png_bytes(64, 48))
            .expect("backing file should be writable");
        let com_id = db::insert_commodity(&conn).expect("commodity insert should succeed");
        db::insert_image_commodity(&conn, com_id, image_id, "Arial")
            .expect("link insert should succeed");
        (conn, image_id, com_id)
    }

    fn verify(conn: &Connection, dir: &Path) -> Result<(), super::CorruptError> {
        verify_catalog(
            conn,
            dir,
            &StandardIdentifier,
            &StaticFontCatalog::default(),
        )
        .map(|_| ())
    }

    #[test]
    fn accepts_a_well_formed_catalog() {
        let dir = unique_dir();
        let (conn, image_id, _) = catalog_with_image(&dir);
        let sizes = verify_catalog(
            &conn,
            &dir,
            &StandardIdentifier,
            &StaticFontCatalog::default(),
        )
        .expect("well-formed catalog should verify");
        assert_eq!(sizes.get(&image_id), Some(&(64, 48)));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn wrong_schema_version_is_corruption() {
        let dir = unique_dir();
        let (conn, _, _) = catalog_with_image(&dir);
        conn.execute(
            "UPDATE meta SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .expect("meta update should succeed");
        let err = verify(&conn, &dir).expect_err("version drift must be detected");
        assert!(err.message().contains("unsupported schema version"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_backing_file_is_corruption() {
        let dir = unique_dir();
        let (conn, image_id, _) = catalog_with_image(&dir);
        std::fs::remove_file(db::image_file_path(&dir, image_id))
            .expect("backing file should be removable");
        let err = verify(&conn, &dir).expect_err("missing file must be detected");
        assert!(err.message().contains("no backing file"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn undecodable_backing_file_is_corruption() {
        let dir = unique_dir();
        let (conn, image_id, _) = catalog_with_image(&dir);
        std::fs::write(db::image_file_path(&dir, image_id), b"not an image")
            .expect("backing file should be writable");
        let err = verify(&conn, &dir).expect_err("undecodable file must be detected");
        assert!(err.message().contains("not a decodable image"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn label_outside_image_bounds_is_corruption() {
        let dir = unique_dir();
        let (conn, _, com_id) = catalog_with_image(&dir);
        conn.execute(
            "UPDATE image_commodity SET location_x = 65.0 WHERE id = ?1",
            rusqlite::params![com_id],
        )
        .expect("location update should succeed");
        let err = verify(&conn, &dir).expect_err("out-of-bounds location must be detected");
        assert!(err.message().contains("outside its 64x48 image"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_font_family_is_corruption() {
        let dir = unique_dir();
        let (conn, _, com_id) = catalog_with_image(&dir);
        conn.execute(
            "UPDATE image_commodity SET font_family = 'No Such Family' WHERE id = ?1",
            rusqlite::params![com_id],
        )
        .expect("font update should succeed");
        let err = verify(&conn, &dir).expect_err("unknown family must be detected");
        assert!(err.message().contains("not installed"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn garbage_label_color_is_corruption() {
        let dir = unique_dir();
        let (conn, _, com_id) = catalog_with_image(&dir);
        conn.execute(
            "UPDATE image_commodity SET label_color = 'magenta-ish' WHERE id = ?1",
            rusqlite::params![com_id],
        )
        .expect("color update should succeed");
        let err = verify(&conn, &dir).expect_err("garbage color must be detected");
        assert!(err.message().contains("unparseable label color"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn null_position_is_corruption() {
        let dir = unique_dir();
        let (conn, _, com_id) = catalog_with_image(&dir);
        conn.execute(
            "UPDATE commodity SET position = NULL WHERE id = ?1",
            rusqlite::params![com_id],
        )
        .expect("position update should succeed");
        let err = verify(&conn, &dir).expect_err("NULL position must be detected");
        assert!(err.message().contains("no position"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn duplicate_positions_are_corruption_even_without_the_unique_index() {
        // A database produced elsewhere may lack our declared constraints;
        // the verifier must not rely on them.
        let dir = unique_dir();
        let path = db::db_path(&dir);
        let conn = Connection::open(&path).expect("raw database should open");
        conn.execute_batch(
            "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE commodity (
                 id INTEGER NOT NULL PRIMARY KEY,
                 name TEXT NOT NULL DEFAULT 'x',
                 position INTEGER,
                 cost REAL NOT NULL DEFAULT 0.0,
                 whole_price REAL NOT NULL DEFAULT 0.0,
                 partial_price REAL NOT NULL DEFAULT 0.0,
                 cash_price REAL NOT NULL DEFAULT 0.0,
                 is_exported INTEGER NOT NULL DEFAULT 1
             );
             CREATE TABLE image (
                 id INTEGER NOT NULL PRIMARY KEY,
                 contrast REAL NOT NULL DEFAULT 1.0,
                 brightness REAL NOT NULL DEFAULT 1.0,
                 is_exported INTEGER NOT NULL DEFAULT 1
             );
             CREATE TABLE image_commodity (
                 id INTEGER NOT NULL PRIMARY KEY,
                 image_id INTEGER NOT NULL,
                 font_family TEXT NOT NULL DEFAULT 'Arial',
                 font_style INTEGER NOT NULL DEFAULT 0,
                 font_size REAL NOT NULL DEFAULT 100.0,
                 location_x REAL NOT NULL DEFAULT 0.0,
                 location_y REAL NOT NULL DEFAULT 0.0,
                 label_color TEXT NOT NULL DEFAULT 'FFFFFFFF'
             );
             INSERT INTO meta (key, value) VALUES ('schema_version', '1');
             INSERT INTO commodity (id, position) VALUES (1, 0), (2, 0);",
        )
        .expect("relaxed schema should build");
        let err = verify(&conn, &dir).expect_err("duplicate positions must be detected");
        assert!(err.message().contains("more than one commodity"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
