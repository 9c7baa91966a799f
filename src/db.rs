use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Fixed file names inside a catalog directory.
pub const DB_FILE_NAME: &str = "catalog.db";
pub const LOCK_FILE_NAME: &str = ".catalog.lock";

/// Family the schema defaults to; matches the `font_family` column DEFAULT.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE_NAME)
}

pub fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE_NAME)
}

/// Backing file for an image row, named deterministically from its id.
pub fn image_file_path(dir: &Path, image_id: i64) -> PathBuf {
    dir.join(format!("{image_id}.jpg"))
}

#[derive(Debug)]
pub enum StoreError {
    /// `create_schema` on a directory that already holds a catalog database.
    SchemaExists(PathBuf),
    /// `open_connection` on a directory with no catalog database.
    SchemaMissing(PathBuf),
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SchemaExists(path) => {
                write!(f, "a catalog database already exists at {}", path.display())
            }
            StoreError::SchemaMissing(path) => {
                write!(f, "no catalog database found at {}", path.display())
            }
            StoreError::Sqlite(err) => write!(f, "store error: {}", err),
            StoreError::Io(err) => write!(f, "store I/O error: {}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Sqlite(err) => Some(err),
            StoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Sqlite(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

// The declared constraints mirror the catalog invariants: unique nullable
// position, non-negative monetary columns, bounded style enum, link table
// referencing both parents. Position is nullable because the reorder pass
// parks the moving row at NULL before shifting its neighbours.
const SCHEMA: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE commodity (
    id INTEGER NOT NULL PRIMARY KEY,
    name TEXT NOT NULL DEFAULT ('Commodity ' || CURRENT_TIMESTAMP),
    position INTEGER UNIQUE CHECK (position IS NULL OR position >= 0),
    cost REAL NOT NULL DEFAULT 0.0 CHECK (cost >= 0.0),
    whole_price REAL NOT NULL DEFAULT 0.0 CHECK (whole_price >= 0.0),
    partial_price REAL NOT NULL DEFAULT 0.0 CHECK (partial_price >= 0.0),
    cash_price REAL NOT NULL DEFAULT 0.0 CHECK (cash_price >= 0.0),
    is_exported INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE image (
    id INTEGER NOT NULL PRIMARY KEY,
    contrast REAL NOT NULL DEFAULT 1.0 CHECK (contrast >= 0.0),
    brightness REAL NOT NULL DEFAULT 1.0 CHECK (brightness >= 0.0),
    is_exported INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE image_commodity (
    id INTEGER NOT NULL PRIMARY KEY
        REFERENCES commodity(id) ON UPDATE CASCADE ON DELETE CASCADE,
    image_id INTEGER NOT NULL
        REFERENCES image(id) ON UPDATE CASCADE,
    font_family TEXT NOT NULL DEFAULT 'Arial',
    font_style INTEGER NOT NULL DEFAULT 0 CHECK (font_style >= 0 AND font_style <= 3),
    font_size REAL NOT NULL DEFAULT 100.0 CHECK (font_size > 0.0),
    location_x REAL NOT NULL DEFAULT 0.0 CHECK (location_x >= 0.0),
    location_y REAL NOT NULL DEFAULT 0.0 CHECK (location_y >= 0.0),
    label_color TEXT NOT NULL DEFAULT 'FFFFFFFF'
);

CREATE INDEX idx_image_commodity_image_id ON image_commodity(image_id);
"#;

/// Creates the catalog database in `dir`. Refuses to touch a directory that
/// already holds one.
pub fn create_schema(dir: &Path) -> Result<(), StoreError> {
    let path = db_path(dir);
    if path.exists() {
        return Err(StoreError::SchemaExists(path));
    }
    std::fs::create_dir_all(dir)?;
    let mut conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    tx.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1), ('created_at', ?2)",
        params![CURRENT_SCHEMA_VERSION.to_string(), now_utc_rfc3339()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Opens the catalog database in `dir`, failing if none is present.
pub fn open_connection(dir: &Path) -> Result<Connection, StoreError> {
    let path = db_path(dir);
    if !path.exists() {
        return Err(StoreError::SchemaMissing(path));
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommodityRow {
    pub id: i64,
    pub name: String,
    pub position: Option<i64>,
    pub cost: f64,
    pub whole_price: f64,
    pub partial_price: f64,
    pub cash_price: f64,
    pub is_exported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub id: i64,
    pub contrast: f64,
    pub brightness: f64,
    pub is_exported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub id: i64,
    pub image_id: i64,
    pub font_family: String,
    pub font_style: i64,
    pub font_size: f64,
    pub location_x: f64,
    pub location_y: f64,
    pub label_color: String,
}

const COMMODITY_COLUMNS: &str =
    "id, name, position, cost, whole_price, partial_price, cash_price, is_exported";

fn commodity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommodityRow> {
    Ok(CommodityRow {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        cost: row.get(3)?,
        whole_price: row.get(4)?,
        partial_price: row.get(5)?,
        cash_price: row.get(6)?,
        is_exported: row.get(7)?,
    })
}

/// Inserts a default commodity at the next free position (0 for the first).
pub fn insert_commodity(conn: &Connection) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO commodity (position)
         VALUES (COALESCE((SELECT MAX(position) FROM commodity), -1) + 1)",
        [],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_commodity(conn: &Connection, id: i64) -> Result<Option<CommodityRow>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {COMMODITY_COLUMNS} FROM commodity WHERE id = ?1"),
            params![id],
            commodity_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn list_commodities(conn: &Connection) -> Result<Vec<CommodityRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMODITY_COLUMNS} FROM commodity ORDER BY position"
    ))?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(commodity_from_row(row)?);
    }
    Ok(result)
}

pub fn update_commodity_fields(conn: &Connection, row: &CommodityRow) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE commodity
         SET name = ?2, cost = ?3, whole_price = ?4, partial_price = ?5,
             cash_price = ?6, is_exported = ?7
         WHERE id = ?1",
        params![
            row.id,
            row.name,
            row.cost,
            row.whole_price,
            row.partial_price,
            row.cash_price,
            row.is_exported
        ],
    )?;
    Ok(())
}

pub fn delete_commodity(conn: &Connection, id: i64) -> Result<(), StoreError> {
    conn.execute("DELETE FROM commodity WHERE id = ?1", params![id])?;
    Ok(())
}

/// Inserts a default image row; the caller owns writing the backing file.
pub fn insert_image(conn: &Connection) -> Result<i64, StoreError> {
    conn.execute("INSERT INTO image DEFAULT VALUES", [])?;
    Ok(conn.last_insert_rowid())
}

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        contrast: row.get(1)?,
        brightness: row.get(2)?,
        is_exported: row.get(3)?,
    })
}

pub fn get_image(conn: &Connection, id: i64) -> Result<Option<ImageRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, contrast, brightness, is_exported FROM image WHERE id = ?1",
            params![id],
            image_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn list_images(conn: &Connection) -> Result<Vec<ImageRow>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, contrast, brightness, is_exported FROM image ORDER BY id")?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(image_from_row(row)?);
    }
    Ok(result)
}

pub fn update_image_fields(conn: &Connection, row: &ImageRow) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE image SET contrast = ?2, brightness = ?3, is_exported = ?4 WHERE id = ?1",
        params![row.id, row.contrast, row.brightness, row.is_exported],
    )?;
    Ok(())
}

pub fn delete_image(conn: &Connection, id: i64) -> Result<(), StoreError> {
    conn.execute("DELETE FROM image WHERE id = ?1", params![id])?;
    Ok(())
}

/// The font family is explicit rather than left to the column DEFAULT: the
/// installed-family set is configurable, and a fresh row must name a family
/// the verifier will accept.
pub fn insert_image_commodity(
    conn: &Connection,
    id: i64,
    image_id: i64,
    font_family: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO image_commodity (id, image_id, font_family) VALUES (?1, ?2, ?3)",
        params![id, image_id, font_family],
    )?;
    Ok(())
}

const LABEL_COLUMNS: &str =
    "id, image_id, font_family, font_style, font_size, location_x, location_y, label_color";

fn label_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LabelRow> {
    Ok(LabelRow {
        id: row.get(0)?,
        image_id: row.get(1)?,
        font_family: row.get(2)?,
        font_style: row.get(3)?,
        font_size: row.get(4)?,
        location_x: row.get(5)?,
        location_y: row.get(6)?,
        label_color: row.get(7)?,
    })
}

pub fn get_label(conn: &Connection, id: i64) -> Result<Option<LabelRow>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {LABEL_COLUMNS} FROM image_commodity WHERE id = ?1"),
            params![id],
            label_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn labels_for_image(conn: &Connection, image_id: i64) -> Result<Vec<LabelRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LABEL_COLUMNS} FROM image_commodity WHERE image_id = ?1 ORDER BY id"
    ))?;
    let mut rows = stmt.query(params![image_id])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(label_from_row(row)?);
    }
    Ok(result)
}

pub fn update_label_fields(conn: &Connection, row: &LabelRow) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE image_commodity
         SET font_family = ?2, font_style = ?3, font_size = ?4,
             location_x = ?5, location_y = ?6, label_color = ?7
         WHERE id = ?1",
        params![
            row.id,
            row.font_family,
            row.font_style,
            row.font_size,
            row.location_x,
            row.location_y,
            row.label_color
        ],
    )?;
    Ok(())
}
