use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::{params, Connection};

use crate::config;
use crate::db::{self, StoreError};
use crate::domain::commodity::Commodity;
use crate::domain::image::CatalogImage;

/// Repacks every identifier and position to a minimal contiguous layout.
///
/// Images are ordered by the smallest position among their hosted
/// commodities (images hosting none go last, ties broken by id) and
/// renumbered to `0..M-1`. Commodities are ordered by position, except that
/// all commodities of one image stay together at the point the image is
/// first encountered; that merged order becomes both the new ids `0..N-1`
/// and the new positions.
///
/// Ids are primary keys with cascading foreign keys and positions are
/// unique, so neither can be renumbered in place: every renumbering here is
/// two-phase, first into a range above the current maximum, then down to the
/// final values. Backing files are renamed the same way after the store
/// commits; a rename failure at that point leaves stale file names behind,
/// which the next open reports as corruption.
pub(crate) fn tidy(
    conn: &mut Connection,
    dir: &Path,
    commodities: &mut [Commodity],
    images: &mut [CatalogImage],
) -> Result<(), StoreError> {
    let mut image_order: Vec<usize> = (0..images.len()).collect();
    image_order.sort_by_key(|&i| {
        let id = images[i].id();
        let min = commodities
            .iter()
            .filter(|c| c.image_id() == Some(id))
            .map(Commodity::position)
            .min();
        (min.is_none(), min.unwrap_or(0), id)
    });

    let mut by_position: Vec<usize> = (0..commodities.len()).collect();
    by_position.sort_by_key(|&i| commodities[i].position());
    let mut merged: Vec<usize> = Vec::with_capacity(commodities.len());
    let mut expanded: HashSet<i64> = HashSet::new();
    for &i in &by_position {
        match commodities[i].image_id() {
            None => merged.push(i),
            Some(image_id) if expanded.insert(image_id) => {
                let mut hosted: Vec<usize> = (0..commodities.len())
                    .filter(|&j| commodities[j].image_id() == Some(image_id))
                    .collect();
                hosted.sort_by_key(|&j| commodities[j].position());
                merged.extend(hosted);
            }
            Some(_) => {}
        }
    }

    let image_high = images.iter().map(CatalogImage::id).max().unwrap_or(-1) + 1;
    let position_high = commodities
        .iter()
        .map(Commodity::position)
        .max()
        .unwrap_or(-1)
        + 1;
    let commodity_high = commodities.iter().map(Commodity::id).max().unwrap_or(-1) + 1;

    let tx = conn.transaction()?;
    for (k, &i) in image_order.iter().enumerate() {
        tx.execute(
            "UPDATE image SET id = ?2 WHERE id = ?1",
            params![images[i].id(), image_high + k as i64],
        )?;
    }
    for k in 0..image_order.len() as i64 {
        tx.execute(
            "UPDATE image SET id = ?2 WHERE id = ?1",
            params![image_high + k, k],
        )?;
    }
    for (k, &i) in merged.iter().enumerate() {
        tx.execute(
            "UPDATE commodity SET position = ?2 WHERE id = ?1",
            params![commodities[i].id(), position_high + k as i64],
        )?;
    }
    for (k, &i) in merged.iter().enumerate() {
        tx.execute(
            "UPDATE commodity SET position = ?2 WHERE id = ?1",
            params![commodities[i].id(), k as i64],
        )?;
    }
    for (k, &i) in merged.iter().enumerate() {
        tx.execute(
            "UPDATE commodity SET id = ?2 WHERE id = ?1",
            params![commodities[i].id(), commodity_high + k as i64],
        )?;
    }
    for k in 0..merged.len() as i64 {
        tx.execute(
            "UPDATE commodity SET id = ?2 WHERE id = ?1",
            params![commodity_high + k, k],
        )?;
    }
    tx.commit()?;

    for (k, &i) in image_order.iter().enumerate() {
        rename_over(
            &db::image_file_path(dir, images[i].id()),
            &db::image_file_path(dir, image_high + k as i64),
        )?;
    }
    for k in 0..image_order.len() as i64 {
        rename_over(
            &db::image_file_path(dir, image_high + k),
            &db::image_file_path(dir, k),
        )?;
    }
    sweep_strays(dir, image_order.len() as i64)?;

    let image_map: HashMap<i64, i64> = image_order
        .iter()
        .enumerate()
        .map(|(k, &i)| (images[i].id(), k as i64))
        .collect();
    for (k, &i) in image_order.iter().enumerate() {
        images[i].set_id(k as i64);
    }
    for (k, &i) in merged.iter().enumerate() {
        commodities[i].set_id(k as i64);
        commodities[i].set_position_value(k as i64);
        if let Some(label) = commodities[i].label_mut() {
            if let Some(&new_image) = image_map.get(&label.image_id()) {
                label.remap_image_id(new_image);
            }
        }
    }
    for image in images.iter_mut() {
        let mut hosted: Vec<i64> = commodities
            .iter()
            .filter(|c| c.image_id() == Some(image.id()))
            .map(Commodity::id)
            .collect();
        hosted.sort_unstable();
        image.set_commodity_ids(hosted);
    }
    commodities.sort_by_key(Commodity::position);
    images.sort_by_key(CatalogImage::id);
    Ok(())
}

/// Rename that claims the destination, dropping whatever file sat there.
fn rename_over(from: &Path, to: &Path) -> Result<(), StoreError> {
    if to.exists() {
        std::fs::remove_file(to)?;
    }
    std::fs::rename(from, to)?;
    Ok(())
}

/// Removes files in the catalog directory that belong to no surviving image
/// and are not the database (including its WAL sidecars), the lock marker, or
/// the config file.
fn sweep_strays(dir: &Path, image_count: i64) -> Result<(), StoreError> {
    let surviving: HashSet<String> = (0..image_count)
        .map(|id| format!("{id}.jpg"))
        .collect();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let keep = name.starts_with(db::DB_FILE_NAME)
            || name == db::LOCK_FILE_NAME
            || name == config::CONFIG_FILE_NAME
            || surviving.contains(name.as_ref());
        if !keep {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
