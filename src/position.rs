use rusqlite::{params, Connection};

use crate::db::StoreError;
use crate::domain::commodity::Commodity;

/// Clamping rule for requested positions: anything below 1 means "first",
/// anything above the current maximum means "last".
fn clamp(requested: i64, max: i64) -> i64 {
    if requested < 1 {
        0
    } else if requested > max {
        max
    } else {
        requested
    }
}

/// Moves one commodity to a new position while keeping every position in the
/// catalog unique and gapless. Runs inside one transaction.
///
/// The mover is first parked at NULL because position is UNIQUE and the
/// interval shift below would otherwise collide with its old value. The
/// shift itself goes one row at a time, from the far end of the interval
/// backward (descending when moving down, ascending when moving up), so each
/// row steps into a slot just vacated and the constraint holds mid-pass.
/// Reversing either direction or traversal order trips the constraint.
///
/// Returns (id, new_position) pairs in the order the changes were applied,
/// mover last, for event fan-out. Empty means the call was a no-op with zero
/// writes.
pub(crate) fn move_commodity(
    conn: &mut Connection,
    commodities: &mut [Commodity],
    mover_idx: usize,
    requested: i64,
) -> Result<Vec<(i64, i64)>, StoreError> {
    let old = commodities[mover_idx].position();
    let max = commodities
        .iter()
        .map(Commodity::position)
        .max()
        .unwrap_or(0);
    let new = clamp(requested, max);
    if new == old {
        return Ok(Vec::new());
    }

    let mover_id = commodities[mover_idx].id();
    let (lo, hi) = (old.min(new), old.max(new));
    let mut interval: Vec<usize> = (0..commodities.len())
        .filter(|&i| i != mover_idx)
        .filter(|&i| {
            let p = commodities[i].position();
            p >= lo && p <= hi
        })
        .collect();

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE commodity SET position = NULL WHERE id = ?1",
        params![mover_id],
    )?;

    let mut changed = Vec::new();
    if new < old {
        interval.sort_by_key(|&i| std::cmp::Reverse(commodities[i].position()));
        for i in interval {
            let target = commodities[i].position() + 1;
            tx.execute(
                "UPDATE commodity SET position = ?2 WHERE id = ?1",
                params![commodities[i].id(), target],
            )?;
            commodities[i].set_position_value(target);
            changed.push((commodities[i].id(), target));
        }
    } else {
        interval.sort_by_key(|&i| commodities[i].position());
        for i in interval {
            let target = commodities[i].position() - 1;
            tx.execute(
                "UPDATE commodity SET position = ?2 WHERE id = ?1",
                params![commodities[i].id(), target],
            )?;
            commodities[i].set_position_value(target);
            changed.push((commodities[i].id(), target));
        }
    }

    tx.execute(
        "UPDATE commodity SET position = ?2 WHERE id = ?1",
        params![mover_id, new],
    )?;
    tx.commit()?;
    commodities[mover_idx].set_position_value(new);
    changed.push((mover_id, new));
    Ok(changed)
}
