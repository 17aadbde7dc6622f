//! Saved analyses, newest first.

use std::fmt::Write as _;

use anyhow::Result;

use crate::identity::Identity;
use crate::models::{HistoryEntry, NutrientUnit, total_calories};
use crate::store::{KvStore, keys, load_json, save_json};

pub fn load(store: &(impl KvStore + ?Sized), identity: &Identity) -> Result<Vec<HistoryEntry>> {
    Ok(load_json(store, &keys::history(identity))?.unwrap_or_default())
}

/// Persist the first `limit` entries; anything after is dropped.
pub fn save(
    store: &(impl KvStore + ?Sized),
    identity: &Identity,
    entries: &[HistoryEntry],
    limit: usize,
) -> Result<Vec<HistoryEntry>> {
    let kept = entries[..entries.len().min(limit)].to_vec();
    save_json(store, &keys::history(identity), &kept)?;
    Ok(kept)
}

/// Prepend `entry` and save, evicting the oldest past `limit`.
pub fn record(
    store: &(impl KvStore + ?Sized),
    identity: &Identity,
    entry: HistoryEntry,
    limit: usize,
) -> Result<Vec<HistoryEntry>> {
    let mut entries = load(store, identity)?;
    entries.insert(0, entry);
    save(store, identity, &entries, limit)
}

pub fn clear(store: &(impl KvStore + ?Sized), identity: &Identity) -> Result<()> {
    let empty: &[HistoryEntry] = &[];
    save_json(store, &keys::history(identity), empty)
}

pub fn find(store: &(impl KvStore + ?Sized), identity: &Identity, id: i64) -> Result<Option<HistoryEntry>> {
    Ok(load(store, identity)?.into_iter().find(|e| e.id == id))
}

/// An id for a new entry: the timestamp, bumped past the newest existing id
/// when two entries land in the same millisecond.
#[must_use]
pub fn next_id(entries: &[HistoryEntry], now_millis: i64) -> i64 {
    entries
        .iter()
        .map(|e| e.id.saturating_add(1))
        .max()
        .map_or(now_millis, |next| next.max(now_millis))
}

/// Plain-text summary for pasting into a chat.
#[must_use]
pub fn share_text(entry: &HistoryEntry, unit: NutrientUnit) -> String {
    let mut text = String::from("📊 Meal nutrition analysis:\n\n");
    for dish in &entry.analysis_result {
        let _ = writeln!(text, "--- {} ---", dish.name);
        let _ = writeln!(text, "🔥 Calories: {} kcal", dish.calories);
        let _ = writeln!(text, "💪 Protein: {}", unit.display(&dish.macros.protein));
        let _ = writeln!(text, "🍞 Carbs: {}", unit.display(&dish.macros.carbohydrates));
        let _ = writeln!(text, "🥑 Fat: {}", unit.display(&dish.macros.fat));
        let _ = writeln!(text, "📝 Note: {}\n", dish.description);
    }
    let _ = write!(
        text,
        "Total: ~{} calories.",
        total_calories(&entry.analysis_result)
    );
    text
}
