//! Schedule grid: the dense slot x day view of a solver solution.
//!
//! Storage is sparse (only cells with at least one entry are kept) but every
//! `(slot, day)` inside `[0, slot_count) x [0, day_count)` is addressable via
//! [`ScheduleGrid::cell`]. Filtering and rendering never mutate the grid, so
//! switching the entity filter does not require decoding the solution again.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use tracing::debug;

use crate::decode::{Assignment, LABEL_SEPARATOR, decode};

/// Solution values strictly above this count as "assigned".
pub const DEFAULT_ACTIVATION_THRESHOLD: f64 = 0.5;

/// Filter label that keeps every entry.
pub const FILTER_ALL: &str = "ALL";

/// Text shown for a cell with no entries.
pub const REST_LABEL: &str = "rest";

/// One grid entry: the entities of one decoded key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEntry {
    pub entities: Vec<String>,
}

impl CellEntry {
    pub fn label(&self) -> String {
        self.entities.join(LABEL_SEPARATOR)
    }

    fn matches(&self, filter: &str) -> bool {
        filter == FILTER_ALL || self.entities.iter().any(|e| e == filter)
    }
}

impl From<Assignment> for CellEntry {
    fn from(a: Assignment) -> Self {
        Self {
            entities: a.entities,
        }
    }
}

/// Slot -> day -> entries, plus the inferred dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleGrid {
    cells: BTreeMap<u32, BTreeMap<u32, Vec<CellEntry>>>,
    slot_count: u32,
    day_count: u32,
    candidates: BTreeSet<String>,
}

/// Counters from one [`ScheduleGrid::build`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    /// Entries whose value exceeded the threshold.
    pub active: usize,
    /// Active entries whose key could not be decoded.
    pub dropped: usize,
}

impl ScheduleGrid {
    /// Build a grid from a solver solution map.
    ///
    /// Only entries with `value > threshold` are kept, so NaN never counts.
    /// Keys that fail to decode are dropped without affecting the rest of the
    /// grid.
    pub fn build<'a, I>(solution: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        Self::build_with_stats(solution, threshold).0
    }

    /// Like [`Self::build`], also reporting how many keys were dropped.
    pub fn build_with_stats<'a, I>(solution: I, threshold: f64) -> (Self, BuildStats)
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        let mut grid = Self::default();
        let mut stats = BuildStats::default();
        let mut max_slot = 0u32;
        let mut max_day = 0u32;

        for (key, _) in solution.into_iter().filter(|(_, value)| **value > threshold) {
            stats.active += 1;

            let Some(assignment) = decode(key).assignment() else {
                debug!(key = %key, "dropping undecodable solution key");
                stats.dropped += 1;
                continue;
            };

            max_slot = max_slot.max(assignment.slot);
            max_day = max_day.max(assignment.day);
            grid.candidates
                .extend(assignment.entities.iter().cloned());
            grid.cells
                .entry(assignment.slot)
                .or_default()
                .entry(assignment.day)
                .or_default()
                .push(assignment.into());
        }

        grid.slot_count = max_slot.saturating_add(1);
        grid.day_count = max_day.saturating_add(1);
        (grid, stats)
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn day_count(&self) -> u32 {
        self.day_count
    }

    /// Entries at `(slot, day)`; empty for any unassigned cell.
    pub fn cell(&self, slot: u32, day: u32) -> &[CellEntry] {
        self.cells
            .get(&slot)
            .and_then(|days| days.get(&day))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every individual entity seen in the solution, sorted and unique.
    pub fn filter_candidates(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    /// Total number of entries across all cells.
    pub fn entry_count(&self) -> usize {
        self.cells
            .values()
            .flat_map(|days| days.values())
            .map(Vec::len)
            .sum()
    }

    /// A copy keeping only entries that involve `label`. [`FILTER_ALL`] is
    /// the identity. Dimensions and filter candidates are preserved.
    pub fn filter(&self, label: &str) -> Self {
        if label == FILTER_ALL {
            return self.clone();
        }
        let cells = self
            .cells
            .iter()
            .map(|(slot, days)| {
                let days = days
                    .iter()
                    .map(|(day, entries)| {
                        let kept: Vec<CellEntry> =
                            entries.iter().filter(|e| e.matches(label)).cloned().collect();
                        (*day, kept)
                    })
                    .filter(|(_, kept)| !kept.is_empty())
                    .collect::<BTreeMap<_, _>>();
                (*slot, days)
            })
            .filter(|(_, days)| !days.is_empty())
            .collect();

        Self {
            cells,
            slot_count: self.slot_count,
            day_count: self.day_count,
            candidates: self.candidates.clone(),
        }
    }

    /// Render the grid for display under `filter`.
    pub fn render(&self, filter: &str) -> RenderedGrid {
        let rows = (0..self.slot_count)
            .map(|slot| {
                (0..self.day_count)
                    .map(|day| {
                        let visible: Vec<String> = self
                            .cell(slot, day)
                            .iter()
                            .filter(|e| e.matches(filter))
                            .map(CellEntry::label)
                            .collect();
                        if visible.is_empty() {
                            RenderedCell {
                                text: REST_LABEL.to_string(),
                                active: false,
                            }
                        } else {
                            RenderedCell {
                                text: visible.join(LABEL_SEPARATOR),
                                active: true,
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        RenderedGrid {
            day_count: self.day_count,
            rows,
        }
    }
}

/// One displayed cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCell {
    pub text: String,
    /// `false` for a rest cell.
    pub active: bool,
}

/// A grid ready for display: one row per slot, one cell per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGrid {
    pub day_count: u32,
    pub rows: Vec<Vec<RenderedCell>>,
}

impl RenderedGrid {
    /// Plain-text table with a `Slot \ Day` header row.
    pub fn to_text_table(&self) -> String {
        let mut header = vec!["Slot \\ Day".to_string()];
        header.extend((1..=self.day_count).map(|d| format!("Day {d}")));

        let mut table: Vec<Vec<String>> = vec![header];
        for (slot, row) in self.rows.iter().enumerate() {
            let mut line = vec![format!("Slot {slot}")];
            line.extend(row.iter().map(|c| c.text.clone()));
            table.push(line);
        }

        let columns = table.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|col| {
                table
                    .iter()
                    .filter_map(|line| line.get(col))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for line in &table {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            let _ = writeln!(out, "{}", cells.join(" | ").trim_end());
        }
        out
    }
}

/// Deduplicate relaxed-constraint texts, keeping first-seen order.
pub fn dedup_relaxed(relaxed: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    relaxed
        .iter()
        .filter(|text| seen.insert(text.as_str()))
        .cloned()
        .collect()
}
