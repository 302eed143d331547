//! Deterministic completion of a single day's pivot to 24 hourly columns,
//! followed by alignment to the station registry.

use crate::stations::registry::StationRegistry;
use crate::types::day_matrix::{DayMatrix, HourlyPivot, HOURS_PER_DAY};
use log::debug;

/// Fills the hour columns missing from `pivot`.
///
/// * No columns at all: every hour of every station becomes `0.0`.
/// * Otherwise each missing hour, in ascending order, copies a neighbour:
///   hour 0 copies the lowest hour present, any later hour copies the hour
///   before it (already filled if it was missing too).
///
/// The returned pivot has exactly the columns `0..24`, in order. Cells that
/// were empty in a copied column stay empty.
pub fn fill_missing_hours(mut pivot: HourlyPivot) -> HourlyPivot {
    let height = pivot.stations.len();
    pivot
        .columns
        .retain(|hour, _| (*hour as usize) < HOURS_PER_DAY);

    if pivot.columns.is_empty() {
        debug!("{} on {}: all hours missing", pivot.sensor, pivot.date);
        for hour in 0..HOURS_PER_DAY as u32 {
            pivot.columns.insert(hour, vec![Some(0.0); height]);
        }
        return pivot;
    }

    let missing: Vec<u32> = (0..HOURS_PER_DAY as u32)
        .filter(|hour| !pivot.columns.contains_key(hour))
        .collect();
    if !missing.is_empty() {
        debug!(
            "{} on {}: filling hours {:?}",
            pivot.sensor, pivot.date, missing
        );
    }

    for hour in missing {
        let source = if hour == 0 {
            pivot.columns.values().next().cloned()
        } else {
            pivot.columns.get(&(hour - 1)).cloned()
        };
        if let Some(column) = source {
            pivot.columns.insert(hour, column);
        }
    }
    pivot
}

/// Turns sparse per-day pivots into dense, registry-aligned [`DayMatrix`]es.
#[derive(Debug, Clone, Copy)]
pub struct GapFiller<'a> {
    registry: &'a StationRegistry,
}

impl<'a> GapFiller<'a> {
    pub fn new(registry: &'a StationRegistry) -> Self {
        Self { registry }
    }

    /// Fills missing hours and left-joins the result onto the registry.
    ///
    /// Registered stations that never reported get a row of zeros, cells
    /// left empty after filling become `0.0`, and stations not in the
    /// registry are dropped.
    pub fn fill(&self, pivot: HourlyPivot) -> DayMatrix {
        let pivot = fill_missing_hours(pivot);
        let mut rows = vec![[0.0; HOURS_PER_DAY]; self.registry.len()];

        let mut unregistered = 0usize;
        for (pivot_idx, station) in pivot.stations.iter().enumerate() {
            let Some(row) = self.registry.position(station) else {
                unregistered += 1;
                continue;
            };
            for (hour, column) in &pivot.columns {
                rows[row][*hour as usize] = column[pivot_idx].unwrap_or(0.0);
            }
        }
        if unregistered > 0 {
            debug!(
                "{} on {}: dropped {} unregistered stations",
                pivot.sensor, pivot.date, unregistered
            );
        }

        DayMatrix::new(pivot.date, pivot.sensor, rows)
    }
}
