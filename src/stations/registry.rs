//! The fixed, ordered set of station identifiers that every day matrix is
//! aligned to.

use crate::stations::error::StationRegistryError;
use crate::types::station::Station;
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Ordered list of known station ids.
///
/// The registry is built once, never mutated, and shared read-only (usually
/// behind an `Arc`) by every loader and assembler. A station's position in
/// the registry is its row index in every [`crate::DayMatrix`] and in the
/// station axis of every [`crate::TrainingExample`].
#[derive(Debug, Clone, PartialEq)]
pub struct StationRegistry {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

/// Registry files may list bare ids or full station objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryEntry {
    Id(String),
    Station(Station),
}

impl RegistryEntry {
    fn into_id(self) -> String {
        match self {
            RegistryEntry::Id(id) => id,
            RegistryEntry::Station(station) => station.id,
        }
    }
}

impl StationRegistry {
    /// Builds a registry from ids in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`StationRegistryError::Empty`] for an empty list,
    /// [`StationRegistryError::BlankStation`] for an empty id and
    /// [`StationRegistryError::DuplicateStation`] when an id repeats.
    pub fn new<I, S>(ids: I) -> Result<Self, StationRegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for (position, id) in ids.into_iter().enumerate() {
            let id: String = id.into();
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(StationRegistryError::BlankStation(position));
            }
            if index.insert(id.clone(), ordered.len()).is_some() {
                return Err(StationRegistryError::DuplicateStation(id));
            }
            ordered.push(id);
        }
        if ordered.is_empty() {
            return Err(StationRegistryError::Empty);
        }
        Ok(Self {
            ids: ordered,
            index,
        })
    }

    pub fn from_stations(stations: &[Station]) -> Result<Self, StationRegistryError> {
        Self::new(stations.iter().map(|s| s.id.as_str()))
    }

    /// Parses a JSON array of station ids (`["S50", "S107"]`) or of station
    /// objects with an `id` field.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, StationRegistryError> {
        let entries: Vec<RegistryEntry> = serde_json::from_slice(bytes)?;
        Self::new(entries.into_iter().map(RegistryEntry::into_id))
    }

    /// Loads the registry from a JSON file. See [`StationRegistry::from_json_slice`].
    pub async fn load(path: &Path) -> Result<Self, StationRegistryError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StationRegistryError::RegistryRead(path.to_path_buf(), e))?;
        let registry = Self::from_json_slice(&bytes)?;
        info!(
            "Loaded {} stations from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Row index of `station_id`, if registered.
    pub fn position(&self, station_id: &str) -> Option<usize> {
        self.index.get(station_id).copied()
    }

    pub fn contains(&self, station_id: &str) -> bool {
        self.index.contains_key(station_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
