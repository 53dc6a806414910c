//!
//! src/types.rs  Oct 19th, 2026
//!
//! Domain records shared by the filter, the catalog client and the report
//!

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Opaque catalog identifier, unique per track version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Release date as precise as the catalog reported it. Coarse values are
/// pinned to the first day of their period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartialDate {
    Known(NaiveDate),
    Unknown
}

impl PartialDate {
    /// Midnight of the pinned day, None when unknown
    pub fn at_midnight(&self) -> Option<NaiveDateTime> {
        match self {
            PartialDate::Known(d) => d.and_hms_opt(0, 0, 0),
            PartialDate::Unknown  => None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCandidate {
    pub title: String,
    pub artist_text: String,      // may list collaborators
    pub release_date: PartialDate,
    pub release_token: String,    // date as printed, for reporting
    pub id: TrackId
}

pub const DEFAULT_PER_ARTIST_CAP: usize = 3;

///
/// Per-artist accumulator of accepted candidates, in discovery order and
/// never longer than its cap. Acceptance rules live in src/filter.rs
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub(crate) tracks: Vec<TrackCandidate>,
    pub(crate) cap: usize
}

impl SelectionResult {
    pub fn new(cap: usize) -> Self {
        Self { tracks: Vec::with_capacity(cap), cap }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tracks.len() >= self.cap
    }

    pub fn tracks(&self) -> &[TrackCandidate] {
        &self.tracks
    }

    pub fn contains_id(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.iter().map(|t| &t.id)
    }
}

impl Default for SelectionResult {
    fn default() -> Self {
        Self::new(DEFAULT_PER_ARTIST_CAP)
    }
}

/// Outcome for a single configured artist
#[derive(Debug, Clone)]
pub struct ArtistReport {
    pub artist: String,
    pub selection: SelectionResult
}

/// Everything main needs to print once the run is over
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub playlist_name: String,
    pub playlist_id: Option<String>,
    pub cutoff: NaiveDateTime,
    pub reports: Vec<ArtistReport>,
    pub added: usize,
    pub add_confirmed: bool,
    pub dry_run: bool
}

impl RunSummary {
    /// Flat id list in artist order, then discovery order
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.reports.iter()
            .flat_map(|r| r.selection.ids().cloned())
            .collect()
    }

    pub fn selected(&self) -> impl Iterator<Item = &TrackCandidate> {
        self.reports.iter().flat_map(|r| r.selection.tracks().iter())
    }
}
