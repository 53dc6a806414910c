//!
//! src/curator.rs  Oct 19th, 2026
//!
//! Drives one run: search every artist, filter to the release window,
//! then create the playlist and add the selected tracks in a single call
//!
//!

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::CurationConfig;
use crate::errors::DropsError;
use crate::fetch::CatalogClient;
use crate::filter::{cutoff_instant_with, parse_candidates};
use crate::transport::Transport;
use crate::types::{ArtistReport, RunSummary, SelectionResult, TrackId};

/// Monday and Sunday of the week containing `day`
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (start, start + Duration::days(6))
}

/// e.g. "Weekly New Drops - Jan 06 to Jan 12, 2025"
pub fn playlist_name(day: NaiveDate) -> String {
    let (start, end) = week_bounds(day);
    format!(
        "Weekly New Drops - {} to {}",
        start.format("%b %d"),
        end.format("%b %d, %Y")
    )
}

pub fn playlist_description(day: NaiveDate, window_days: u32) -> String {
    format!(
        "Tracks released in the last {window_days} days - {}",
        day.format("%Y-%m-%d")
    )
}

pub struct Curator<T: Transport> {
    catalog: CatalogClient<T>,
    curation: CurationConfig,

    // cancels the run before anything is committed
    shutdown: CancellationToken
}

impl<T: Transport> Curator<T> {
    pub fn new(catalog: CatalogClient<T>, curation: &CurationConfig) -> Self {
        Self {
            catalog,
            curation: curation.clone(),
            shutdown: CancellationToken::new()
        }
    }

    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the whole curation and always stops the server afterwards
    pub async fn run(mut self, now: NaiveDateTime) -> Result<RunSummary, DropsError> {
        let span = info_span!("curator.run", run_id = %Uuid::new_v4());
        let result = self.curate(now).instrument(span).await;

        if let Err(e) = self.catalog.shutdown().await {
            warn!(error = %e, "curator.shutdown");
        }
        result
    }

    async fn curate(&mut self, now: NaiveDateTime) -> Result<RunSummary, DropsError> {
        let cutoff = cutoff_instant_with(now, self.curation.window_days);
        info!(
            artists = self.curation.artists.len(),
            cutoff = %cutoff,
            dry_run = self.curation.dry_run,
            "curator.start"
        );

        self.catalog.initialize().await?;

        // a track credited to several artists belongs to the first one
        let mut taken: HashSet<TrackId> = HashSet::new();
        let mut reports = Vec::with_capacity(self.curation.artists.len());
        for artist in self.curation.artists.clone() {
            let token = self.shutdown.clone();
            let found = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!(%artist, "curator.cancelled");
                    return Err(DropsError::Cancelled);
                }
                found = self.collect_artist(&artist, cutoff, now.year(), &taken) => found
            };

            // ctrl-c can take the server down before the token is seen
            let selection = match found {
                Err(e) if token.is_cancelled() => {
                    warn!(%artist, error = %e, "curator.cancelled");
                    return Err(DropsError::Cancelled);
                }
                other => other?
            };
            info!(%artist, found = selection.len(), "curator.artist");
            taken.extend(selection.ids().cloned());
            reports.push(ArtistReport { artist, selection });
        }

        if self.shutdown.is_cancelled() {
            return Err(DropsError::Cancelled);
        }

        let today = now.date();
        let mut summary = RunSummary {
            playlist_name: playlist_name(today),
            playlist_id: None,
            cutoff,
            reports,
            added: 0,
            add_confirmed: false,
            dry_run: self.curation.dry_run
        };

        if self.curation.dry_run {
            info!(selected = summary.track_ids().len(), "curator.dry_run");
            return Ok(summary);
        }

        let playlist_id = self.catalog.create_playlist(
            &summary.playlist_name,
            &playlist_description(today, self.curation.window_days),
            self.curation.public
        ).await?;
        info!(playlist = %playlist_id, name = %summary.playlist_name, "curator.playlist.created");
        summary.playlist_id = Some(playlist_id.clone());

        let ids = summary.track_ids();
        if ids.is_empty() {
            info!("curator.empty_week");
            return Ok(summary);
        }

        summary.add_confirmed = self.catalog.add_tracks(&playlist_id, &ids).await?;
        summary.added = ids.len();
        if summary.add_confirmed {
            info!(playlist = %playlist_id, added = ids.len(), "curator.tracks.added");
        } else {
            warn!(playlist = %playlist_id, sent = ids.len(), "curator.tracks.unconfirmed");
        }

        Ok(summary)
    }

    ///
    /// Every query phrasing for one artist, merged into one capped selection.
    /// Ids already selected for an earlier artist are passed over.
    ///
    async fn collect_artist(
        &mut self,
        artist: &str,
        cutoff: NaiveDateTime,
        year: i32,
        taken: &HashSet<TrackId>
    ) -> Result<SelectionResult, DropsError> {
        let payloads = self.catalog.search(artist, year).await?;

        let mut selection = SelectionResult::new(self.curation.per_artist);
        for payload in payloads {
            if selection.is_full() {
                break;
            }
            let fresh = parse_candidates(&payload)
                .into_iter()
                .filter(|c| {
                    let seen = taken.contains(&c.id);
                    if seen {
                        debug!(%artist, id = %c.id, "curator.skip.taken");
                    }
                    !seen
                });
            selection.extend_from(fresh, artist, cutoff);
        }
        Ok(selection)
    }
}
