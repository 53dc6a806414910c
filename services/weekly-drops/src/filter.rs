//!
//! src/filter.rs  Oct 19th, 2026
//!
//! Release window filter. Turns noisy catalog search text into a short,
//! deduplicated list of recent tracks per artist. Nothing in here fails:
//! anything that cannot be read is dropped or treated as not recent.
//!

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::types::{PartialDate, SelectionResult, TrackCandidate, TrackId};

pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// One search hit per line:
/// 1. "Title" by Artist, Other (3:20) - Released: 2025-01-01 - ID: abc123
static CANDIDATE_LINE: Lazy<Regex> = Lazy::new(||
    Regex::new(concat!(
        r#"^[0-9]+\.\s*"([^"]+)"\s+by\s+([^(]+)\s*\([^)]+\)\s*-\s*"#,
        r"Released:\s*([0-9]{4}-[0-9]{2}-[0-9]{2}|[0-9]{4}-[0-9]{2}|[0-9]{4}|Unknown)",
        r"\s*-\s*ID:\s*([a-zA-Z0-9]+)"
    )).unwrap()
);

/// Parses every candidate line in a search payload, in line order.
/// Lines of any other shape are skipped.
pub fn parse_candidates(raw: &str) -> Vec<TrackCandidate> {
    raw.lines()
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<TrackCandidate> {
    let caps = CANDIDATE_LINE.captures(line)?;
    let title  = caps.get(1)?.as_str().trim();
    let artist = caps.get(2)?.as_str().trim();
    let token  = caps.get(3)?.as_str().trim();
    let id     = caps.get(4)?.as_str().trim();

    if title.is_empty() || artist.is_empty() {
        trace!(line, "filter.skip.empty_field");
        return None;
    }

    Some( TrackCandidate {
        title: title.to_string(),
        artist_text: artist.to_string(),
        release_date: normalize_date(token),
        release_token: token.to_string(),
        id: TrackId(id.to_string())
    })
}

/// Reads a catalog date token. Year-only pins to January 1st and
/// year-month pins to the 1st of the month. Anything else is Unknown.
pub fn normalize_date(token: &str) -> PartialDate {
    let token = token.trim();
    if token == "Unknown" || !token.is_ascii() {
        return PartialDate::Unknown;
    }

    let parsed = match token.len() {
        10 => split_ymd(token, true),
        7  => split_ymd(token, false),
        4  => digits(token).and_then(|y| NaiveDate::from_ymd_opt(y as i32, 1, 1)),
        _  => None
    };

    parsed.map(PartialDate::Known).unwrap_or(PartialDate::Unknown)
}

// token is ascii, so byte slicing is safe
fn split_ymd(token: &str, with_day: bool) -> Option<NaiveDate> {
    let bytes = token.as_bytes();
    if bytes[4] != b'-' || (with_day && bytes[7] != b'-') {
        return None;
    }
    let year  = digits(&token[0..4])?;
    let month = digits(&token[5..7])?;
    let day   = if with_day { digits(&token[8..10])? } else { 1 };
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Inclusive: a release at exactly the cutoff is recent
pub fn is_recent(date: &PartialDate, cutoff: NaiveDateTime) -> bool {
    match date.at_midnight() {
        Some(released) => released >= cutoff,
        None => false
    }
}

/// Earliest instant still considered recent, 7 days before now
pub fn cutoff_instant(now: NaiveDateTime) -> NaiveDateTime {
    cutoff_instant_with(now, DEFAULT_WINDOW_DAYS)
}

pub fn cutoff_instant_with(now: NaiveDateTime, window_days: u32) -> NaiveDateTime {
    now.checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(NaiveDateTime::MIN)
}

fn credits_artist(artist_text: &str, artist_query: &str) -> bool {
    artist_text.to_lowercase().contains(&artist_query.to_lowercase())
}

impl SelectionResult {
    ///
    /// Accepts the candidate if it is credited to the artist, recent, not
    /// already held and there is room left. Returns whether it was taken.
    ///
    pub fn offer(
        &mut self,
        candidate: TrackCandidate,
        artist_query: &str,
        cutoff: NaiveDateTime
    ) -> bool {
        if self.is_full()
            || !credits_artist(&candidate.artist_text, artist_query)
            || !is_recent(&candidate.release_date, cutoff)
            || self.contains_id(&candidate.id) {
            return false;
        }

        debug!(
            artist = artist_query,
            title = %candidate.title,
            released = %candidate.release_token,
            id = %candidate.id,
            "filter.accept"
        );
        self.tracks.push(candidate);
        true
    }

    /// Offers candidates in order until the cap is reached
    pub fn extend_from<I>(&mut self, candidates: I, artist_query: &str, cutoff: NaiveDateTime) -> usize
    where
        I: IntoIterator<Item = TrackCandidate>
    {
        let mut accepted = 0;
        for candidate in candidates {
            if self.is_full() {
                break;
            }
            if self.offer(candidate, artist_query, cutoff) {
                accepted += 1;
            }
        }
        accepted
    }
}

/// Up to three recent, distinct tracks credited to the artist, in the order
/// they were discovered. Never reordered by date.
pub fn select_for_artist<I>(candidates: I, artist_query: &str, cutoff: NaiveDateTime) ->
    SelectionResult
where
    I: IntoIterator<Item = TrackCandidate>
{
    let mut selection = SelectionResult::default();
    selection.extend_from(candidates, artist_query, cutoff);
    selection
}
