//!
//! src/report.rs  Oct 19th, 2026
//!
//! Console report for a run. Everything here renders to a String so the
//! layout can be checked without a terminal; the print_* wrappers write
//! to stdout
//!

use std::path::Path;

use chrono::NaiveDateTime;

use crate::types::RunSummary;

const RULE: &str = "==================================================";

fn join(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn render_banner(artists: &[String], cutoff: NaiveDateTime, window_days: u32, dry_run: bool) ->
    String {
    let mut lines = vec![
        "Weekly New Drops Playlist Creator".to_string(),
        RULE.to_string(),
        format!("Searching for tracks by {} artists:", artists.len()),
    ];
    lines.extend(artists.iter().map(|a| format!("   - {a}")));
    lines.push(format!(
        "\nLooking for tracks released after {} (last {window_days} days)",
        cutoff.format("%Y-%m-%d")
    ));
    if dry_run {
        lines.push("Dry run: the playlist will not be created or changed".to_string());
    }
    join(lines)
}

///
/// Per-artist results, then the tracks sent to the playlist. A track
/// credited to several artists is listed under the first of them only.
///
pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec![match &summary.playlist_id {
        Some(id) => format!("Playlist: {} (ID: {id})", summary.playlist_name),
        None => format!("Playlist: {} (not created)", summary.playlist_name)
    }];

    for report in &summary.reports {
        if report.selection.is_empty() {
            lines.push(format!("\n{}: no recent tracks found", report.artist));
            continue;
        }
        lines.push(format!("\n{}: {} recent track(s)", report.artist, report.selection.len()));
        lines.extend(report.selection.tracks().iter().map(|t|
            format!("   \"{}\" (Released: {})", t.title, t.release_token)
        ));
    }

    let selected: Vec<_> = summary.selected().collect();
    if selected.is_empty() {
        lines.push("\nNo tracks released in the window were found.".to_string());
        lines.push("Artists don't release new music every week.".to_string());
        if summary.playlist_id.is_some() {
            lines.push("The empty playlist was created and is ready for next week.".to_string());
        }
        return join(lines);
    }

    lines.push(if summary.dry_run {
        format!("\nWould add {} track(s):", selected.len())
    } else if summary.add_confirmed {
        format!("\nAdded {} track(s) to '{}':", summary.added, summary.playlist_name)
    } else {
        format!(
            "\nSent {} track(s) to '{}', but the server did not confirm the add:",
            summary.added,
            summary.playlist_name
        )
    });
    lines.extend(selected.iter().map(|t|
        format!("   \"{}\" by {} (Released: {})", t.title, t.artist_text, t.release_token)
    ));
    join(lines)
}

/// Crontab line for Monday 09:00, run from `dir`
pub fn cron_line(dir: &Path, binary: &str) -> String {
    format!("0 9 * * 1 cd {} && {binary}", dir.display())
}

pub fn render_schedule_help(dir: &Path, binary: &str) -> String {
    join(vec![
        format!("\n{RULE}"),
        "WEEKLY AUTOMATION SETUP".to_string(),
        RULE.to_string(),
        "\nTo run this automatically every week:".to_string(),
        "\n1. Open a terminal and run: crontab -e".to_string(),
        "2. Add this line to run every Monday at 9 AM:".to_string(),
        format!("   {}", cron_line(dir, binary)),
        "\n3. Save and exit".to_string(),
        format!("\nManual run: {binary}"),
    ])
}

pub fn print_banner(artists: &[String], cutoff: NaiveDateTime, window_days: u32, dry_run: bool) {
    println!("{}", render_banner(artists, cutoff, window_days, dry_run));
}

pub fn print_summary(summary: &RunSummary) {
    print!("{}", render_summary(summary));
}

pub fn print_schedule_help(dir: &Path, binary: &str) {
    print!("{}", render_schedule_help(dir, binary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::types::{ArtistReport, PartialDate, SelectionResult, TrackCandidate, TrackId};

    fn cutoff() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 3).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn track(title: &str, artist: &str, id: &str) -> TrackCandidate {
        TrackCandidate {
            title: title.to_string(),
            artist_text: artist.to_string(),
            release_date: PartialDate::Known(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()),
            release_token: "2025-01-08".to_string(),
            id: TrackId(id.to_string())
        }
    }

    fn summary(tracks: Vec<TrackCandidate>, dry_run: bool) -> RunSummary {
        let mut selection = SelectionResult::new(3);
        for t in tracks {
            selection.offer(t, "Future", cutoff());
        }
        RunSummary {
            playlist_name: "Weekly New Drops - Jan 06 to Jan 12, 2025".to_string(),
            playlist_id: if dry_run { None } else { Some("pl1".to_string()) },
            cutoff: cutoff(),
            reports: vec![
                ArtistReport { artist: "Future".to_string(), selection },
                ArtistReport { artist: "4batz".to_string(), selection: SelectionResult::new(3) },
            ],
            added: 0,
            add_confirmed: false,
            dry_run
        }
    }

    #[test]
    fn test_banner_lists_artists_and_cutoff() {
        let artists = vec!["Future".to_string(), "4batz".to_string()];
        let out = render_banner(&artists, cutoff(), 7, false);
        assert!(out.contains("by 2 artists"));
        assert!(out.contains("   - 4batz"));
        assert!(out.contains("released after 2025-01-03 (last 7 days)"));
        assert!(!out.contains("Dry run"));
    }

    #[test]
    fn test_summary_lists_added_tracks() {
        let mut s = summary(vec![track("Fresh One", "Future", "f1")], false);
        s.added = 1;
        s.add_confirmed = true;
        let out = render_summary(&s);
        assert!(out.contains("Playlist: Weekly New Drops - Jan 06 to Jan 12, 2025 (ID: pl1)"));
        assert!(out.contains("   \"Fresh One\" (Released: 2025-01-08)"));
        assert!(out.contains("4batz: no recent tracks found"));
        assert!(out.contains("Added 1 track(s)"));
        assert!(out.contains("\"Fresh One\" by Future (Released: 2025-01-08)"));
    }

    #[test]
    fn test_summary_unconfirmed_and_dry_run() {
        let mut s = summary(vec![track("Fresh One", "Future", "f1")], false);
        s.added = 1;
        assert!(render_summary(&s).contains("did not confirm"));

        let dry = summary(vec![track("Fresh One", "Future", "f1")], true);
        let out = render_summary(&dry);
        assert!(out.contains("(not created)"));
        assert!(out.contains("Would add 1 track(s)"));
    }

    #[test]
    fn test_summary_empty_week() {
        let out = render_summary(&summary(Vec::new(), false));
        assert!(out.contains("No tracks released in the window"));
        assert!(out.contains("empty playlist was created"));

        let dry = render_summary(&summary(Vec::new(), true));
        assert!(!dry.contains("empty playlist was created"));
    }

    #[test]
    fn test_cron_line() {
        let line = cron_line(Path::new("/opt/drops"), "weekly-drops");
        assert_eq!(line, "0 9 * * 1 cd /opt/drops && weekly-drops");
        assert!(render_schedule_help(Path::new("/opt/drops"), "weekly-drops").contains(&line));
    }
}
