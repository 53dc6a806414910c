//!
//! src/config.rs  Oct 19th, 2026
//!
//! Loads .env and the environment, applies command line overrides and
//! returns the immutable configuration for one run
//!

use std::path::{Path, PathBuf};
use std::time;

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;

use crate::errors::DropsError;
use crate::filter::DEFAULT_WINDOW_DAYS;
use crate::types::DEFAULT_PER_ARTIST_CAP;

/// Constants for the catalog server process
pub const SERVER_COMMAND: &str = "node";
pub const SERVER_PATH: &str = "build/index.js";
pub const REQUEST_TIMEOUT: u64 = 30000;
pub const SHUTDOWN_GRACE: u64 = 5000;

/// Spotify caps search pages at 50
pub const SEARCH_LIMIT: u32 = 50;
pub const SEARCH_LIMIT_MAX: u32 = 50;

pub const DEFAULT_ARTISTS: [&str; 10] = [
    "Lil Tecca",
    "Playboi Carti",
    "Travis Scott",
    "Don Toliver",
    "Lil Uzi Vert",
    "Future",
    "Metro Boomin",
    "21 Savage",
    "PlaqueBoyMax",
    "4batz"
];

#[derive(Parser, Debug, Clone)]
#[command(name = "weekly-drops")]
#[command(about = "Build this week's playlist of new releases by your artists")]
#[command(version)]
pub struct Cli {
    /// Artist to follow (repeatable, or comma-separated in the env var)
    #[arg(long = "artist", env = "WEEKLY_DROPS_ARTISTS", value_delimiter = ',')]
    pub artists: Vec<String>,

    /// File with one artist per line; '#' starts a comment
    #[arg(long, env = "WEEKLY_DROPS_ARTISTS_FILE")]
    pub artists_file: Option<PathBuf>,

    /// Program that runs the catalog server
    #[arg(long, env = "MCP_SERVER_COMMAND", default_value = SERVER_COMMAND)]
    pub server_command: String,

    /// Server entry point handed to the server command
    #[arg(long, env = "MCP_SERVER_PATH", default_value = SERVER_PATH)]
    pub server_path: PathBuf,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "MCP_REQUEST_TIMEOUT_MS", default_value_t = REQUEST_TIMEOUT)]
    pub request_timeout_ms: u64,

    /// Search and report only; the playlist is not touched
    #[arg(long)]
    pub dry_run: bool,

    /// Create the playlist as public (private by default)
    #[arg(long, env = "WEEKLY_DROPS_PUBLIC")]
    pub public: bool,

    /// Wall clock to run against, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[arg(long, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,

    #[arg(long, env = "WEEKLY_DROPS_WINDOW_DAYS", default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: u32,

    #[arg(long, env = "WEEKLY_DROPS_PER_ARTIST", default_value_t = DEFAULT_PER_ARTIST_CAP)]
    pub per_artist: usize,

    #[arg(long, env = "WEEKLY_DROPS_SEARCH_LIMIT", default_value_t = SEARCH_LIMIT)]
    pub search_limit: u32,

    /// Emit logs as JSON lines
    #[arg(long, env = "WEEKLY_DROPS_LOG_JSON")]
    pub log_json: bool
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, got {s}"))
}

/// Trims names and drops blanks and repeats (case-insensitive)
pub fn parse_artist_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>
{
    let mut artists: Vec<String> = Vec::new();
    for item in items {
        let name = item.as_ref().trim();
        if name.is_empty() || artists.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            continue;
        }
        artists.push(name.to_string());
    }
    artists
}

pub fn read_artists_file(path: &Path) -> Result<Vec<String>, DropsError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DropsError::Config(
            format!("artists file {}: {e}", path.display())
        ))?;

    let lines = contents.lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty());
    Ok(parse_artist_list(lines))
}

///
/// Configuration for the catalog server child process
///
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub server_path: Option<PathBuf>,  // checked before spawning
    pub request_timeout: time::Duration,
    pub shutdown_grace: time::Duration
}

impl ServerConfig {
    pub fn ensure_built(&self) -> Result<(), DropsError> {
        match &self.server_path {
            Some(path) if !path.exists() => Err(DropsError::Config(format!(
                "catalog server not found at {}; build it first (npm run build)",
                path.display()
            ))),
            _ => Ok(())
        }
    }
}

fn build_server(cli: &Cli) -> Result<ServerConfig, DropsError> {
    if cli.server_command.trim().is_empty() {
        return Err(DropsError::Config("server command is empty".to_string()));
    }
    if cli.request_timeout_ms == 0 {
        return Err(DropsError::Config("request timeout must be positive".to_string()));
    }

    Ok( ServerConfig {
        command: cli.server_command.clone(),
        args: vec![cli.server_path.to_string_lossy().into_owned()],
        server_path: Some(cli.server_path.clone()),
        request_timeout: time::Duration::from_millis(cli.request_timeout_ms),
        shutdown_grace: time::Duration::from_millis(SHUTDOWN_GRACE)
    })
}

///
/// What to look for and how much of it to keep
///
#[derive(Debug, Clone)]
pub struct CurationConfig {
    pub artists: Vec<String>,
    pub window_days: u32,
    pub per_artist: usize,
    pub search_limit: u32,
    pub public: bool,
    pub dry_run: bool,
    pub now: Option<NaiveDateTime>   // None means the local wall clock
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            artists: DEFAULT_ARTISTS.iter().map(|a| a.to_string()).collect(),
            window_days: DEFAULT_WINDOW_DAYS,
            per_artist: DEFAULT_PER_ARTIST_CAP,
            search_limit: SEARCH_LIMIT,
            public: false,
            dry_run: false,
            now: None
        }
    }
}

fn build_curation(cli: &Cli) -> Result<CurationConfig, DropsError> {
    let mut artists = parse_artist_list(&cli.artists);
    if artists.is_empty() {
        if let Some(path) = &cli.artists_file {
            artists = read_artists_file(path)?;
            if artists.is_empty() {
                return Err(DropsError::Config(
                    format!("artists file {} lists no artists", path.display())
                ));
            }
        }
    }
    if artists.is_empty() {
        artists = DEFAULT_ARTISTS.iter().map(|a| a.to_string()).collect();
    }

    if cli.per_artist == 0 {
        return Err(DropsError::Config("per-artist cap must be at least 1".to_string()));
    }
    if cli.search_limit == 0 || cli.search_limit > SEARCH_LIMIT_MAX {
        return Err(DropsError::Config(
            format!("search limit must be within 1..={SEARCH_LIMIT_MAX}")
        ));
    }

    Ok( CurationConfig {
        artists,
        window_days: cli.window_days,
        per_artist: cli.per_artist,
        search_limit: cli.search_limit,
        public: cli.public,
        dry_run: cli.dry_run,
        now: cli.now
    })
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "warn,weekly_drops=info".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true
        }
    }
}

///
/// AppConfig which holds everything one run needs
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub curation: CurationConfig,
    pub logging: LoggingConfig
}

pub fn from_cli(cli: &Cli) -> Result<AppConfig, DropsError> {
    let server   = build_server(cli)?;
    let curation = build_curation(cli)?;
    let mut logging = LoggingConfig::default();
    if cli.log_json {
        logging.format = LogFormat::Json;
        logging.with_ansi = false;
        logging.include_file_line = true;
    }

    Ok( AppConfig { server, curation, logging } )
}

///
/// Read .env, the environment and the command line once at program start.
///
pub fn load_config() -> Result<AppConfig, DropsError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    from_cli(&cli)
}
