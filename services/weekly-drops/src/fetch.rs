//!
//! src/fetch.rs  Oct 19th, 2026
//!
//! Defines methods for calling the catalog server's tools and
//! returning their unparsed text payloads
//!

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::DropsError;
use crate::transport::Transport;
use crate::types::TrackId;

pub const TOOL_SEARCH: &str = "searchSpotify";
pub const TOOL_CREATE_PLAYLIST: &str = "createPlaylist";
pub const TOOL_ADD_TRACKS: &str = "addTracksToPlaylist";

static PLAYLIST_ID: Lazy<Regex> = Lazy::new(||
    Regex::new(r"Playlist ID: ([a-zA-Z0-9]+)").unwrap()
);

/// Text of a tools/call result. A result flagged isError becomes a Tool error.
pub fn tool_text(result: &Value) -> Result<String, DropsError> {
    let texts: Vec<&str> = result.get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items.iter()
                .filter(|i| i.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                .filter_map(|i| i.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
    if is_error {
        let message = if texts.is_empty() { "tool reported an error".to_string() }
            else { texts.join("\n") };
        return Err(DropsError::Tool(message));
    }

    if texts.is_empty() {
        return Err(DropsError::Protocol("tool result has no text content".to_string()));
    }
    Ok(texts.join("\n"))
}

pub fn extract_playlist_id(text: &str) -> Option<String> {
    PLAYLIST_ID.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Query phrasings tried per artist, simplest first
pub fn search_queries(artist: &str, year: i32) -> Vec<String> {
    vec![
        format!("artist:{artist}"),
        artist.to_string(),
        format!("{artist} {year}")
    ]
}

pub struct CatalogClient<T: Transport> {
    transport: T,
    search_limit: u32
}

impl<T: Transport> CatalogClient<T> {
    pub fn new(transport: T, search_limit: u32) -> Self {
        Self { transport, search_limit }
    }

    pub async fn initialize(&mut self) -> Result<Value, DropsError> {
        let result = self.transport.initialize().await?;
        debug!(
            server = ?result.pointer("/serverInfo/name"),
            protocol = ?result.get("protocolVersion"),
            "catalog.initialized"
        );
        Ok(result)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<String, DropsError> {
        let result = self.transport.call("tools/call", json!({
            "name": name,
            "arguments": arguments
        })).await?;
        tool_text(&result)
    }

    /// tools/call searchSpotify {query, type: track, limit}
    pub async fn search_tracks(&mut self, query: &str) -> Result<String, DropsError> {
        let limit = self.search_limit;
        self.call_tool(TOOL_SEARCH, json!({
            "query": query,
            "type": "track",
            "limit": limit
        })).await
    }

    ///
    /// Runs every query phrasing for the artist and hands back the raw
    /// payloads in query order. Individual failures are logged and skipped;
    /// the last error is returned only when no query succeeded.
    ///
    pub async fn search(&mut self, artist: &str, year: i32) -> Result<Vec<String>, DropsError> {
        let mut payloads = Vec::new();
        let mut last_error = None;

        for query in search_queries(artist, year) {
            match self.search_tracks(&query).await {
                Ok(text) => {
                    debug!(%query, bytes = text.len(), "catalog.search");
                    payloads.push(text);
                }
                Err(e) => {
                    warn!(%query, error = %e, "catalog.search.failed");
                    last_error = Some(e);
                }
            }
        }

        match (payloads.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(payloads)
        }
    }

    /// tools/call createPlaylist; returns the new playlist's id
    pub async fn create_playlist(&mut self, name: &str, description: &str, public: bool) ->
        Result<String, DropsError> {
        let text = self.call_tool(TOOL_CREATE_PLAYLIST, json!({
            "name": name,
            "description": description,
            "public": public
        })).await?;

        extract_playlist_id(&text).ok_or_else(|| DropsError::Protocol(
            format!("no playlist id in createPlaylist response: {text}")
        ))
    }

    /// tools/call addTracksToPlaylist; true when the server confirms
    pub async fn add_tracks(&mut self, playlist_id: &str, ids: &[TrackId]) ->
        Result<bool, DropsError> {
        let track_ids: Vec<&str> = ids.iter().map(TrackId::as_str).collect();
        let text = self.call_tool(TOOL_ADD_TRACKS, json!({
            "playlistId": playlist_id,
            "trackIds": track_ids
        })).await?;
        Ok(text.contains("Successfully added"))
    }

    pub async fn shutdown(&mut self) -> Result<(), DropsError> {
        self.transport.shutdown().await?;
        Ok(())
    }
}
