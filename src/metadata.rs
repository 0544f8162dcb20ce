//! Combined metadata line parser
//!
//! Apple Music shows artist and album on a single line below the title,
//! separated by an em-dash: `Artist — Album`. Classical tracks carry a
//! composer credit in front: `By Composer — Performer — Album`.
//!
//! This module splits that line back into structured fields. It is a pure
//! function of its input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::MetadataError;

/// Segment delimiter: an em-dash surrounded by single spaces.
pub const DELIMITER: &str = " \u{2014} ";

/// Length of the `By ` prefix stripped from the composer segment.
const COMPOSER_PREFIX_LEN: usize = 3;

/// Detects a composer-credited line: `By`, whitespace, then text up to the first em-dash.
static COMPOSER_PERFORMER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^By\s.*?\s\u{2014}").unwrap());

/// Structured fields recovered from a combined metadata line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    /// Artist to credit: the plain artist, or composer/performer per preference
    pub artist: String,

    /// Album name (falls back to the artist when the line has no delimiter)
    pub album: String,

    /// Performer, only present on composer-credited lines
    pub performer: Option<String>,
}

/// Parse a combined `artist — album` or `By composer — performer — album` line.
///
/// With `prefer_composer_as_artist` set, composer-credited lines report the
/// composer as the artist; otherwise the performer is used.
pub fn parse(raw: &str, prefer_composer_as_artist: bool) -> Result<ParsedMetadata, MetadataError> {
    let parts: Vec<&str> = raw.split(DELIMITER).collect();

    if COMPOSER_PERFORMER_RE.is_match(raw) {
        let [composer, performer, album, ..] = parts.as_slice() else {
            return Err(MetadataError::MissingComposerSegments {
                raw: raw.to_string(),
                found: parts.len(),
            });
        };

        let composer = strip_composer_prefix(composer);
        let artist = if prefer_composer_as_artist {
            composer.to_string()
        } else {
            (*performer).to_string()
        };

        return Ok(ParsedMetadata {
            artist,
            album: (*album).to_string(),
            performer: Some((*performer).to_string()),
        });
    }

    let artist = parts[0];
    let album = parts.get(1).copied().unwrap_or(artist);

    Ok(ParsedMetadata {
        artist: artist.to_string(),
        album: album.to_string(),
        performer: None,
    })
}

/// Drop the leading `By ` (three characters, whatever the whitespace was).
fn strip_composer_prefix(segment: &str) -> &str {
    segment
        .char_indices()
        .nth(COMPOSER_PREFIX_LEN)
        .map_or("", |(idx, _)| &segment[idx..])
}
