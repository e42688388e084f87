//! Feed timestamp parsing.
//!
//! The feed carries two textual layouts: digital readings use a dense layout
//! with a millisecond fraction (`2023-5-10 14:30:00.500`), analog readings the
//! same layout without the fraction. Month, day, hour, minute and second may
//! be written with one or two digits. No timezone is assumed beyond the
//! literal text, so everything parses to a `NaiveDateTime`.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Layout of digital reading timestamps (millisecond fraction).
const DENSE: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Layout of analog reading timestamps (no fraction; trailing text rejected).
const PLAIN: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
#[error("invalid timestamp {text:?}: {source}")]
pub struct TimeParseError {
    text: String,
    source: chrono::ParseError,
}

/// Parses a digital reading timestamp (`YYYY-M-D H:M:S.mmm`).
pub fn parse_dense(text: &str) -> Result<NaiveDateTime, TimeParseError> {
    parse(text, DENSE)
}

/// Parses an analog reading timestamp (`YYYY-M-D H:M:S`).
pub fn parse_plain(text: &str) -> Result<NaiveDateTime, TimeParseError> {
    parse(text, PLAIN)
}

fn parse(text: &str, layout: &str) -> Result<NaiveDateTime, TimeParseError> {
    NaiveDateTime::parse_from_str(text, layout).map_err(|source| TimeParseError {
        text: text.to_string(),
        source,
    })
}
