//! Line codec for the durable journal.
//!
//! # Line Format
//!
//! ```text
//! sequence_time|sequence_number|source_id|message_type|payload
//! ```
//!
//! - `sequence_time`: RFC 3339 with nanosecond precision, always `Z`.
//! - `payload`: may itself contain `|`; decoding splits on the first four
//!   delimiters only and keeps the remainder verbatim.
//!
//! No field may contain a line break, and `message_type` may not contain
//! the delimiter.

use super::error::{SequencerError, SequencerResult};
use super::types::LogEntry;
use chrono::{DateTime, SecondsFormat, Utc};

/// Field delimiter.
pub const FIELD_DELIMITER: char = '|';

/// Number of fields in an encoded line.
pub const FIELD_COUNT: usize = 5;

/// Check that an entry can be written as a single line and read back
/// unchanged.
///
/// # Errors
///
/// Returns [`SequencerError::InvalidField`] naming the first offending
/// field.
pub fn validate(entry: &LogEntry) -> SequencerResult<()> {
    let message_type = entry.message_type();
    if message_type.is_empty() {
        return Err(SequencerError::InvalidField {
            field: "message_type",
            reason: "must not be empty".to_string(),
        });
    }
    if message_type.contains(FIELD_DELIMITER) || has_line_break(message_type) {
        return Err(SequencerError::InvalidField {
            field: "message_type",
            reason: format!("{message_type:?} contains a delimiter or line break"),
        });
    }
    if has_line_break(entry.payload()) {
        return Err(SequencerError::InvalidField {
            field: "payload",
            reason: "contains a line break".to_string(),
        });
    }
    Ok(())
}

/// Encode an entry as one journal line, without the trailing newline.
///
/// # Errors
///
/// Returns [`SequencerError::InvalidField`] if the entry fails
/// [`validate`].
pub fn encode(entry: &LogEntry) -> SequencerResult<String> {
    validate(entry)?;
    Ok(format!(
        "{}|{}|{}|{}|{}",
        entry
            .sequence_time()
            .to_rfc3339_opts(SecondsFormat::Nanos, true),
        entry.sequence_number(),
        entry.source_id(),
        entry.message_type(),
        entry.payload()
    ))
}

/// Decode one journal line. A trailing `\n` or `\r\n` is ignored.
///
/// # Errors
///
/// Returns [`SequencerError::MalformedEntry`] if the line has fewer than
/// five fields or a typed field does not parse.
pub fn decode(line: &str) -> SequencerResult<LogEntry> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut parts = line.splitn(FIELD_COUNT, FIELD_DELIMITER);
    let (Some(time), Some(seq), Some(source), Some(message_type), Some(payload)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        let found = line.split(FIELD_DELIMITER).count();
        return Err(SequencerError::malformed(
            line,
            format!("expected {FIELD_COUNT} fields, found {found}"),
        ));
    };

    let sequence_time = DateTime::parse_from_rfc3339(time)
        .map_err(|e| SequencerError::malformed(line, format!("sequence_time: {e}")))?
        .with_timezone(&Utc);
    let sequence_number = seq
        .parse::<u64>()
        .map_err(|e| SequencerError::malformed(line, format!("sequence_number: {e}")))?;
    let source_id = source
        .parse::<u32>()
        .map_err(|e| SequencerError::malformed(line, format!("source_id: {e}")))?;
    if message_type.is_empty() {
        return Err(SequencerError::malformed(line, "empty message_type"));
    }

    Ok(LogEntry::from_parts(
        sequence_time,
        sequence_number,
        source_id,
        message_type,
        payload,
    ))
}

#[inline]
fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}
