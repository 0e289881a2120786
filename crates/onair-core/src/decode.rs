//! Schedule document decoding.
//!
//! The embedded object looks like this (irrelevant keys elided):
//!
//! ```text
//! {"navigation": ...,
//!  "schedule": {"items": [
//!     {"props": {"label": "Music", ...},
//!      "meta": {"scheduledStart": "2025-10-12T14:10:00.000Z",
//!               "scheduledEnd":   "2025-10-12T15:00:00.000Z", ...}},
//!     ...]}}
//! ```

use serde_json::Value;
use tracing::info;

use crate::error::DecodeError;
use crate::extract::START_SENTINEL;
use crate::time::TimeInstant;
use crate::window::{Interval, ScheduleWindow};

/// Category whose airings the indicator tracks.
pub const MUSIC_CATEGORY: &str = "Music";

/// Decode a complete schedule JSON document into the airings of
/// `category_label`, in document order.
///
/// Every entry must carry a string `props.label`. A matching entry with a
/// missing or malformed timestamp fails the whole decode.
pub fn decode(payload: &[u8], category_label: &str) -> Result<ScheduleWindow, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    let doc: Value = serde_json::from_str(text)?;

    let items = doc
        .get("schedule")
        .and_then(|schedule| schedule.get("items"))
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::SchemaMismatch {
            path: "schedule.items".into(),
        })?;

    let mut window = ScheduleWindow::new();
    for (index, item) in items.iter().enumerate() {
        let label = item
            .pointer("/props/label")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::SchemaMismatch {
                path: format!("schedule.items[{index}].props.label"),
            })?;
        if label != category_label {
            continue;
        }

        let start = timestamp(item, index, "scheduledStart")?;
        let end = timestamp(item, index, "scheduledEnd")?;
        let interval = Interval::new(start, end)?;
        info!(%start, %end, "{category_label} found");
        window.push(interval);
    }
    Ok(window)
}

/// Decode an extractor payload.
///
/// The start sentinel is the opening of the object it marks, so it is put
/// back in front of the payload before parsing.
pub fn decode_document(payload: &[u8], category_label: &str) -> Result<ScheduleWindow, DecodeError> {
    let mut doc = Vec::with_capacity(START_SENTINEL.len() + payload.len());
    doc.extend_from_slice(START_SENTINEL);
    doc.extend_from_slice(payload);
    decode(&doc, category_label)
}

fn timestamp(item: &Value, index: usize, key: &str) -> Result<TimeInstant, DecodeError> {
    let raw = item
        .get("meta")
        .and_then(|meta| meta.get(key))
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::SchemaMismatch {
            path: format!("schedule.items[{index}].meta.{key}"),
        })?;
    TimeInstant::parse_schedule_timestamp(raw).map_err(|reason| DecodeError::BadTimestamp {
        value: raw.to_string(),
        reason,
    })
}
