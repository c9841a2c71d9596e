//! Raw timeline markers and the metadata fragment embedded in their names.
//!
//! Marker names may carry a bracketed JSON fragment, e.g.
//! `Anthem{"tempo":"128BPM"}`. The fragment is parsed exactly once, during
//! the merge pass; downstream code only ever sees the resulting
//! [`AdditionalInfo`] map.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default tempo assumed when a song carries no parsable `tempo` entry.
pub const DEFAULT_BPM: u32 = 120;

/// A named position on the performance timeline, in bars.
///
/// The transport collaborator guarantees the marker list it hands out is
/// time-ascending; nothing in this crate re-sorts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub time: f64,
}

impl Marker {
    pub fn new(name: impl Into<String>, time: f64) -> Self {
        Self {
            name: name.into(),
            time,
        }
    }
}

/// Arbitrary key/value metadata lifted out of a marker name.
pub type AdditionalInfo = serde_json::Map<String, serde_json::Value>;

/// Extract the bracketed JSON fragment from a marker name.
///
/// Looks for the first `{` and the first `}` after it and parses the
/// inclusive substring as a JSON object. A malformed fragment is recovered
/// locally: the failure is logged and an empty map is returned. Names
/// without a bracket pair also yield an empty map.
pub fn extract_info(name: &str) -> AdditionalInfo {
    let Some(start) = name.find('{') else {
        return AdditionalInfo::new();
    };
    let Some(end) = name[start..].find('}').map(|i| start + i) else {
        return AdditionalInfo::new();
    };

    let fragment = &name[start..=end];
    match serde_json::from_str::<serde_json::Value>(fragment) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            warn!(marker = name, "metadata fragment is not a JSON object");
            AdditionalInfo::new()
        }
        Err(err) => {
            warn!(marker = name, %err, "failed to parse metadata fragment");
            AdditionalInfo::new()
        }
    }
}

/// Displayed name of a song's opening marker: everything from the first `{`
/// on is dropped, but only when a complete `{`..`}` pair is present.
pub fn display_name(name: &str) -> String {
    if name.contains('{') && name.contains('}') {
        name.split('{').next().unwrap_or_default().to_string()
    } else {
        name.to_string()
    }
}

/// Displayed name of a part cue: the two-character `> ` prefix is dropped.
pub fn part_display_name(name: &str) -> String {
    name.char_indices()
        .nth(2)
        .map(|(idx, _)| name[idx..].to_string())
        .unwrap_or_default()
}

/// Tempo in BPM from a metadata map, reading only the digits of the `tempo`
/// entry (`"128BPM"` → 128). Absent or digit-free values fall back to
/// [`DEFAULT_BPM`].
pub fn bpm_from_info(info: &AdditionalInfo) -> u32 {
    let Some(tempo) = info.get("tempo") else {
        return DEFAULT_BPM;
    };
    let raw = match tempo {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(DEFAULT_BPM)
}
