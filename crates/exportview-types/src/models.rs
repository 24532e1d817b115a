use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// One message from an export. Immutable once it has been folded into a
/// channel bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Unix seconds with a fractional part, kept as text. The backend sends
    /// either a string or a bare number depending on where it found the
    /// timestamp, and `""` when it found none.
    #[serde(default, deserialize_with = "ts_from_wire")]
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub attachments: Vec<Attachment>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub reactions: Vec<Reaction>,
    #[serde(
        default,
        deserialize_with = "optional_ts_from_wire",
        skip_serializing_if = "Option::is_none"
    )]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Parse `ts` into a UTC datetime. Unix seconds are the usual form;
    /// manifests that carry an RFC 3339 timestamp are passed through as is.
    /// `None` when the backend had no timestamp or sent neither form.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let ts = self.ts.trim();
        match ts.parse::<f64>() {
            Ok(secs) if secs.is_finite() => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
            }
            Ok(_) => None,
            Err(_) => DateTime::parse_from_rfc3339(ts)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// Filename shown to the user.
    #[serde(default)]
    pub display: String,
    #[serde(
        default,
        deserialize_with = "optional_count_from_wire",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(alias = "emoji")]
    pub value: String,
    #[serde(default = "default_reaction_count", deserialize_with = "count_from_wire")]
    pub count: u64,
}

fn default_reaction_count() -> u64 {
    1
}

/// Any JSON number, or a numeric string. Exporters are not consistent about
/// writing `2` or `2.0`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCount {
    Number(serde_json::Number),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl WireCount {
    fn to_u64(&self) -> Option<u64> {
        let float = match self {
            Self::Number(n) => match n.as_u64() {
                Some(whole) => return Some(whole),
                None => n.as_f64()?,
            },
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        (float.is_finite() && float >= 0.0).then(|| float.round() as u64)
    }
}

fn optional_count_from_wire<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireCount>::deserialize(deserializer)?.and_then(|c| c.to_u64()))
}

fn count_from_wire<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_count_from_wire(deserializer)?.unwrap_or_else(default_reaction_count))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTs {
    Text(String),
    Number(serde_json::Number),
}

impl From<WireTs> for String {
    fn from(ts: WireTs) -> Self {
        match ts {
            WireTs::Text(s) => s,
            WireTs::Number(n) => n.to_string(),
        }
    }
}

pub(crate) fn ts_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireTs>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn optional_ts_from_wire<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireTs>::deserialize(deserializer)?.map(String::from))
}

pub(crate) fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ts_normalise_to_text() {
        let a: Message = serde_json::from_value(json!({"ts": "1700000000.5", "text": "a"})).unwrap();
        let b: Message = serde_json::from_value(json!({"ts": 1700000000.5, "text": "b"})).unwrap();
        assert_eq!(a.ts, "1700000000.5");
        assert_eq!(b.ts, "1700000000.5");
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let m: Message =
            serde_json::from_value(json!({"ts": "", "attachments": null, "user": "ann"})).unwrap();
        assert!(m.attachments.is_empty());
        assert!(m.reactions.is_empty());
        assert_eq!(m.text, None);
        assert_eq!(m.user.as_deref(), Some("ann"));
    }

    #[test]
    fn timestamp_parses_fractional_seconds() {
        let m: Message = serde_json::from_value(json!({"ts": "1700000000.250"})).unwrap();
        let dt = m.timestamp().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn timestamp_is_none_for_empty_or_garbage() {
        let empty: Message = serde_json::from_value(json!({"ts": ""})).unwrap();
        let garbage: Message = serde_json::from_value(json!({"ts": "yesterday"})).unwrap();
        assert!(empty.timestamp().is_none());
        assert!(garbage.timestamp().is_none());
    }

    #[test]
    fn timestamp_falls_back_to_rfc3339() {
        let m: Message = serde_json::from_value(json!({"ts": "2024-03-04T10:00:00+02:00"})).unwrap();
        let dt = m.timestamp().unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-04T08:00:00+00:00");
    }

    #[test]
    fn float_sizes_and_counts_are_accepted() {
        let m: Message = serde_json::from_value(json!({
            "ts": "1",
            "attachments": [
                {"id": "a", "display": "a.png", "size": 1024.0},
                {"id": "b", "display": "b.png", "size": "2048"},
                {"id": "c", "display": "c.png", "size": null}
            ],
            "reactions": [
                {"value": "thumbsup", "count": 2.0},
                {"value": "eyes", "count": null},
                {"value": "tada", "count": -3}
            ]
        }))
        .unwrap();
        let sizes: Vec<_> = m.attachments.iter().map(|a| a.size).collect();
        assert_eq!(sizes, vec![Some(1024), Some(2048), None]);
        let counts: Vec<_> = m.reactions.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    #[test]
    fn reaction_accepts_emoji_alias_and_default_count() {
        let r: Reaction = serde_json::from_value(json!({"emoji": "thumbsup"})).unwrap();
        assert_eq!(r.value, "thumbsup");
        assert_eq!(r.count, 1);
    }
}
