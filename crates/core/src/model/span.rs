use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TraceTreeError};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Server,
    Client,
    #[default]
    Internal,
}

impl SpanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl FromStr for SpanKind {
    type Err = TraceTreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SERVER" => Ok(Self::Server),
            "CLIENT" => Ok(Self::Client),
            "INTERNAL" => Ok(Self::Internal),
            _ => Err(TraceTreeError::Parse(format!("unknown span kind: {s}"))),
        }
    }
}

/// Lenient on the wire: any casing is accepted, and `null` or a kind outside
/// SERVER/CLIENT/INTERNAL reads as `INTERNAL`.
impl<'de> Deserialize<'de> for SpanKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|kind| kind.parse().ok())
            .unwrap_or_default())
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed unit of work as reported by an instrumented process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub parent_span_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: SpanKind,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub node_id: String,
    pub start_time_micros: i64,
    pub duration_micros: u64,
}

impl Span {
    pub fn end_time_micros(&self) -> i64 {
        self.start_time_micros
            .saturating_add_unsigned(self.duration_micros)
    }
}
