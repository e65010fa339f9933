use std::str::FromStr;

use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceTreeError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    StartDesc,
    StartAsc,
    DurationDesc,
}

impl FromStr for SortOrder {
    type Err = TraceTreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start_desc" => Ok(Self::StartDesc),
            "start_asc" => Ok(Self::StartAsc),
            "duration_desc" => Ok(Self::DurationDesc),
            _ => Err(TraceTreeError::Parse(format!("unknown sort order: {s}"))),
        }
    }
}

/// Glob over service names, e.g. `checkout-*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceFilter {
    pub glob: String,
}

impl ServiceFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let glob = input.trim();
        if glob.is_empty() {
            return Err(TraceTreeError::Parse("empty service filter".to_string()));
        }
        Pattern::new(glob)
            .map_err(|e| TraceTreeError::Parse(format!("invalid service filter {glob}: {e}")))?;
        Ok(Self {
            glob: glob.to_string(),
        })
    }

    pub fn matches(&self, service: &str) -> bool {
        Pattern::new(&self.glob)
            .map(|p| p.matches(service))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self {
            since: None,
            until: None,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(since) = self.since
            && ts < since
        {
            return false;
        }
        if let Some(until) = self.until
            && ts > until
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn sort_order_parse() {
        assert_eq!(SortOrder::from_str("duration_desc").unwrap(), SortOrder::DurationDesc);
        assert_eq!(SortOrder::from_str("start_asc").unwrap(), SortOrder::StartAsc);
        assert!(SortOrder::from_str("random").is_err());
    }

    #[test]
    fn service_filter_parse_and_match() {
        let f = ServiceFilter::parse("checkout-*").unwrap();
        assert!(f.matches("checkout-api"));
        assert!(!f.matches("payments"));
        assert!(ServiceFilter::parse("  ").is_err());
        assert!(ServiceFilter::parse("[").is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let window = TimeWindow {
            since: Some(t0),
            until: Some(t1),
        };
        assert!(window.contains(t0));
        assert!(window.contains(t1));
        assert!(!window.contains(t1 + chrono::Duration::seconds(1)));
        assert!(TimeWindow::all().contains(t0));
    }
}
