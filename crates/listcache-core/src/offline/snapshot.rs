use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last successfully fetched list records.
///
/// Replaced wholesale on every successful fetch and never expires; callers
/// show its age instead of discarding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSnapshot {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(rename = "lastSyncEpochMillis", with = "chrono::serde::ts_milliseconds")]
    pub last_sync: DateTime<Utc>,
}

impl CachedSnapshot {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            last_sync: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.last_sync).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
