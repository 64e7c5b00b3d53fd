use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// One stored food analysis. Records are never updated, only created and deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub image_ref: String,
    pub result_text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// The payload written on create; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalysisRecord {
    pub image_ref: String,
    pub result_text: String,
    pub created_at: i64,
}

impl NewAnalysisRecord {
    pub fn new(image_ref: impl Into<String>, result_text: impl Into<String>) -> Self {
        Self {
            image_ref: image_ref.into(),
            result_text: result_text.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_id(self, id: String) -> AnalysisRecord {
        AnalysisRecord {
            id,
            image_ref: self.image_ref,
            result_text: self.result_text,
            created_at: self.created_at,
        }
    }
}

impl AnalysisRecord {
    /// Expects the columns `id, image_ref, result_text, created_at` in that order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            image_ref: row.get(1)?,
            result_text: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// First line of the report, trimmed to `max_chars` for list views.
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self
            .result_text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        if first_line.chars().count() <= max_chars {
            first_line.to_string()
        } else {
            let cut: String = first_line.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        }
    }
}
