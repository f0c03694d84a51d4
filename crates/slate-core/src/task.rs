use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Upper bound on task text, counted in Unicode scalar values after trimming.
pub const MAX_TEXT_CHARS: usize = 200;

const ID_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Coerces any raw value to a priority. Unknown input becomes `Medium`.
    pub fn sanitize(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    /// Sort rank: high sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(anyhow!("unknown priority: {other}")),
        }
    }
}

/// Why a raw record could not become a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotARecord,
    MissingText,
    EmptyText,
    TextTooLong,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotARecord => "record is not an object",
            Self::MissingText => "text is missing or not a string",
            Self::EmptyText => "text is empty",
            Self::TextTooLong => "text exceeds the length limit",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub text: String,

    pub completed: bool,

    /// Milliseconds since the Unix epoch.
    pub created_at: i64,

    pub priority: Priority,
}

impl Task {
    /// Builds a fresh, incomplete task from user input.
    ///
    /// Runs the same text and priority checks as [`Task::from_value`], so a
    /// task created here is indistinguishable from one that went through a
    /// save/load cycle.
    pub fn new_pending(text: &str, priority: &str, now_ms: i64) -> Result<Self, Rejection> {
        Ok(Self {
            id: generate_id(now_ms),
            text: validate_text(text)?,
            completed: false,
            created_at: now_ms,
            priority: Priority::sanitize(priority),
        })
    }

    /// Parses one decoded record, coercing every field that can be coerced.
    ///
    /// Only a non-object value or missing/blank `text` rejects the record.
    /// Over-long text is cut to [`MAX_TEXT_CHARS`]; `priority`, `completed`,
    /// `createdAt` and `id` always fall back to a valid value.
    pub fn from_value(value: &Value, now_ms: i64) -> Result<Self, Rejection> {
        let Value::Object(fields) = value else {
            return Err(Rejection::NotARecord);
        };

        let text = match fields.get("text") {
            Some(Value::String(raw)) => clamp_text(raw)?,
            _ => return Err(Rejection::MissingText),
        };

        let priority = fields
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::sanitize)
            .unwrap_or_default();

        let completed = fields.get("completed").is_some_and(is_truthy);

        let created_at = fields
            .get("createdAt")
            .and_then(positive_millis)
            .unwrap_or(now_ms);

        let id = fields
            .get("id")
            .and_then(coerce_id)
            .unwrap_or_else(|| generate_id(now_ms));

        Ok(Self {
            id,
            text,
            completed,
            created_at,
            priority,
        })
    }
}

/// Trims and bounds user-visible task text.
pub fn validate_text(raw: &str) -> Result<String, Rejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejection::EmptyText);
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(Rejection::TextTooLong);
    }
    Ok(trimmed.to_string())
}

fn clamp_text(raw: &str) -> Result<String, Rejection> {
    match validate_text(raw) {
        Err(Rejection::TextTooLong) => {
            let cut: String = raw.trim().chars().take(MAX_TEXT_CHARS).collect();
            warn!(
                chars = raw.trim().chars().count(),
                limit = MAX_TEXT_CHARS,
                "truncating over-long stored task text"
            );
            Ok(cut.trim_end().to_string())
        }
        other => other,
    }
}

/// `<millis>-<8 hex chars>`; the random suffix keeps ids distinct within
/// the same millisecond.
pub fn generate_id(now_ms: i64) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ID_SUFFIX_LEN)
        .collect();
    format!("{now_ms}-{suffix}")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn positive_millis(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let whole = raw.trunc();
    (whole.is_finite() && whole >= 1.0).then_some(whole as i64)
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
