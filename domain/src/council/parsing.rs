//! Critique response parsing.
//!
//! Critics are asked to answer with a small JSON object:
//!
//! ```text
//! {"score": 7, "feedback": "Solid numbers but ignores reimbursement risk."}
//! ```
//!
//! Model output is untrusted text. Anything that does not yield a JSON
//! object with an integer score in `1..=10` is treated as a failed critique
//! and returns `None`; it is never an error for the surrounding round.

use super::entities::{Critique, ResponseId};
use crate::core::agent::AgentId;
use serde_json::Value;

/// Lowest score a critic may give
pub const MIN_SCORE: u8 = 1;
/// Highest score a critic may give
pub const MAX_SCORE: u8 = 10;

/// Parse a critic's raw answer into a [`Critique`].
///
/// Accepts bare JSON, JSON wrapped in prose or a markdown code fence,
/// integer scores, integral floats (`8.0`) and numeric strings (`"8"`).
///
/// # Examples
///
/// ```
/// use council_domain::AgentId;
/// use council_domain::council::parsing::parse_critique;
///
/// let critique = parse_critique(
///     r#"{"score": 8, "feedback": "Clear and well sourced."}"#,
///     "resp-1".into(),
///     AgentId::Legal,
/// )
/// .unwrap();
/// assert_eq!(critique.score, 8);
///
/// assert!(parse_critique("Looks good to me!", "resp-1".into(), AgentId::Legal).is_none());
/// ```
pub fn parse_critique(raw: &str, response_id: ResponseId, critic: AgentId) -> Option<Critique> {
    let object = extract_json_object(raw)?;
    let score = parse_score(object.get("score")?)?;
    let feedback = object
        .get("feedback")
        .or_else(|| object.get("reasoning"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Some(Critique::new(response_id, critic, score, feedback))
}

fn extract_json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if number.fract() != 0.0 {
        return None;
    }
    if !(f64::from(MIN_SCORE)..=f64::from(MAX_SCORE)).contains(&number) {
        return None;
    }
    Some(number as u8)
}
