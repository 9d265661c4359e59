//! Turns raw model text into a JSON object
//!
//! Models wrap JSON in prose, fence it in markdown, use JavaScript literals
//! and get cut off at the token limit. The parser runs an ordered cascade of
//! strategies and the first one that yields an object wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::PlanMetadata;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseError {
  #[error("AI returned an empty or null response")]
  EmptyOrNullResponse,

  #[error("Could not extract a plan from the AI response")]
  UnparsableResponse,
}

/// A strategy either produces an object or passes to the next one
type Strategy = fn(&str) -> Option<Map<String, Value>>;

const CASCADE: [(&str, Strategy); 4] = [
  ("direct", parse_direct),
  ("extract_block", parse_extracted_block),
  ("textual_repair", parse_repaired),
  ("partial_reconstruction", reconstruct_partial),
];

/// Run the extraction cascade over raw model output
pub fn parse_plan_response(raw: &str) -> Result<Value, ParseError> {
  if is_empty_or_null(raw) {
    warn!(len = raw.len(), "Empty or null AI response");
    return Err(ParseError::EmptyOrNullResponse);
  }

  for (name, strategy) in CASCADE {
    if let Some(object) = strategy(raw) {
      debug!(strategy = name, keys = object.len(), "Extracted JSON object");
      return Ok(Value::Object(object));
    }
  }

  warn!(len = raw.len(), "All extraction strategies failed");
  Err(ParseError::UnparsableResponse)
}

/// ---------------------------------------------------------------------------
/// Strategies
/// ---------------------------------------------------------------------------

fn is_empty_or_null(raw: &str) -> bool {
  let trimmed = raw.trim();
  trimmed.is_empty() || trimmed.starts_with("null") || trimmed.starts_with("undefined")
}

fn as_object(value: Value) -> Option<Map<String, Value>> {
  match value {
    Value::Object(map) => Some(map),
    _ => None,
  }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
  serde_json::from_str::<Value>(text).ok().and_then(as_object)
}

fn parse_direct(raw: &str) -> Option<Map<String, Value>> {
  parse_object(raw.trim())
}

fn parse_extracted_block(raw: &str) -> Option<Map<String, Value>> {
  extract_candidates(raw)
    .into_iter()
    .find_map(|candidate| parse_object(&candidate))
}

fn parse_repaired(raw: &str) -> Option<Map<String, Value>> {
  extract_candidates(raw)
    .into_iter()
    .chain(std::iter::once(raw.trim().to_string()))
    .find_map(|candidate| parse_object(&repair_json_text(&candidate)))
}

/// Candidate JSON snippets, most specific first: fenced blocks, the first
/// balanced object, then everything between the first `{` and the last `}`.
fn extract_candidates(text: &str) -> Vec<String> {
  let mut candidates = Vec::new();

  if let Some(fenced) = fenced_block(text) {
    candidates.push(fenced);
  }

  if let Some(start) = text.find('{') {
    if let Some(end) = balanced_end(text, start) {
      candidates.push(text[start..=end].to_string());
    }
    if let Some(end) = text.rfind('}') {
      if end > start {
        candidates.push(text[start..=end].to_string());
      }
    }
  }

  candidates.dedup();
  candidates
}

fn fenced_block(text: &str) -> Option<String> {
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Some(text[start..start + end].trim().to_string());
    }
  }

  let start = text.find("```")? + 3;
  // Skip language identifier if present
  let content_start = text[start..]
    .find('\n')
    .map(|i| start + i + 1)
    .unwrap_or(start);
  let end = text[content_start..].find("```")?;
  Some(text[content_start..content_start + end].trim().to_string())
}

/// Index of the bracket closing the one at `start`, ignoring brackets inside
/// string literals
fn balanced_end(text: &str, start: usize) -> Option<usize> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (i, c) in text[start..].char_indices() {
    if in_string {
      match c {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }

    match c {
      '"' => in_string = true,
      '{' | '[' => depth += 1,
      '}' | ']' => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(start + i);
        }
      }
      _ => {}
    }
  }

  None
}

/// ---------------------------------------------------------------------------
/// Textual Repair
/// ---------------------------------------------------------------------------

static SINGLE_QUOTED_KEY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"'([^'"\n]*)'(\s*:)"#).expect("valid regex"));
static SINGLE_QUOTED_VALUE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"([:\[,]\s*)'([^'"\n]*)'"#).expect("valid regex"));
static BARE_KEY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)").expect("valid regex"));
static REPEATED_COMMAS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r",(\s*,)+").expect("valid regex"));
static JS_LITERALS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b(undefined|NaN)\b").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

/// Rewrite the usual JavaScript-isms into strict JSON
pub fn repair_json_text(text: &str) -> String {
  let text = SINGLE_QUOTED_KEY.replace_all(text, "\"$1\"$2");
  let text = SINGLE_QUOTED_VALUE.replace_all(&text, "$1\"$2\"");
  let text = BARE_KEY.replace_all(&text, "$1\"$2\"$3");
  let text = REPEATED_COMMAS.replace_all(&text, ",");
  let text = JS_LITERALS.replace_all(&text, "null");
  let text = TRAILING_COMMA.replace_all(&text, "$1");
  text.into_owned()
}

/// ---------------------------------------------------------------------------
/// Partial Reconstruction
/// ---------------------------------------------------------------------------

static ID_FIELD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\bid["']?\s*:\s*["']([^"'\n]+)["']"#).expect("valid regex"));
static METADATA_FIELD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"["']?metadata["']?\s*:\s*\{"#).expect("valid regex"));
static WEEKS_FIELD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"["']?plan_weeks["']?\s*:\s*\["#).expect("valid regex"));

/// Pull `id`, `metadata` and `plan_weeks` out independently. A field that
/// cannot be recovered is replaced by its default (metadata) or left for the
/// repairer to synthesize (id, weeks). Nothing recovered at all means the
/// text is not a plan.
fn reconstruct_partial(raw: &str) -> Option<Map<String, Value>> {
  let id = ID_FIELD
    .captures(raw)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim().to_string());
  let metadata = extract_metadata(raw);
  let weeks = extract_weeks(raw);

  if id.is_none() && metadata.is_none() && weeks.is_none() {
    return None;
  }

  debug!(
    id = id.is_some(),
    metadata = metadata.is_some(),
    weeks = weeks.as_ref().map_or(0, Vec::len),
    "Partially reconstructed plan"
  );

  let mut object = Map::new();
  if let Some(id) = id {
    object.insert("id".to_string(), Value::String(id));
  }
  let metadata = metadata
    .or_else(|| serde_json::to_value(PlanMetadata::default()).ok().and_then(as_object))
    .unwrap_or_default();
  object.insert("metadata".to_string(), Value::Object(metadata));
  if let Some(weeks) = weeks {
    object.insert("plan_weeks".to_string(), Value::Array(weeks));
  }

  Some(object)
}

fn extract_metadata(raw: &str) -> Option<Map<String, Value>> {
  let found = METADATA_FIELD.find(raw)?;
  let start = found.end() - 1;
  let end = balanced_end(raw, start)?;
  let block = &raw[start..=end];
  parse_object(block).or_else(|| parse_object(&repair_json_text(block)))
}

/// The whole array when it is intact, otherwise every complete week object
/// before the point where the text breaks off
fn extract_weeks(raw: &str) -> Option<Vec<Value>> {
  let found = WEEKS_FIELD.find(raw)?;
  let start = found.end() - 1;

  if let Some(end) = balanced_end(raw, start) {
    let block = &raw[start..=end];
    let parsed = serde_json::from_str::<Value>(block)
      .ok()
      .or_else(|| serde_json::from_str::<Value>(&repair_json_text(block)).ok());
    if let Some(Value::Array(weeks)) = parsed {
      return Some(weeks);
    }
  }

  let weeks = salvage_objects(raw, start + 1);
  if weeks.is_empty() {
    None
  } else {
    warn!(salvaged = weeks.len(), "plan_weeks truncated, keeping complete weeks");
    Some(weeks)
  }
}

fn salvage_objects(raw: &str, mut cursor: usize) -> Vec<Value> {
  let mut objects = Vec::new();

  while let Some(offset) = raw[cursor..].find('{') {
    let start = cursor + offset;
    let Some(end) = balanced_end(raw, start) else {
      break;
    };
    let block = &raw[start..=end];
    match parse_object(block).or_else(|| parse_object(&repair_json_text(block))) {
      Some(object) => objects.push(Value::Object(object)),
      None => break,
    }
    cursor = end + 1;
  }

  objects
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
