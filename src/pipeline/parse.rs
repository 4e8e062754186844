//! Response parsing: raw model text → validated [`EligibilityReport`].
//!
//! Models sometimes wrap JSON in a ```` ```json ```` fence even when told not
//! to, so the outermost fence is stripped first. The remaining text must be a
//! JSON object carrying every field in [`REQUIRED_FIELDS`] with the right
//! JSON type before it is accepted. Anything else is a
//! [`AuditError::MalformedResponse`]; the detail goes to the log, the user
//! only ever sees the generic message.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::AuditError;
use crate::report::EligibilityReport;
use crate::schema::REQUIRED_FIELDS;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n?(.*?)\r?\n?```\s*$").unwrap());

/// Remove one outer markdown code fence, with or without a language tag.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => trimmed,
    }
}

/// Parse and validate a model response.
pub fn parse_report(raw: &str) -> Result<EligibilityReport, AuditError> {
    parse_inner(raw).map_err(|detail| {
        warn!("Rejected analysis response: {}", detail);
        AuditError::malformed(detail)
    })
}

fn parse_inner(raw: &str) -> Result<EligibilityReport, String> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err("empty response".into());
    }

    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    validate(&value)?;
    serde_json::from_value(value).map_err(|e| format!("unexpected shape: {e}"))
}

/// Required-field gate over the decoded JSON.
fn validate(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", kind(value)))?;

    for field in REQUIRED_FIELDS {
        let v = obj.get(field).ok_or_else(|| format!("missing field '{field}'"))?;
        let ok = match field {
            "legivel" | "elegivel" | "alertaBancosBloqueados" => v.is_boolean(),
            "orgao" | "motivo" => v.is_string(),
            "dadosExtraidos" => v.is_object(),
            _ => true,
        };
        if !ok {
            return Err(format!("field '{field}' has type {}", kind(v)));
        }
    }

    if obj["motivo"].as_str().is_some_and(|m| m.trim().is_empty()) {
        return Err("field 'motivo' is empty".into());
    }

    if let Some(liquido) = obj["dadosExtraidos"].get("liquido").and_then(Value::as_f64) {
        if liquido < 0.0 {
            return Err(format!("negative liquido {liquido}"));
        }
    }
    Ok(())
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
