use serde_json::Value;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://stokercloud.dk/v2/dataout2";

pub(crate) const CONTROLLER_DATA_PATH: &str = "/controllerdata2.php";
pub(crate) const UPDATE_VALUE_PATH: &str = "/updatevalue.php";

// Boiler power is driven by two write-only pseudo-settings.
pub(crate) const MISC_START: &str = "misc.start";
pub(crate) const MISC_STOP: &str = "misc.stop";
pub(crate) const MISC_COMMAND_VALUE: &str = "1";

/// Decode a telemetry body defensively: strict parse first, then one repair
/// pass for the malformed encodings some installations emit (single-quoted
/// JSON, trailing commas). A body with no structure at all is kept as a bare
/// text scalar.
pub(crate) fn decode_payload(body: &str) -> Result<Value> {
    if let Ok(v) = serde_json::from_str(body) {
        return Ok(v);
    }

    let repaired = repair_json(body);
    if let Ok(v) = serde_json::from_str(&repaired) {
        return Ok(v);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.contains(['{', '[']) {
        return Ok(Value::String(trimmed.to_string()));
    }

    Err(Error::Decode(format!(
        "body is not valid JSON after repair ({} bytes)",
        body.len()
    )))
}

/// Normalize single quotes to double quotes and drop trailing commas before
/// closing brackets. Applied at most once per fetch.
pub(crate) fn repair_json(body: &str) -> String {
    let quoted = body.replace('\'', "\"");

    let mut out = String::with_capacity(quoted.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = quoted.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace()).copied();
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Heuristic check of a 2xx write response body. The endpoint has no reliable
/// success convention, so only a recognizable failure marker counts as
/// failure; anything else (including an empty or echoed body) is success.
pub(crate) fn body_reports_failure(body: &str) -> bool {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return false;
    }

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return json_reports_failure(&v);
    }

    let lower = trimmed.to_ascii_lowercase();
    lower.contains("error") || lower.contains("fail") || lower.contains("denied")
}

fn json_reports_failure(v: &Value) -> bool {
    let Value::Object(map) = v else {
        return false;
    };

    for key in ["status", "result", "state"] {
        if let Some(Value::String(s)) = map.get(key) {
            match s.to_ascii_lowercase().as_str() {
                "ok" | "success" => return false,
                "error" | "fail" | "failed" => return true,
                _ => {}
            }
        }
    }

    match map.get("error") {
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
