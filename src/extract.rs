use serde_json::Value;

use crate::metric::{MetricDescriptor, MetricKind};

/// Outcome of one extraction. `Unset` covers absence, type mismatch and empty
/// values alike; it is a normal result, never an error.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MetricValue {
    Unset,
    Number(f64),
    Text(String),
    Flag(bool),
}

impl MetricValue {
    pub fn is_set(&self) -> bool {
        !matches!(self, MetricValue::Unset)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One step of a path descent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Selector {
    Key(String),
    Index(usize),
    /// First record of an array whose `id` (or fallback `selection`) field
    /// equals the target.
    IdEq(String),
}

/// One way of locating a metric inside the raw payload. Descriptors carry an
/// ordered list of these; the upstream schema is vendor-controlled and
/// unstable, so the key material is data, not code.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    Path(Vec<Selector>),
    TaggedScan { group: String, id: String },
    DeepSearch { id: String, selection: String },
    FlatKeys(Vec<String>),
}

/// Map a raw payload to one typed metric value. Strategies are tried in
/// order; the first one that yields a set value wins.
pub fn extract(payload: &Value, descriptor: &MetricDescriptor) -> MetricValue {
    for strategy in &descriptor.strategies {
        let node = match strategy {
            Strategy::Path(selectors) => locate_path(payload, selectors),
            Strategy::TaggedScan { group, id } => locate_tagged(payload, group, id),
            Strategy::DeepSearch { id, selection } => search_tree(payload, id, selection),
            Strategy::FlatKeys(keys) => keys.iter().find_map(|k| payload.get(k.as_str())),
        };

        if let Some(raw) = node {
            let value = coerce(descriptor.kind, raw);
            if value.is_set() {
                return value;
            }
        }
    }

    MetricValue::Unset
}

fn locate_path<'a>(payload: &'a Value, selectors: &[Selector]) -> Option<&'a Value> {
    let mut node = payload;
    for selector in selectors {
        node = match selector {
            Selector::Key(k) => node.get(k.as_str())?,
            Selector::Index(i) => node.get(*i)?,
            Selector::IdEq(id) => node.as_array()?.iter().find(|r| tag_matches(r, id))?,
        };
    }
    Some(node)
}

fn locate_tagged<'a>(payload: &'a Value, group: &str, id: &str) -> Option<&'a Value> {
    let records = payload.get(group)?.as_array()?;
    let record = records.iter().find(|r| tag_matches(r, id))?;
    record_value(record)
}

fn search_tree<'a>(node: &'a Value, id: &str, selection: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => {
            if field_eq(map.get("id"), id) && field_eq(map.get("selection"), selection) {
                return map.get("value").or_else(|| map.get("val"));
            }
            map.values().find_map(|v| search_tree(v, id, selection))
        }
        Value::Array(items) => items.iter().find_map(|v| search_tree(v, id, selection)),
        _ => None,
    }
}

fn tag_matches(record: &Value, target: &str) -> bool {
    field_eq(record.get("id"), target) || field_eq(record.get("selection"), target)
}

fn field_eq(field: Option<&Value>, target: &str) -> bool {
    match field {
        Some(Value::String(s)) => s == target,
        Some(Value::Number(n)) => n.to_string() == target,
        _ => false,
    }
}

fn record_value(record: &Value) -> Option<&Value> {
    record.get("value").or_else(|| record.get("val"))
}

fn coerce(kind: MetricKind, raw: &Value) -> MetricValue {
    match kind {
        MetricKind::Temperature
        | MetricKind::Mass
        | MetricKind::Power
        | MetricKind::Percentage => coerce_number(raw),
        MetricKind::State => coerce_state(raw),
        MetricKind::Raw => coerce_raw(raw),
    }
}

fn coerce_number(raw: &Value) -> MetricValue {
    match raw {
        Value::Number(n) => match n.as_f64() {
            Some(f) => MetricValue::Number(f),
            None => MetricValue::Unset,
        },
        Value::String(s) => {
            // Some firmware revisions use a comma decimal separator.
            let normalized = s.trim().replace(',', ".");
            if normalized.is_empty() {
                return MetricValue::Unset;
            }
            match normalized.parse::<f64>() {
                Ok(f) => MetricValue::Number(f),
                Err(_) => MetricValue::Unset,
            }
        }
        _ => MetricValue::Unset,
    }
}

fn coerce_state(raw: &Value) -> MetricValue {
    let code = match raw {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return MetricValue::Unset,
    };
    MetricValue::Text(state_label(&code))
}

fn coerce_raw(raw: &Value) -> MetricValue {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                MetricValue::Unset
            } else {
                MetricValue::Text(trimmed.to_ascii_uppercase())
            }
        }
        Value::Number(n) => MetricValue::Text(n.to_string()),
        Value::Bool(b) => MetricValue::Flag(*b),
        _ => MetricValue::Unset,
    }
}

/// Map a controller state code to its display label. Codes the table does not
/// know are passed through verbatim so unseen device states never error.
pub fn state_label(code: &str) -> String {
    match code.to_ascii_lowercase().as_str() {
        "state_14" => "OFF".to_string(),
        "state_5" => "Power".to_string(),
        "state_2" => "Ignition".to_string(),
        _ => code.to_string(),
    }
}
