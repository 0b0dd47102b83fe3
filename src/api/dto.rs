use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

/// The `{message, data}` wrapper around every backend response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Longest plain-text error body taken as a message.
const MAX_PLAIN_MESSAGE: usize = 200;

impl ErrorBody {
    /// The server's message: `message` of a JSON body, or a short plain-text
    /// body as is. Blank messages, HTML pages and other JSON give `None`.
    pub fn parse(body: &str) -> Option<String> {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => serde_json::from_value::<ErrorBody>(value)
                .ok()
                .and_then(|b| b.message)
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            Err(_) => plain_message(body),
        }
    }
}

fn plain_message(body: &str) -> Option<String> {
    let text = body.trim();
    if text.is_empty() || text.len() > MAX_PLAIN_MESSAGE {
        return None;
    }
    if text.starts_with('<') || text.starts_with('{') || text.starts_with('[') {
        return None;
    }
    Some(text.to_string())
}

/// Read-only view over one loosely shaped JSON object.
///
/// Every accessor takes a fallback chain of dotted paths (`"course.courseCode"`)
/// and returns the first one that is present, non-null and convertible.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawRecord<'a> {
    pub fn new(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// First match together with the path that produced it.
    pub fn first<T>(
        &self,
        paths: &[&'static str],
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Option<(&'static str, T)> {
        paths
            .iter()
            .find_map(|path| self.lookup(path).and_then(&convert).map(|v| (*path, v)))
    }

    pub fn text(&self, paths: &[&'static str]) -> Option<String> {
        self.first(paths, as_text).map(|(_, v)| v)
    }

    pub fn integer(&self, paths: &[&'static str]) -> Option<i64> {
        self.first(paths, as_integer).map(|(_, v)| v)
    }

    pub fn number(&self, paths: &[&'static str]) -> Option<f64> {
        self.first(paths, as_number).map(|(_, v)| v)
    }

    pub fn boolean(&self, paths: &[&'static str]) -> Option<bool> {
        self.first(paths, as_boolean).map(|(_, v)| v)
    }

    /// Arrays of strings, or of `{authority}` / `{name}` objects.
    pub fn string_set(&self, paths: &[&'static str]) -> Option<BTreeSet<String>> {
        self.first(paths, as_string_set).map(|(_, v)| v)
    }
}

pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn as_string_set(value: &Value) -> Option<BTreeSet<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("authority")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}
