//! Tera setup for the dashboard pages.
//!
//! Charts are embedded as JSON inside `<script>` elements, where serde_json
//! output alone could close the element early. `script_json` escapes the
//! characters that matter there.

use std::collections::HashMap;
use tera::{Tera, Value};

pub fn load(glob: &str) -> tera::Result<Tera> {
    let mut tera = Tera::new(glob)?;
    tera.register_filter("script_json", script_json);
    Ok(tera)
}

/// Encodes `value` as JSON that is safe to place inside a `<script>` element.
pub fn script_json(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let encoded = serde_json::to_string(value).map_err(|err| tera::Error::msg(err.to_string()))?;
    Ok(Value::String(escape_script(&encoded)))
}

fn escape_script(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}
