//! Query-string and form decoding into JSON objects
//!
//! Repeated keys collect into arrays. The query parser also understands one
//! level of brackets: `price[gte]=5` becomes `{"price": {"gte": "5"}}` and
//! `tag[]=a` forces an array.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Parse a query string (without the leading `?`)
pub fn parse(raw: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let value = Value::String(value.into_owned());

        match split_brackets(&key) {
            Some((outer, "")) => push_array(&mut out, outer, value),
            Some((outer, inner)) => {
                let slot = out
                    .entry(outer.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                // A plain `price=5` seen earlier wins over `price[gte]=...`
                if let Value::Object(nested) = slot {
                    insert_value(nested, inner, value);
                }
            }
            None => insert_value(&mut out, &key, value),
        }
    }
    out
}

/// Parse a url-encoded body: flat keys, repeated keys as arrays, no brackets
pub fn parse_flat(raw: &[u8]) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in form_urlencoded::parse(raw) {
        insert_value(&mut out, &key, Value::String(value.into_owned()));
    }
    out
}

fn split_brackets(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    if open == 0 || !key.ends_with(']') {
        return None;
    }
    let inner = &key[open + 1..key.len() - 1];
    if inner.contains('[') || inner.contains(']') {
        return None;
    }
    Some((&key[..open], inner))
}

fn insert_value(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

fn push_array(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            map.insert(key.to_string(), Value::Array(vec![value]));
        }
    }
}
