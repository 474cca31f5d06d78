//! Path-accessor encoding of call paths.
//!
//! A path `["a", "b", "c"]` is written as the arrow function
//! `(obj: Type) => obj.a.b.c` and read back by splitting the body on `.`.
//! Property names that contain `.` or need bracket access do not round-trip.

use crate::errors::{ProxyError, ProxyResult};

/// Render a path as an accessor function, typed with `type_name` when given.
pub fn encode(path: &[String], type_name: Option<&str>) -> String {
    let param = match type_name {
        Some(type_name) => format!("(obj: {})", type_name),
        None => "(obj)".to_string(),
    };
    if path.is_empty() {
        format!("{} => obj", param)
    } else {
        format!("{} => obj.{}", param, path.join("."))
    }
}

/// Recover the path from accessor source text.
pub fn decode(text: &str) -> ProxyResult<Vec<String>> {
    let (_, body) = text
        .split_once("=>")
        .ok_or_else(|| ProxyError::eval(format!("cannot extract accessor body: {}", text)))?;
    Ok(body
        .trim()
        .split('.')
        .skip(1)
        .map(|segment| segment.trim().to_string())
        .collect())
}
