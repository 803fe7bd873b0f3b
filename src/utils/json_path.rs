//! Typed traversal of slash-delimited paths into extracted result data.
//!
//! An external binding's connect path such as `section/items/url` names the
//! containing node with every segment but the last, and the key holding the
//! URL with the last one. Arrays met along the way fan out: the remaining
//! segments apply to each element independently. Traversal never panics;
//! every step yields either the nodes it reached or a typed `PathFault`.

use serde_json::Value;
use std::fmt;

/// Why a connect path could not be followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFault {
    /// The path had no segments
    Empty,
    /// A segment named a key that is absent (or null) in every node reached
    NotFound { segment: String },
    /// A segment had to be applied to a scalar
    WrongShape {
        segment: String,
        found: &'static str,
    },
}

impl fmt::Display for PathFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty connect path"),
            Self::NotFound { segment } => write!(f, "segment '{segment}' not found"),
            Self::WrongShape { segment, found } => {
                write!(f, "segment '{segment}' applied to a {found}")
            }
        }
    }
}

impl std::error::Error for PathFault {}

/// A concrete object field addressed by a connect path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// JSON pointer (RFC 6901) of the containing object
    pub container: String,
    /// Key inside the container
    pub key: String,
}

impl FieldRef {
    /// The string stored at this field, if it is a non-empty string
    #[must_use]
    pub fn read_str<'a>(&self, data: &'a Value) -> Option<&'a str> {
        data.pointer(&self.container)?
            .get(&self.key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Replace the field's value in place
    ///
    /// # Errors
    ///
    /// Returns `PathFault` when the container no longer exists or is no
    /// longer an object.
    pub fn replace(&self, data: &mut Value, value: Value) -> Result<(), PathFault> {
        let node = data
            .pointer_mut(&self.container)
            .ok_or_else(|| PathFault::NotFound {
                segment: self.container.clone(),
            })?;
        let kind = kind_of(node);
        let object = node.as_object_mut().ok_or(PathFault::WrongShape {
            segment: self.key.clone(),
            found: kind,
        })?;
        object.insert(self.key.clone(), value);
        Ok(())
    }
}

/// Split a connect path into its segments
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Find every object field addressed by `path` inside `data`
///
/// # Errors
///
/// `PathFault::Empty` for a path with no segments, `NotFound` when a
/// container segment resolves nowhere, `WrongShape` when the addressed
/// container is a scalar.
pub fn locate_fields(data: &Value, path: &str) -> Result<Vec<FieldRef>, PathFault> {
    let segs = segments(path);
    let Some((key, container_segs)) = segs.split_last() else {
        return Err(PathFault::Empty);
    };

    let mut frontier: Vec<Node<'_>> = Vec::new();
    fan_out(String::new(), data, false, &mut frontier);

    for segment in container_segs {
        let mut next = Vec::new();
        let mut reached = false;
        let mut shape_fault = None;
        for node in &frontier {
            match node.value {
                Value::Object(map) => match map.get(*segment) {
                    Some(Value::Null) | None => {}
                    Some(child) => {
                        reached = true;
                        let pointer = format!("{}/{}", node.pointer, escape(segment));
                        fan_out(pointer, child, false, &mut next);
                    }
                },
                // scalars inside a fanned-out array simply do not match
                _ if node.in_array => {}
                other => {
                    shape_fault = Some(PathFault::WrongShape {
                        segment: (*segment).to_string(),
                        found: kind_of(other),
                    });
                }
            }
        }
        if next.is_empty() {
            return match shape_fault {
                Some(fault) => Err(fault),
                None if reached => Ok(Vec::new()),
                None => Err(PathFault::NotFound {
                    segment: (*segment).to_string(),
                }),
            };
        }
        frontier = next;
    }

    let mut fields = Vec::with_capacity(frontier.len());
    for node in frontier {
        match node.value {
            Value::Object(_) => fields.push(FieldRef {
                container: node.pointer,
                key: (*key).to_string(),
            }),
            _ if node.in_array => {}
            other => {
                return Err(PathFault::WrongShape {
                    segment: (*key).to_string(),
                    found: kind_of(other),
                });
            }
        }
    }
    Ok(fields)
}

struct Node<'a> {
    pointer: String,
    value: &'a Value,
    in_array: bool,
}

/// Push `value`, or each element of it (recursively) when it is an array
fn fan_out<'a>(pointer: String, value: &'a Value, in_array: bool, out: &mut Vec<Node<'a>>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                fan_out(format!("{pointer}/{i}"), item, true, out);
            }
        }
        other => out.push(Node {
            pointer,
            value: other,
            in_array,
        }),
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
