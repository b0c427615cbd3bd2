//! Generic literal-value tree produced by the parser

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Deepest table nesting that [`Value`] serializes
pub const MAX_SERIALIZE_DEPTH: usize = 128;

/// Largest magnitude below which every integral f64 is exactly an integer (2^53)
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// A table key as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// `["name"] = v` or `"name" = v`
    String(String),
    /// `[n] = v` or an implicit positional slot
    Index(i64),
}

impl Key {
    /// Interpret the key as an integer, accepting integer-looking string keys
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Key::Index(i) => Some(*i),
            Key::String(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            Key::Index(_) => None,
        }
    }

    /// Plain text form, used for JSON object keys
    pub fn label(&self) -> String {
        match self {
            Key::String(s) => s.clone(),
            Key::Index(i) => i.to_string(),
        }
    }

    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Key::String(s) => format!("string key {:?}", s),
            Key::Index(i) => format!("positional key [{}]", i),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => {
                write!(f, "[")?;
                write_quoted(f, s)?;
                write!(f, "]")
            }
            Key::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// One `key = value` entry of a table, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Key,
    pub value: Value,
}

impl Field {
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

/// A literal value
///
/// Nesting depth is unbounded, so `Clone`, `PartialEq`, `Drop` and the
/// formatters walk nested tables with an explicit stack instead of recursing.
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    /// Escapes resolved, quotes stripped
    String(String),
    /// Fields in textual order; duplicates are kept as written
    Table(Vec<Field>),
}

impl Value {
    pub fn as_table(&self) -> Option<&[Field]> {
        match self {
            Value::Table(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer: an integral number, or a string
    /// holding one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) => f64_to_i64(*n),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    /// Look up a string-keyed field. The last occurrence wins, as in a Lua
    /// table constructor.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_table()?
            .iter()
            .rev()
            .find(|f| f.key.as_str() == Some(name))
            .map(|f| &f.value)
    }

    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Boolean(b) => format!("boolean {}", b),
            Value::Number(n) => format!("number {}", n),
            Value::String(s) => format!("string {:?}", s),
            Value::Table(fields) if fields.len() == 1 => "table with 1 field".to_string(),
            Value::Table(fields) => format!("table with {} fields", fields.len()),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let fields = match self {
            Value::Nil => return Value::Nil,
            Value::Boolean(b) => return Value::Boolean(*b),
            Value::Number(n) => return Value::Number(*n),
            Value::String(s) => return Value::String(s.clone()),
            Value::Table(fields) => fields,
        };

        // Child tables being copied: key in the parent, source fields left, copies so far
        let mut stack: Vec<(Key, std::slice::Iter<'_, Field>, Vec<Field>)> = Vec::new();
        let mut root_remaining = fields.iter();
        let mut root_copied = Vec::with_capacity(fields.len());

        loop {
            let (remaining, copied) = match stack.last_mut() {
                Some((_, remaining, copied)) => (remaining, copied),
                None => (&mut root_remaining, &mut root_copied),
            };
            match remaining.next() {
                Some(Field {
                    key,
                    value: Value::Table(children),
                }) => stack.push((key.clone(), children.iter(), Vec::with_capacity(children.len()))),
                Some(field) => copied.push(field.clone()),
                None => match stack.pop() {
                    Some((key, _, done)) => {
                        let parent = match stack.last_mut() {
                            Some((_, _, copied)) => copied,
                            None => &mut root_copied,
                        };
                        parent.push(Field::new(key, Value::Table(done)));
                    }
                    None => return Value::Table(root_copied),
                },
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (Value::Table(a), Value::Table(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    for (x, y) in a.iter().zip(b) {
                        if x.key != y.key {
                            return false;
                        }
                        pending.push((&x.value, &y.value));
                    }
                }
                (Value::Nil, Value::Nil) => {}
                (Value::Boolean(a), Value::Boolean(b)) if a == b => {}
                (Value::Number(a), Value::Number(b)) if a == b => {}
                (Value::String(a), Value::String(b)) if a == b => {}
                _ => return false,
            }
        }
        true
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let Value::Table(fields) = self else { return };
        if !fields.iter().any(|f| f.value.is_table()) {
            return;
        }

        // Detach nested tables so each one is dropped empty
        let mut pending = vec![std::mem::take(fields)];
        while let Some(mut fields) = pending.pop() {
            for field in &mut fields {
                if let Value::Table(children) = &mut field.value {
                    pending.push(std::mem::take(children));
                }
            }
        }
    }
}

/// Same as the canonical form
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Pending output of the canonical printer
enum Print<'a> {
    Value(&'a Value),
    Field(&'a Field),
    Text(&'static str),
}

/// Canonical literal form. Every key is written explicitly so that parsing
/// the output yields an equal tree.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Print::Value(self)];
        while let Some(item) = stack.pop() {
            match item {
                Print::Text(text) => f.write_str(text)?,
                Print::Field(field) => {
                    write!(f, "{} = ", field.key)?;
                    stack.push(Print::Value(&field.value));
                }
                Print::Value(Value::Nil) => f.write_str("nil")?,
                Print::Value(Value::Boolean(b)) => write!(f, "{}", b)?,
                Print::Value(Value::Number(n)) => write!(f, "{}", n)?,
                Print::Value(Value::String(s)) => write_quoted(f, s)?,
                Print::Value(Value::Table(fields)) => {
                    f.write_str("{")?;
                    stack.push(Print::Text("}"));
                    for (i, field) in fields.iter().enumerate().rev() {
                        stack.push(Print::Field(field));
                        if i > 0 {
                            stack.push(Print::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// Tables keyed exactly `1..=n` in order serialize as arrays, everything
/// else as objects. Serializers recurse once per nested table, so tables
/// deeper than [`MAX_SERIALIZE_DEPTH`] fail with a serializer error.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested {
            value: self,
            depth: 0,
        }
        .serialize(serializer)
    }
}

/// A value and the number of tables enclosing it
struct Nested<'a> {
    value: &'a Value,
    depth: usize,
}

impl Nested<'_> {
    fn child<'c>(&self, value: &'c Value) -> Nested<'c> {
        Nested {
            value,
            depth: self.depth + 1,
        }
    }
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Nil => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serialize_number(*n, serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Table(_) if self.depth >= MAX_SERIALIZE_DEPTH => Err(S::Error::custom(format!(
                "tables nested deeper than {} levels",
                MAX_SERIALIZE_DEPTH
            ))),
            Value::Table(fields) if is_sequence(fields) => {
                let mut seq = serializer.serialize_seq(Some(fields.len()))?;
                for field in fields {
                    seq.serialize_element(&self.child(&field.value))?;
                }
                seq.end()
            }
            Value::Table(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for field in fields {
                    map.serialize_entry(&field.key.label(), &self.child(&field.value))?;
                }
                map.end()
            }
        }
    }
}

fn is_sequence(fields: &[Field]) -> bool {
    !fields.is_empty()
        && fields
            .iter()
            .enumerate()
            .all(|(i, f)| f.key == Key::Index(i as i64 + 1))
}

/// Serialize integral numbers as integers so `1` does not come out as `1.0`
pub(crate) fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < EXACT_INTEGER_LIMIT {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

/// Convert an integral, in-range f64 to i64
pub(crate) fn f64_to_i64(n: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive upper bound
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}
