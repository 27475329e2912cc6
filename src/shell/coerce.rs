use std::{fmt, str::FromStr};

/// Kind of a declared command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Integer,
    Float,
    Text,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        })
    }
}

/// A coerced command argument
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Text(_) => Kind::Text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot read {raw:?} as {kind}")]
pub struct CoercionError {
    pub raw: String,
    pub kind: Kind,
}

fn parse<T: FromStr>(raw: &str, kind: Kind, wrap: fn(T) -> Value) -> Result<Value, CoercionError> {
    raw.trim().parse::<T>().map(wrap).map_err(|_| CoercionError {
        raw: raw.to_string(),
        kind,
    })
}

/// Convert a raw token into the requested kind
///
/// # Errors
///
/// Returns `CoercionError` if the token does not parse as `kind`
pub fn coerce(raw: &str, kind: Kind) -> Result<Value, CoercionError> {
    match kind {
        Kind::Integer => parse::<i64>(raw, kind, Value::Integer),
        Kind::Float => parse::<f64>(raw, kind, Value::Float),
        Kind::Text => Ok(Value::Text(raw.to_string())),
    }
}

/// Coerce every token against its declared kind, left to right
///
/// Stops at the first failure, nothing coerced so far is returned.
///
/// # Errors
///
/// Returns the first `CoercionError`
pub fn coerce_all(raw: &[String], kinds: &[Kind]) -> Result<Vec<Value>, CoercionError> {
    raw.iter()
        .zip(kinds)
        .map(|(token, kind)| coerce(token, *kind))
        .collect()
}
