//! Loosely typed request input read from a JSON or form-urlencoded body.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::Value;
use std::collections::BTreeMap;

use super::ApiError;

/// Request fields by name. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input {
    values: BTreeMap<String, Value>,
}

impl Input {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            Value::Null => Ok(Self::default()),
            _ => Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    /// Keeps only the listed fields.
    #[must_use]
    pub fn only(mut self, fields: &[&str]) -> Self {
        self.values.retain(|k, _| fields.contains(&k.as_str()));
        self
    }

    /// The raw value, `None` for missing, null or blank fields.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        match self.values.get(field)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            v => Some(v),
        }
    }

    #[must_use]
    pub fn is_present(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    /// Trimmed string form of scalar values.
    #[must_use]
    pub fn string(&self, field: &str) -> Option<String> {
        match self.value(field)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.value(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.value(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Accepts `true`, `false`, `1`, `0` and their string forms.
    #[must_use]
    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.value(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl<S> FromRequest<S> for Input
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {e}")))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        if is_json {
            let value: Value = serde_json::from_slice(&body)
                .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
            Self::from_json(value)
        } else {
            Ok(Self::from_pairs(url::form_urlencoded::parse(&body).into_owned()))
        }
    }
}
