use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Per-field validation messages as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|messages| messages.is_empty())
    }

    /// First message for `field`, which is the only one shown to the user.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn firsts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(field, messages)| {
            messages
                .first()
                .map(|message| (field.as_str(), message.as_str()))
        })
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<K, V> FromIterator<(K, Vec<V>)> for FieldErrors
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, messages)| {
                    (field.into(), messages.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("validation failed for: {}", .0.firsts().map(|(field, _)| field).collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("failed decoding response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
