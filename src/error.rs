//! Error Types — Validation, Parse and Fetch Layers
//!
//! Three layers matching the ingestion pipeline: field validation
//! inside a payload, payload parsing, and the whole fetch round-trip.
//! Each layer converts into the next with `#[from]`, so adapters
//! propagate with `?` and only the cache boundary decides what a
//! failure means downstream.

use thiserror::Error;

/// A payload field failed validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("field {field} is not numeric: {value:?}")]
    NonNumeric { field: &'static str, value: String },

    #[error("previous close is zero")]
    ZeroPreviousClose,

    #[error("price is zero")]
    ZeroPrice,
}

/// An upstream payload could not be turned into a quote record.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response carries no quote payload")]
    MissingPayload,

    #[error("expected at least {expected} fields, got {actual}")]
    NotEnoughFields { expected: usize, actual: usize },

    #[error("malformed JSON payload")]
    Json(#[from] serde_json::Error),

    #[error("rate table has no entry for {0}")]
    MissingRate(String),

    #[error("upstream reported status {0:?}")]
    UpstreamStatus(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A fetch against an upstream failed end to end.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<ValidationError> for FetchError {
    fn from(err: ValidationError) -> Self {
        Self::Parse(ParseError::Invalid(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_nests_through_parse_into_fetch() {
        let fetch: FetchError = ValidationError::ZeroPrice.into();
        assert!(matches!(
            fetch,
            FetchError::Parse(ParseError::Invalid(ValidationError::ZeroPrice))
        ));
    }

    #[test]
    fn messages_name_the_offending_field() {
        let err = ValidationError::NonNumeric {
            field: "price",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("price"));
        assert!(err.to_string().contains("abc"));
    }
}
