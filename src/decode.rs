//! Decode strategies: turning a fetched body into a typed result
//!
//! A task selects at most one [`DecodeStrategy`]:
//!
//! - [`DecodeStrategy::Structured`] maps the body onto a `Deserialize` type.
//!   Unknown fields in the body are ignored, so a server adding fields never
//!   breaks a client.
//! - [`DecodeStrategy::Custom`] hands the body to a caller-supplied function.
//! - [`DecodeStrategy::None`] returns the raw body. Only valid when the task's
//!   result type is `Vec<u8>` or `String`.
//!
//! Every failure, including a panic inside a custom decoder, comes back as a
//! [`FetchError`] with kind `DecodeSyntaxError` or `DecodeSemanticError`.

use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use thiserror::Error;

use crate::error::FetchError;

/// Failure returned by a custom decoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    /// The body is not valid in the expected serialization
    #[error("{0}")]
    Syntax(String),
    /// The body parsed but does not describe a valid value
    #[error("{0}")]
    Semantic(String),
}

impl From<DecodeFailure> for FetchError {
    fn from(failure: DecodeFailure) -> Self {
        match failure {
            DecodeFailure::Syntax(message) => FetchError::decode_syntax(message),
            DecodeFailure::Semantic(message) => FetchError::decode_semantic(message),
        }
    }
}

impl From<serde_json::Error> for DecodeFailure {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() {
            DecodeFailure::Semantic(e.to_string())
        } else {
            DecodeFailure::Syntax(e.to_string())
        }
    }
}

impl From<std::str::Utf8Error> for DecodeFailure {
    fn from(e: std::str::Utf8Error) -> Self {
        DecodeFailure::Syntax(format!("body is not valid UTF-8: {}", e))
    }
}

/// Schema-directed decode into `R`
pub struct StructuredDecode<R> {
    format: &'static str,
    decode: fn(&[u8]) -> Result<R, FetchError>,
}

impl<R: DeserializeOwned> StructuredDecode<R> {
    /// Decode the body as JSON into `R`
    pub fn json() -> Self {
        Self {
            format: "json",
            decode: decode_json::<R>,
        }
    }
}

impl<R> StructuredDecode<R> {
    /// Name of the serialization format
    pub fn format(&self) -> &'static str {
        self.format
    }
}

impl<R> Clone for StructuredDecode<R> {
    fn clone(&self) -> Self {
        Self {
            format: self.format,
            decode: self.decode,
        }
    }
}

impl<R> std::fmt::Debug for StructuredDecode<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredDecode")
            .field("format", &self.format)
            .field("target", &std::any::type_name::<R>())
            .finish()
    }
}

fn decode_json<R: DeserializeOwned>(body: &[u8]) -> Result<R, FetchError> {
    serde_json::from_slice(body).map_err(FetchError::from)
}

type DecodeFn<R> = dyn Fn(&[u8]) -> Result<Option<R>, DecodeFailure> + Send + Sync;

/// Caller-supplied decode function
pub struct CustomDecode<R> {
    decode: Arc<DecodeFn<R>>,
}

impl<R> CustomDecode<R> {
    /// Decode the raw body with `f`
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<R, DecodeFailure> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(move |body: &[u8]| f(body).map(Some)),
        }
    }

    /// Decode the body as UTF-8 text with `f`
    ///
    /// A body that is not valid UTF-8 fails with `DecodeSyntaxError` before
    /// `f` runs.
    pub fn text<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<R, DecodeFailure> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(move |body: &[u8]| {
                let text = std::str::from_utf8(body)?;
                f(text).map(Some)
            }),
        }
    }

    /// Decode with a function that may produce no value
    ///
    /// `Ok(None)` is reported as `DecodeSemanticError`; a task never
    /// delivers an absent result.
    pub fn optional<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Option<R>, DecodeFailure> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(f),
        }
    }
}

impl<R> Clone for CustomDecode<R> {
    fn clone(&self) -> Self {
        Self {
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<R> std::fmt::Debug for CustomDecode<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomDecode")
            .field("target", &std::any::type_name::<R>())
            .finish_non_exhaustive()
    }
}

/// How a task turns its response body into `R`
pub enum DecodeStrategy<R> {
    /// Schema-directed decode
    Structured(StructuredDecode<R>),
    /// Caller-supplied function
    Custom(CustomDecode<R>),
    /// Raw body, for `R = Vec<u8>` or `R = String`
    None,
}

impl<R> std::fmt::Debug for DecodeStrategy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeStrategy::Structured(s) => f.debug_tuple("Structured").field(s).finish(),
            DecodeStrategy::Custom(c) => f.debug_tuple("Custom").field(c).finish(),
            DecodeStrategy::None => f.write_str("None"),
        }
    }
}

impl<R> Clone for DecodeStrategy<R> {
    fn clone(&self) -> Self {
        match self {
            DecodeStrategy::Structured(s) => DecodeStrategy::Structured(s.clone()),
            DecodeStrategy::Custom(c) => DecodeStrategy::Custom(c.clone()),
            DecodeStrategy::None => DecodeStrategy::None,
        }
    }
}

impl<R: DeserializeOwned> DecodeStrategy<R> {
    /// Structured JSON decode into `R`
    pub fn json() -> Self {
        DecodeStrategy::Structured(StructuredDecode::json())
    }
}

impl<R: 'static> DecodeStrategy<R> {
    /// Custom decode of the raw body with `f`
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<R, DecodeFailure> + Send + Sync + 'static,
    {
        DecodeStrategy::Custom(CustomDecode::new(f))
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            DecodeStrategy::Structured(s) => s.format(),
            DecodeStrategy::Custom(_) => "custom",
            DecodeStrategy::None => "raw",
        }
    }

    /// Decode `body` into `R`
    ///
    /// Never panics: a panic inside a decoder is caught and reported as
    /// `DecodeSemanticError`.
    pub fn decode(&self, body: Vec<u8>) -> Result<R, FetchError> {
        match self {
            DecodeStrategy::Structured(s) => {
                catch_unwind(AssertUnwindSafe(|| (s.decode)(&body)))
                    .unwrap_or_else(|panic| Err(decoder_panicked(panic)))
            }
            DecodeStrategy::Custom(c) => {
                match catch_unwind(AssertUnwindSafe(|| (c.decode)(&body))) {
                    Ok(Ok(Some(value))) => Ok(value),
                    Ok(Ok(None)) => Err(FetchError::decode_semantic(
                        "decoder produced no value",
                    )),
                    Ok(Err(failure)) => Err(failure.into()),
                    Err(panic) => Err(decoder_panicked(panic)),
                }
            }
            DecodeStrategy::None => raw_body(body),
        }
    }
}

fn raw_body<R: 'static>(body: Vec<u8>) -> Result<R, FetchError> {
    let raw: Box<dyn Any> = if TypeId::of::<R>() == TypeId::of::<String>() {
        let text = String::from_utf8(body).map_err(|e| {
            FetchError::decode_syntax(format!("body is not valid UTF-8: {}", e.utf8_error()))
        })?;
        Box::new(text)
    } else {
        Box::new(body)
    };

    raw.downcast::<R>().map(|value| *value).map_err(|_| {
        FetchError::decode_semantic(format!(
            "no decode strategy selected and {} is not a raw body type",
            std::any::type_name::<R>()
        ))
    })
}

fn decoder_panicked(panic: Box<dyn Any + Send>) -> FetchError {
    FetchError::decode_semantic(format!("decoder panicked: {}", panic_detail(panic.as_ref())))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_detail(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
