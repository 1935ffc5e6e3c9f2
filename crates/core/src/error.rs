//! Error types for document transforms and condition parsing.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the field codec and the condition parser
#[derive(Debug, Error)]
pub enum Error {
    /// A field expected to hold base64 text could not be decoded
    #[error("invalid base64 in field '{field}': {source}")]
    Base64 {
        /// Field the malformed payload was found in
        field: String,
        #[source]
        source: base64::DecodeError,
    },

    /// zstd compression or decompression failed
    #[error("compression error in field '{field}': {message}")]
    Compression {
        /// Field being (de)compressed
        field: String,
        /// Underlying codec message
        message: String,
    },

    /// A field named for compression is absent from the document
    #[error("missing field '{field}' requested for compression")]
    MissingField {
        /// The absent field name
        field: String,
    },

    /// A transform hit a field holding an unexpected value type
    #[error("field '{field}' holds a {type_name}, expected a string")]
    FieldType {
        /// Offending field name
        field: String,
        /// Actual value type found
        type_name: &'static str,
    },

    /// Decompressed payload is not valid UTF-8
    #[error("field '{field}' did not decompress to valid UTF-8")]
    Utf8 {
        /// Offending field name
        field: String,
    },

    /// Condition string has no field text before the operator
    #[error("empty field in condition '{condition}'")]
    EmptyConditionField {
        /// The offending condition string
        condition: String,
    },

    /// Condition string has no value text after the operator
    #[error("empty value in condition '{condition}'")]
    EmptyConditionValue {
        /// The offending condition string
        condition: String,
    },

    /// Condition string contains no recognized operator token
    #[error("no recognized operator in condition '{condition}'")]
    UnknownOperator {
        /// The offending condition string
        condition: String,
    },

    /// Operator is valid but not offered by the active backing store
    #[error("operator '{op}' is not supported by the {backend} backend (condition '{condition}')")]
    UnsupportedOperator {
        /// The rejected operator token
        op: &'static str,
        /// Name of the active backend
        backend: &'static str,
        /// The offending condition string
        condition: String,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
