//! Core document model for docload.
//!
//! This crate defines:
//! - [`Value`]: the recursive document value model (JSON plus raw bytes)
//! - [`codec`]: reversible field transforms (base64 decode, zstd compression)
//! - [`condition`]: the `FIELD OP VALUE` filter grammar and scalar inference
//! - [`Error`]: transform and parse errors
//!
//! Nothing in here touches a backing store; the store adapters in
//! `docload-store` call into this crate on the way in and out.

pub mod codec;
pub mod condition;
mod error;
mod value;

pub use condition::{Condition, Op};
pub use error::{Error, Result};
pub use value::Value;
