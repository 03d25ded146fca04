//!
//! Common types and utilities shared by the feed server and client.
//!
//! This crate aggregates:
//! - `error`: unified error type `FeedError` used across the workspace.
//! - `result`: handy `Result<T, FeedError>` alias.
//! - `symbols`: seed table for the instrument universe and symbol-file parsing.
//! - `quote`: the outbound `Quote` payload.
//! - `message`: named-event envelopes exchanged over a session.
//! - `net`: networking constants and configuration defaults.
#![warn(missing_docs)]
pub mod error;
pub mod message;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;

pub use error::FeedError;
pub use message::{ClientEvent, ClientMessage, ServerEvent};
pub use quote::Quote;
pub use result::Result;
