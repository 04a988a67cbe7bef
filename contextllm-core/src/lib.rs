//! Core types and state for ContextLLM
//!
//! This crate holds the conversation data model, the session registry,
//! the event bus shared by the text and voice paths, and the ambient
//! configuration / logging / preference layers used by the other crates.

pub mod bus;
pub mod config;
pub mod error;
pub mod logging;
pub mod preferences;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
