//! Core types and trait definitions for the Strand federation protocol.
//!
//! No XML, HTTP, or database dependencies live here.
//! All other crates depend on it.

// Store futures spell out their `Send` bounds explicitly.
#![allow(async_fn_in_trait)]

pub mod aspect;
pub mod content;
pub mod error;
pub mod message;
pub mod person;
pub mod request;
pub mod retraction;
pub mod store;

pub use error::{Error, Result};
