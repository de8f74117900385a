//! Configuration loading and schema definitions
//!
//! Shared configuration for the tracker CLI and the tracking engine.

#![allow(missing_docs)]

mod loader;
mod schema;

pub use loader::{validate, Config, ENV_API_TOKEN, ENV_API_URL, ENV_DIRECTIONS_KEY, ENV_FEED_URL};
pub use schema::*;
