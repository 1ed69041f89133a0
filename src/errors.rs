//!
//! src/errors.rs
//!
//! Defines the error enum and conversions used by the store,
//! the controller and the shell
//!

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TrackId;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("config error: {0}")]
    Config(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("store unreadable at {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: std::io::Error },
    #[error("track not found: {0}")]
    NotFound(TrackId),
    #[error("no identifier left after {0}")]
    IdsExhausted(TrackId),
    #[error("changes not saved to {}: {reason}", .path.display())]
    Persist { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self { CatalogError::Parse(e.to_string()) }
}
