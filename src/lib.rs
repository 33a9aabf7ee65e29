// rams-document-service/src/lib.rs

pub mod composition;
pub mod config;
pub mod error;
pub mod generators;
pub mod library;
pub mod method_statement;
pub mod models;
pub mod pipeline;
pub mod preview;
pub mod renderers;
pub mod scoring;
pub mod session_file;
pub mod store;

pub use error::{RamsError, Result};
