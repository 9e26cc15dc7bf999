//! Shared type definitions
//!
//! Data model shared by the upload, dataset, evaluation and storage layers.

pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod file;
pub mod model;
