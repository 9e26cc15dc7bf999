//! ModelBench Library
//!
//! Upload, inspection and evaluation pipeline behind the ModelBench
//! comparison dashboard.

pub mod api;
pub mod dataset;
pub mod evaluation;
pub mod storage;
pub mod system;
pub mod types;
