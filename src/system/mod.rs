//! System utilities
//!
//! Host inspection used to label measured benchmark runs.

pub mod hardware;
