//! Configuration types
//!
//! Building blocks of the application settings.

use serde::{Deserialize, Serialize};

/// An external command: program plus fixed leading arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable to run (resolved through PATH)
    pub program: String,
    /// Arguments placed before the per-call arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// True when no program is configured
    pub fn is_empty(&self) -> bool {
        self.program.trim().is_empty()
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
