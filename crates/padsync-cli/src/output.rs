//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Status messages go to stderr so stdout carries only note content.

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a success message
    pub fn success(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("✓ {}", msg),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "status": "ok", "message": msg }))
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("{}", msg),
            OutputFormat::Json => eprintln!("{}", serde_json::json!({ "message": msg })),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning; shown even in quiet mode
    pub fn warning(&self, msg: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "status": "warning", "message": msg }))
            }
            _ => eprintln!("⚠ {}", msg),
        }
    }
}
