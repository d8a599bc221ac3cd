//! Configuration module
//!
//! Handles CLI configuration: where the gateway lives and how the output
//! is rendered.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the gateway service
    pub gateway_url: String,

    /// Print raw JSON responses instead of formatted text
    pub json: bool,
}
