//! Injector plugin configuration.

use serde::Deserialize;

/// Compile-time plugin configuration.
///
/// No options are currently recognized; the shape is reserved for future
/// extension. Unknown keys are rejected so that a typo'd option fails loudly
/// instead of being silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectorConfig {}

impl InjectorConfig {
    /// Parse a configuration object from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
