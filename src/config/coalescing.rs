//! Coalescing configuration types.
//!
//! Request coalescing collapses identical concurrent cache misses into one
//! fetch and transform. Default: enabled.

use serde::{Deserialize, Serialize};

/// Default enabled state
fn default_enabled() -> bool {
    true
}

/// Request coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoalescingConfig {
    /// Enable request coalescing (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for CoalescingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}
