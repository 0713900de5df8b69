//! Common serde default value functions
//!
//! Used across encounter, reward and item definitions to avoid duplication.

/// Default for enabled fields
pub fn default_true() -> bool {
    true
}

/// Default multiplier (no scaling)
pub fn default_multiplier() -> f64 {
    1.0
}

/// Default item amount
pub fn default_amount() -> u32 {
    1
}
