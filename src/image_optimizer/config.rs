use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Quality used when a request leaves quality at 0
    #[serde(default = "default_quality")]
    pub default_quality: u8,

    /// Largest upstream body accepted, in bytes
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
            max_source_bytes: default_max_source_bytes(),
        }
    }
}

fn default_quality() -> u8 {
    85
}

fn default_max_source_bytes() -> u64 {
    20 * 1024 * 1024 // 20MB
}

impl ImageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.default_quality) {
            return Err(format!(
                "image.default_quality must be between 1 and 100, got {}",
                self.default_quality
            ));
        }
        if self.max_source_bytes == 0 {
            return Err("image.max_source_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}
