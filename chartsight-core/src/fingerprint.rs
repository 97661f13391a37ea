//! Analysis fingerprinting — deterministic identity of an analysis input.
//!
//! - `image`: blake3 of the raster dimensions and bytes.
//! - `config`: blake3 of the canonical JSON of the [`AnalysisConfig`].
//!
//! Two cycles with equal fingerprints must produce equal decisions.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::RasterImage;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisFingerprint {
    pub image: String,
    pub config: String,
}

impl AnalysisFingerprint {
    pub fn new(image: &RasterImage, config: &AnalysisConfig) -> Self {
        Self {
            image: image.fingerprint(),
            config: config_hash(config),
        }
    }

    /// Short combined id, stable across runs.
    pub fn short_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.image.as_bytes());
        hasher.update(self.config.as_bytes());
        hasher.finalize().to_hex()[..16].to_string()
    }
}

/// Struct fields serialize in declaration order, so the JSON is canonical.
pub fn config_hash(config: &AnalysisConfig) -> String {
    let json = serde_json::to_vec(config).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rgb;

    #[test]
    fn hashing_is_deterministic() {
        let img = RasterImage::filled(8, 8, Rgb::new(1, 2, 3));
        let cfg = AnalysisConfig::default();
        assert_eq!(AnalysisFingerprint::new(&img, &cfg), AnalysisFingerprint::new(&img, &cfg));
        assert_eq!(AnalysisFingerprint::new(&img, &cfg).short_id().len(), 16);
    }

    #[test]
    fn config_changes_change_hash() {
        let a = AnalysisConfig::default();
        let mut b = AnalysisConfig::default();
        b.gate.enter_threshold = 70.0;
        assert_ne!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn image_changes_change_hash() {
        let cfg = AnalysisConfig::default();
        let a = RasterImage::filled(8, 8, Rgb::new(1, 2, 3));
        let mut b = a.clone();
        b.set_pixel(0, 0, Rgb::new(9, 9, 9));
        assert_ne!(AnalysisFingerprint::new(&a, &cfg).image, AnalysisFingerprint::new(&b, &cfg).image);
    }
}
