//! Numeric settings shared by all curved features.

use curved_kernel::NativeKernel;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Tolerances and sampling densities.
///
/// Missing fields take their defaults when read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Length below which a distance, box side or scale factor counts as zero.
    pub epsilon: f64,
    /// Samples per curve for numeric plane intersection.
    pub intersection_samples: usize,
    /// Points sampled per edge when two edges must be blended by refitting.
    pub interpolation_points: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            epsilon: 1e-7,
            intersection_samples: 64,
            interpolation_points: 32,
        }
    }
}

impl Settings {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Kernel configured with these settings.
    pub fn native_kernel(&self) -> NativeKernel {
        NativeKernel::new(self.intersection_samples).with_tolerance(self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_defaults() {
        let settings = Settings::from_json(r#"{ "epsilon": 1e-6 }"#).unwrap();
        assert_eq!(settings.epsilon, 1e-6);
        assert_eq!(settings.intersection_samples, 64);
        assert_eq!(settings.interpolation_points, 32);

        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_settings_bad_json() {
        assert!(Settings::from_json("{ epsilon: }").is_err());
    }

    #[test]
    fn test_native_kernel_from_settings() {
        let kernel = Settings::default().native_kernel();
        assert_eq!(kernel.intersection_samples, 64);
        assert_eq!(kernel.tolerance.linear, 1e-7);
    }
}
