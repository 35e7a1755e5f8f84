use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::symbology::FormatSet;

/// Which camera to prefer when several are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front / selfie camera.
    User,
    /// Rear camera.
    Environment,
}

/// Hardware request passed to `CameraProvider::acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing: FacingMode,

    /// Preferred capture resolution (width, height); the host may pick another.
    pub ideal_resolution: Option<(u32, u32)>,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_resolution: Some((1280, 720)),
        }
    }
}

/// Configuration for a scan controller.
#[derive(Debug, Clone)]
pub struct ScannerConfiguration {
    /// Interval between live frame samples (default: 100ms, i.e. 10 per second).
    pub sample_interval: Duration,

    /// How long a camera session waits for its render surface before failing.
    pub surface_wait_timeout: Duration,

    /// Symbol formats a decode may report.
    pub formats: FormatSet,

    pub constraints: CameraConstraints,

    /// Consecutive decoder faults after which a live stream is considered unusable.
    pub max_consecutive_faults: u32,

    /// Report caller-driven cancellation as `ScanOutcome::Cancelled` instead of
    /// staying silent (default: false).
    pub report_cancellation: bool,
}

impl ScannerConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_interval.is_zero() {
            return Err("sample interval must be positive".into());
        }
        if self.surface_wait_timeout.is_zero() {
            return Err("surface wait timeout must be positive".into());
        }
        if self.formats.is_empty() {
            return Err("at least one symbol format must be enabled".into());
        }
        if self.max_consecutive_faults == 0 {
            return Err("max consecutive faults must be at least 1".into());
        }
        if let Some((w, h)) = self.constraints.ideal_resolution {
            if w == 0 || h == 0 {
                return Err(format!("unsupported resolution: {w}x{h}"));
            }
        }
        Ok(())
    }
}

impl Default for ScannerConfiguration {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(100),
            surface_wait_timeout: Duration::from_millis(500),
            formats: FormatSet::retail_and_matrix(),
            constraints: CameraConstraints::default(),
            max_consecutive_faults: 30,
            report_cancellation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ScannerConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.constraints.facing, FacingMode::Environment);
    }

    #[test]
    fn rejects_empty_allow_list() {
        let config = ScannerConfiguration {
            formats: FormatSet::empty(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("symbol format"));
    }

    #[test]
    fn rejects_zero_durations() {
        let config = ScannerConfiguration {
            sample_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScannerConfiguration {
            surface_wait_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_fault_budget() {
        let config = ScannerConfiguration {
            max_consecutive_faults: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
