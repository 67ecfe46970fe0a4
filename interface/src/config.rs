//! TOML configuration for the arm cycling session.
//!
//! Every section is optional; missing keys take the built-in defaults.
//!
//! ```toml
//! [control]
//! rate_hz = 50.0
//! phase_policy = "restart_on_start"   # or "continuous"
//!
//! [setup]
//! open_fraction = 1.0
//! settle_ms = 2000
//!
//! [trajectory.el0]
//! base = 1.8
//! amplitude = 0.15
//! frequency_hz = 0.08
//!
//! [robot]
//! name = "spot"
//! connect = ["tcp/192.168.80.3:7447"]
//! query_timeout_ms = 2000
//! ```

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use brain::{LoopConfig, PhasePolicy, SetupConfig};
use kinematics::TrajectoryParams;
use log::info;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub control: ControlSection,
    pub setup: SetupSection,
    pub trajectory: TrajectoryParams,
    pub robot: RobotSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlSection {
    pub rate_hz: f64,
    pub phase_policy: PhasePolicy,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            rate_hz: brain::scheduler::DEFAULT_RATE_HZ,
            phase_policy: PhasePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupSection {
    pub open_fraction: f64,
    pub settle_ms: u64,
}

impl Default for SetupSection {
    fn default() -> Self {
        Self {
            open_fraction: 1.0,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotSection {
    /// Key expression prefix, `rt/<name>/...`.
    pub name: String,
    /// Zenoh endpoints to connect to. Empty means peer discovery.
    pub connect: Vec<String>,
    pub query_timeout_ms: u64,
}

impl Default for RobotSection {
    fn default() -> Self {
        Self {
            name: "spot".to_string(),
            connect: Vec::new(),
            query_timeout_ms: 2000,
        }
    }
}

impl RobotSection {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl AppConfig {
    /// Reads `path`, or falls back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map_err(|source| AppError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.trajectory.validate()?;
        self.loop_config()?;
        if !(0.0..=1.0).contains(&self.setup.open_fraction) {
            return Err(AppError::Config(format!(
                "setup.open_fraction must be within [0, 1], got {}",
                self.setup.open_fraction
            )));
        }
        if self.robot.name.is_empty() || self.robot.name.contains(['/', '*', '$', '?', '#']) {
            return Err(AppError::Config(format!(
                "robot.name {:?} is not a valid key expression chunk",
                self.robot.name
            )));
        }
        Ok(())
    }

    pub fn loop_config(&self) -> Result<LoopConfig, AppError> {
        Ok(LoopConfig::new(
            self.control.rate_hz,
            self.control.phase_policy,
        )?)
    }

    pub fn setup_config(&self) -> SetupConfig {
        SetupConfig {
            open_fraction: self.setup.open_fraction,
            settle: Duration::from_millis(self.setup.settle_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics::OscillatorParams;

    #[test]
    fn test_empty_config_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.trajectory, TrajectoryParams::default());
        assert!(config.validate().is_ok());

        let setup = config.setup_config();
        assert_eq!(setup.open_fraction, 1.0);
        assert_eq!(setup.settle, Duration::from_secs(2));
        assert_eq!(config.loop_config().unwrap().period(), Duration::from_millis(20));
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::parse(
            r#"
            [control]
            rate_hz = 100.0
            phase_policy = "continuous"

            [trajectory.el0]
            base = 1.5
            amplitude = 0.2
            frequency_hz = 0.1

            [robot]
            name = "arm1"
            connect = ["tcp/10.0.0.2:7447"]
            "#,
        )
        .unwrap();

        assert_eq!(config.control.rate_hz, 100.0);
        assert_eq!(config.control.phase_policy, PhasePolicy::Continuous);
        assert_eq!(config.trajectory.el0, OscillatorParams::new(1.5, 0.2, 0.1, 0.0));
        assert_eq!(config.trajectory.sh0, TrajectoryParams::default().sh0);
        assert_eq!(config.robot.connect, vec!["tcp/10.0.0.2:7447".to_string()]);
        assert_eq!(config.robot.query_timeout_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(AppConfig::parse("[control]\nrate = 5.0\n").is_err());
        assert!(
            AppConfig::parse("[trajectory.elbow]\nbase = 2.5\namplitude = 0.1\nfrequency_hz = 0.1\n")
                .is_err()
        );
        assert!(
            AppConfig::parse(
                "[trajectory.el0]\nbase = 1.8\namplitude = 0.15\nfrequency_hz = 0.08\nphase = 1.0\n"
            )
            .is_err()
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AppConfig::parse("[control]\nrate_hz = 0.0\n").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Loop(_))));

        let config = AppConfig::parse(
            "[trajectory.gripper]\nbase = 0.8\namplitude = 0.5\nfrequency_hz = 0.5\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(AppError::Params(_))));

        let config = AppConfig::parse(
            "[trajectory.wr1]\nbase = 0.0\namplitude = 0.1\nfrequency_hz = 0.3\nphase_offset = 1.5707963267948966\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(AppError::Params(_))));

        let config = AppConfig::parse("[setup]\nopen_fraction = 1.5\n").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = AppConfig::parse("[robot]\nname = \"a/b\"\n").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("arm_cycle_config_that_does_not_exist.toml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
