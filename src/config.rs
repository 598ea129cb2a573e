use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{atomic::ShiftMode, Error, Result};

/// Thermostat settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NvtConfig {
    pub kt: f64,
    pub tau: f64,
}
impl Default for NvtConfig {
    fn default() -> Self {
        Self { kt: 1.5, tau: 1.0 }
    }
}

/// Lennard-Jones coefficients of one type pair
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PairConfig {
    pub types: [String; 2],
    pub epsilon: f64,
    pub sigma: f64,
    pub r_cut: f64,
}

// Pair potential settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LjConfig {
    pub mode: ShiftMode,
    pub pairs: Vec<PairConfig>,
}
impl Default for LjConfig {
    fn default() -> Self {
        Self {
            mode: ShiftMode::None,
            pairs: vec![PairConfig {
                types: [String::from("A"), String::from("A")],
                epsilon: 1.0,
                sigma: 1.0,
                r_cut: 2.5,
            }],
        }
    }
}

/// Run configuration, loaded from a TOML file.
///
/// Every field is optional; the defaults describe an LJ fluid under NVT
/// for 1000 steps, read from `random.gsd`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Frame to read, negative values count from the end
    pub frame: i64,
    pub steps: u64,
    pub ranks: usize,
    pub seed: u64,
    pub dt: f64,
    /// Neighbor list buffer
    pub buffer: f64,
    /// Draw fresh velocities at this kT before running
    pub thermalize_kt: Option<f64>,
    /// Write the final state here
    pub output: Option<PathBuf>,
    pub nvt: NvtConfig,
    pub lj: LjConfig,
}
impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("random.gsd"),
            frame: -1,
            steps: 1000,
            ranks: 1,
            seed: 0,
            dt: 0.005,
            buffer: 0.4,
            thermalize_kt: None,
            output: None,
            nvt: NvtConfig::default(),
            lj: LjConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads the run configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: RunConfig =
            toml::from_str(s).map_err(|e| Error::Config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that the pieces built from this config would reject
    /// later, so that errors surface before any rank starts
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "{} should be positive, found {}",
                    name, value
                )))
            }
        };
        if self.ranks == 0 {
            return Err(Error::Config(String::from("ranks should be at least 1")));
        }
        positive("dt", self.dt)?;
        positive("nvt.kt", self.nvt.kt)?;
        positive("nvt.tau", self.nvt.tau)?;
        if !(self.buffer >= 0.0 && self.buffer.is_finite()) {
            return Err(Error::Config(format!(
                "buffer should be non-negative, found {}",
                self.buffer
            )));
        }
        if let Some(kt) = self.thermalize_kt {
            positive("thermalize_kt", kt)?;
        }
        for pair in &self.lj.pairs {
            if !(pair.r_cut >= 0.0 && pair.r_cut.is_finite()) {
                return Err(Error::Config(format!(
                    "r_cut of pair ({}, {}) should be non-negative, found {}",
                    pair.types[0], pair.types[1], pair.r_cut
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.steps, 1000);
        assert_eq!(config.lj.pairs[0].r_cut, 2.5);
    }

    #[test]
    fn partial_sections() {
        let config = RunConfig::from_toml_str(
            r#"
            steps = 20
            ranks = 4

            [nvt]
            kt = 2.0

            [lj]
            mode = "shift"
            pairs = [{ types = ["A", "B"], epsilon = 0.5, sigma = 1.1, r_cut = 3.0 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.steps, 20);
        assert_eq!(config.ranks, 4);
        assert_eq!(config.nvt, NvtConfig { kt: 2.0, tau: 1.0 });
        assert_eq!(config.lj.mode, ShiftMode::Shift);
        assert_eq!(config.lj.pairs[0].types[1], "B");
        assert_eq!(config.input, PathBuf::from("random.gsd"));
    }

    #[test]
    fn rejects_unknown_and_invalid_fields() {
        assert!(matches!(
            RunConfig::from_toml_str("stepz = 3"),
            Err(Error::Config(_))
        ));
        assert!(RunConfig::from_toml_str("dt = -0.1").is_err());
        assert!(RunConfig::from_toml_str("ranks = 0").is_err());
        assert!(RunConfig::from_toml_str("[nvt]\ntau = 0.0").is_err());
    }
}
