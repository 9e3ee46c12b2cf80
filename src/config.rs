use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: ModelConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

/// Parameters of the segregation model itself.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Number of agents of each of the two kinds.
    pub n_agents_per_type: usize,
    /// Number of nearest other agents considered as neighbors.
    pub n_neighbors: usize,
    /// Minimum number of same-kind neighbors for an agent to be happy.
    pub require_same_type: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_agents_per_type: 250,
            n_neighbors: 10,
            require_same_type: 5,
        }
    }
}

/// Bounds and seeding of a single run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seed of the random number generator (OS entropy if absent).
    pub seed: Option<u64>,
    /// Maximum number of sweeps before giving up.
    pub max_sweeps: usize,
    /// Maximum number of location draws for a single relocation.
    pub max_attempts: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_sweeps: 1000,
            max_attempts: 1_000_000,
        }
    }
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Write an SVG scatter plot of the population at every cycle.
    pub svg: bool,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Total number of agents in the population.
    pub fn n_agents(&self) -> usize {
        2 * self.model.n_agents_per_type
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.model.n_agents_per_type, 1..100_000)
            .context("invalid number of agents per type")?;
        self.validate_neighborhood(self.n_agents())?;

        check_num(self.run.max_sweeps, 1..=1_000_000).context("invalid maximum number of sweeps")?;
        check_num(self.run.max_attempts, 1..=100_000_000)
            .context("invalid maximum number of relocation attempts")?;

        Ok(())
    }

    /// Check the neighborhood parameters against a population of `n_agents`.
    pub fn validate_neighborhood(&self, n_agents: usize) -> Result<()> {
        check_num(self.model.n_neighbors, 0..n_agents).context("invalid number of neighbors")?;
        check_num(self.model.require_same_type, 0..=self.model.n_neighbors)
            .context("invalid required number of same-type neighbors")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
