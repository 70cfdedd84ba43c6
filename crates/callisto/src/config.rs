//! Workspace configuration.
//!
//! Loaded from `.callisto/config.yaml` when present. Every field has a
//! default, so a partial file only overrides what it names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the per-workspace Callisto directory
pub const CALLISTO_DIR_NAME: &str = ".callisto";

/// Name of the configuration file inside [`CALLISTO_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// File discovery settings
    pub index: IndexConfig,
    /// Algorithm thresholds and size gates
    pub analysis: AnalysisConfig,
    /// Trend forecasting settings
    pub forecast: ForecastConfig,
}

/// File discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory names skipped anywhere in the tree
    pub exclude_dirs: Vec<String>,
    /// Descend into dot-directories
    pub include_hidden: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: [
                "target",
                "node_modules",
                "vendor",
                "bin",
                "obj",
                "build",
                "dist",
                "__pycache__",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            include_hidden: false,
        }
    }
}

/// Algorithm thresholds and size gates.
///
/// The size gates bound the cost of the expensive exact algorithms. Above a
/// gate the algorithm is skipped or approximated, never run unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Total degree above which a symbol counts as a god component
    pub god_degree_threshold: u32,
    /// Largest graph for which betweenness is computed exactly
    pub exact_betweenness_max_nodes: usize,
    /// Floor on sampled betweenness pivots
    pub min_betweenness_samples: usize,
    /// PageRank damping factor
    pub pagerank_damping: f64,
    /// Largest graph for which propagation cost (transitive closure) is computed
    pub propagation_cost_max_nodes: usize,
    /// Largest component handed to the eigenvector solver
    pub spectral_max_nodes: usize,
    /// Recursion depth for spectral bisection
    pub spectral_max_depth: u32,
    /// Largest graph for which boundary min-cuts are computed
    pub mincut_max_nodes: usize,
    /// Layers an edge may climb upward before it counts as a violation
    pub allowed_layer_skip: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            god_degree_threshold: 20,
            exact_betweenness_max_nodes: 1000,
            min_betweenness_samples: 50,
            pagerank_damping: 0.85,
            propagation_cost_max_nodes: 500,
            spectral_max_nodes: 2000,
            spectral_max_depth: 3,
            mincut_max_nodes: 5000,
            allowed_layer_skip: 0,
        }
    }
}

/// Warning and critical levels for one tracked metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricThreshold {
    /// Level at which the metric is worth watching
    pub warning: f64,
    /// Level at which the metric is an alert
    pub critical: f64,
    /// `true` when larger values are healthier (thresholds are floors)
    pub higher_is_better: bool,
}

impl MetricThreshold {
    /// Threshold where larger values are worse.
    #[must_use]
    pub const fn ceiling(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            higher_is_better: false,
        }
    }

    /// Threshold where smaller values are worse.
    #[must_use]
    pub const fn floor(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            higher_is_better: true,
        }
    }
}

/// Trend forecasting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    /// Snapshots ahead to project
    pub horizon: u32,
    /// Thresholds keyed by snapshot metric name
    pub thresholds: BTreeMap<String, MetricThreshold>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let thresholds = [
            ("health_score", MetricThreshold::floor(60.0, 40.0)),
            ("avg_complexity", MetricThreshold::ceiling(20.0, 30.0)),
            ("cycles", MetricThreshold::ceiling(5.0, 10.0)),
            ("brain_methods", MetricThreshold::ceiling(5.0, 10.0)),
            ("god_components", MetricThreshold::ceiling(3.0, 5.0)),
            ("dead_exports", MetricThreshold::ceiling(20.0, 50.0)),
        ]
        .into_iter()
        .map(|(name, t)| (name.to_string(), t))
        .collect();

        Self {
            horizon: 30,
            thresholds,
        }
    }
}

impl Config {
    /// Path of the config file for a workspace.
    #[must_use]
    pub fn path_for(workspace_root: &Path) -> PathBuf {
        workspace_root.join(CALLISTO_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the workspace config, falling back to defaults when no file exists.
    pub fn load_or_default(workspace_root: &Path) -> Result<Self> {
        let path = Self::path_for(workspace_root);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let damping = self.analysis.pagerank_damping;
        if !(0.0..1.0).contains(&damping) {
            return Err(Error::Config(format!(
                "pagerank_damping must be in [0, 1), got {damping}"
            )));
        }
        if self.analysis.min_betweenness_samples == 0 {
            return Err(Error::Config(
                "min_betweenness_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
