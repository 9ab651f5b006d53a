use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{
    Anchor, AnchorRegistry, RegistryError, CLAMP_EPSILON, DEDUP_EPSILON, DETERMINANT_EPSILON, MIN_SAMPLES,
};

/// Tunable parameters of the position estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Overlap forced onto circle pairs that do not meet (meters)
    pub clamp_epsilon: f64,
    /// Coordinate tolerance for merging candidate intersection pairs (meters)
    pub dedup_epsilon: f64,
    /// Smallest |det| accepted by the three-anchor solver
    pub determinant_epsilon: f64,
    /// Iteration budget for least-squares refinement
    pub max_iterations: usize,
    /// Cost / step change under which refinement stops
    pub convergence_tolerance: f64,
    /// Minimum usable samples for a fix (at least 3)
    pub min_samples: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            clamp_epsilon: CLAMP_EPSILON,
            dedup_epsilon: DEDUP_EPSILON,
            determinant_epsilon: DETERMINANT_EPSILON,
            max_iterations: 100,
            convergence_tolerance: 1e-12,
            min_samples: MIN_SAMPLES,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("clamp_epsilon", self.clamp_epsilon),
            ("dedup_epsilon", self.dedup_epsilon),
            ("determinant_epsilon", self.determinant_epsilon),
            ("convergence_tolerance", self.convergence_tolerance),
        ];

        for (parameter, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    parameter: parameter.to_string(),
                    value: value.to_string(),
                    reason: "must be finite and positive".to_string(),
                });
            }
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_iterations".to_string(),
                value: "0".to_string(),
                reason: "at least one iteration is required".to_string(),
            });
        }

        if self.min_samples < MIN_SAMPLES {
            return Err(ConfigError::InvalidParameter {
                parameter: "min_samples".to_string(),
                value: self.min_samples.to_string(),
                reason: format!("a 2D fix needs at least {} ranges", MIN_SAMPLES),
            });
        }

        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },

    #[error("{message}")]
    IoError { message: String },

    #[error("{message}")]
    SerializationError { message: String },

    #[error("invalid anchor set: {0}")]
    Registry(#[from] RegistryError),
}

/// On-disk configuration document
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFileData {
    #[serde(default)]
    estimator: EstimatorConfig,
    anchors: Vec<Anchor>,
}

/// Validated estimator settings plus the anchor layout they apply to
#[derive(Debug, Clone)]
pub struct ConfigurationManager {
    estimator_config: EstimatorConfig,
    registry: AnchorRegistry,
    config_file_path: Option<String>,
    warnings: Vec<String>,
}

impl ConfigurationManager {
    /// Build from already-parsed parts
    pub fn new(estimator_config: EstimatorConfig, anchors: Vec<Anchor>) -> Result<Self, ConfigError> {
        estimator_config.validate()?;
        let warnings = check_anchor_geometry(&anchors, estimator_config.dedup_epsilon);
        let registry = AnchorRegistry::new(anchors)?;

        for warning in &warnings {
            warn!(%warning, "suspicious anchor layout");
        }

        Ok(Self {
            estimator_config,
            registry,
            config_file_path: None,
            warnings,
        })
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let data: ConfigFileData = serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse configuration: {}", e),
        })?;

        Self::new(data.estimator, data.anchors)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let mut manager = Self::from_json_str(&content)?;
        info!(
            path = %path_str,
            anchors = manager.registry.len(),
            "loaded anchor configuration"
        );
        manager.config_file_path = Some(path_str);
        Ok(manager)
    }

    /// Re-read the file this configuration came from.
    ///
    /// The registry is replaced as a whole; on error the current one is kept.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let path = self.config_file_path.clone().ok_or_else(|| ConfigError::IoError {
            message: "No file path set for reloading configuration".to_string(),
        })?;

        *self = Self::from_file(&path)?;
        debug!(path = %path, "configuration reloaded");
        Ok(())
    }

    pub fn estimator_config(&self) -> &EstimatorConfig {
        &self.estimator_config
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    /// Geometry warnings found while loading
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }
}

/// Layout problems that do not prevent loading but hurt the fix
fn check_anchor_geometry(anchors: &[Anchor], min_spacing: f64) -> Vec<String> {
    let mut warnings = Vec::new();

    if anchors.len() < MIN_SAMPLES {
        warnings.push(format!(
            "only {} anchors configured; at least {} are needed for a fix",
            anchors.len(),
            MIN_SAMPLES
        ));
    }

    for (i, first) in anchors.iter().enumerate() {
        for second in &anchors[i + 1..] {
            if first.id != second.id && first.position.distance_to(&second.position) <= min_spacing {
                warnings.push(format!("anchors {} and {} are coincident", first.id, second.id));
            }
        }
    }

    if anchors.len() >= MIN_SAMPLES && all_collinear(anchors) {
        warnings.push("all anchors are collinear; three-range fixes will be degenerate".to_string());
    }

    warnings
}

fn all_collinear(anchors: &[Anchor]) -> bool {
    let origin = anchors[0].position.to_vector();

    // Longest baseline from the first anchor sets the reference direction
    let Some(reference) = anchors
        .iter()
        .map(|a| a.position.to_vector() - origin)
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))
    else {
        return true;
    };

    let baseline = reference.norm();
    if baseline == 0.0 {
        return true;
    }

    anchors.iter().all(|a| {
        let offset = a.position.to_vector() - origin;
        reference.perp(&offset).abs() <= 1e-6 * baseline * offset.norm().max(1.0)
    })
}
