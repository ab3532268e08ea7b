//! Build parameters.

use bvhtrace::node::MAX_LEAF_COUNT;
use bvhtrace::Triangle4;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Largest leaf the node encoding can address, in triangles.
pub const MAX_LEAF_TRIANGLES: usize = MAX_LEAF_COUNT as usize * Triangle4::WIDTH;

/// How a set of triangles is split in two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Binned surface area heuristic.
    #[default]
    Sah,
    /// Split at the centroid median along the widest axis.
    Median,
}

/// Hierarchy build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Largest number of triangles placed in one leaf.
    pub max_leaf_triangles: usize,
    /// Split strategy for interior nodes.
    pub split: SplitMethod,
    /// Centroid buckets per axis for [`SplitMethod::Sah`].
    pub sah_buckets: usize,
    /// Cost of one node visit relative to one triangle test.
    pub traversal_cost: f32,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 4,
            split: SplitMethod::Sah,
            sah_buckets: 12,
            traversal_cost: 0.125,
        }
    }
}

impl BuildSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_triangles == 0 || self.max_leaf_triangles > MAX_LEAF_TRIANGLES {
            return Err(BuildError::InvalidSettings(format!(
                "max_leaf_triangles must be between 1 and {MAX_LEAF_TRIANGLES}"
            )));
        }
        if self.sah_buckets < 2 || self.sah_buckets > 256 {
            return Err(BuildError::InvalidSettings(
                "sah_buckets must be between 2 and 256".into(),
            ));
        }
        if !self.traversal_cost.is_finite() || self.traversal_cost < 0.0 {
            return Err(BuildError::InvalidSettings(
                "traversal_cost must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Parse settings from TOML; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }
}
