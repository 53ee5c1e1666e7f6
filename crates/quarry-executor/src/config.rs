use anyhow::Context;
use quarry_pattern::NormalizeLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the query compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Upper bound on the disjuncts a query may normalize to
    pub max_disjuncts: usize,
    /// Order fragment sets by estimated cost (otherwise: emission order)
    pub order_fragments: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_disjuncts: NormalizeLimits::default().max_disjuncts,
            order_fragments: true,
        }
    }
}

impl CompilerConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid compiler config")
    }

    pub fn normalize_limits(&self) -> NormalizeLimits {
        NormalizeLimits {
            max_disjuncts: self.max_disjuncts,
        }
    }
}
