use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Message-passing architecture of the edge classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Graph isomorphism network with edge features (GINE)
    Gin,
    /// Multi-head graph attention with edge features
    Gat,
    /// Principal neighbourhood aggregation
    Pna,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Gin => "gin",
            ModelFamily::Gat => "gat",
            ModelFamily::Pna => "pna",
        }
    }

    /// Only attention models take a head count.
    pub fn uses_heads(&self) -> bool {
        matches!(self, ModelFamily::Gat)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gin" => Ok(ModelFamily::Gin),
            "gat" => Ok(ModelFamily::Gat),
            "pna" => Ok(ModelFamily::Pna),
            other => anyhow::bail!(
                "unsupported model family '{other}' (expected one of: gin, gat, pna)"
            ),
        }
    }
}
