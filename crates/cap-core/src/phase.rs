//! Phase keys as the single source of truth for phase name strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named stages of project work, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhaseKey {
    Analysis,
    Development,
    InternalTest,
    Uat,
    Release,
    Documentation,
    Startup,
    Pm,
    Contingency,
}

impl PhaseKey {
    /// Every phase in canonical order.
    pub const ALL: [Self; 9] = [
        Self::Analysis,
        Self::Development,
        Self::InternalTest,
        Self::Uat,
        Self::Release,
        Self::Documentation,
        Self::Startup,
        Self::Pm,
        Self::Contingency,
    ];

    /// String representation used in persisted configurations.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Development => "development",
            Self::InternalTest => "internal_test",
            Self::Uat => "uat",
            Self::Release => "release",
            Self::Documentation => "documentation",
            Self::Startup => "startup",
            Self::Pm => "pm",
            Self::Contingency => "contingency",
        }
    }

    /// Contingency is excluded from the end-to-end percentage sum.
    pub const fn counts_toward_e2e(self) -> bool {
        !matches!(self, Self::Contingency)
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseKey {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(Self::Analysis),
            "development" => Ok(Self::Development),
            "internal_test" | "internal-test" => Ok(Self::InternalTest),
            "uat" => Ok(Self::Uat),
            "release" => Ok(Self::Release),
            "documentation" => Ok(Self::Documentation),
            "startup" => Ok(Self::Startup),
            "pm" => Ok(Self::Pm),
            "contingency" => Ok(Self::Contingency),
            _ => Err(UnknownPhase(s.to_string())),
        }
    }
}

impl Serialize for PhaseKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PhaseKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown phase strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase: {}", self.0)
    }
}

impl std::error::Error for UnknownPhase {}
