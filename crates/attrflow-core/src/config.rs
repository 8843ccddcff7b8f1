//! Engine configuration.
//!
//! Configuration is fixed when a [`Schema`](crate::Schema) is assembled and is
//! shared by every instance built from it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How reverse (child) edges become known to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDiscovery {
    /// Children are registered only while a dependent attribute is resolved.
    ///
    /// A dependent that has never been read is not invalidated by writes to
    /// its dependencies. Attributes seeded with an initial value keep that
    /// value until they are read while invalid.
    Lazy,
    /// Every instance starts with the full reverse index built from the
    /// declared dependency lists.
    #[default]
    Eager,
}

/// How much of the declared graph is checked at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Reject missing dependencies, missing compute methods and cycles when
    /// the schema is built.
    #[default]
    Strict,
    /// Only reject what makes construction impossible (duplicate names,
    /// independent attributes without a value). Everything else is reported
    /// by the read that runs into it.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}'")]
pub struct ParseConfigError {
    kind: &'static str,
    value: String,
}

impl FromStr for EdgeDiscovery {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" => Ok(Self::Lazy),
            "eager" => Ok(Self::Eager),
            _ => Err(ParseConfigError {
                kind: "edge discovery",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Validation {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "deferred" => Ok(Self::Deferred),
            _ => Err(ParseConfigError {
                kind: "validation mode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for EdgeDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lazy => "lazy",
            Self::Eager => "eager",
        })
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Deferred => "deferred",
        })
    }
}

/// Engine settings attached to a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub edge_discovery: EdgeDiscovery,
    pub validation: Validation,
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily discovered children and no assembly-time checks. Useful when
    /// the graph is only known to be sound once it has been exercised.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            edge_discovery: EdgeDiscovery::Lazy,
            validation: Validation::Deferred,
        }
    }

    #[must_use]
    pub fn with_edge_discovery(mut self, edge_discovery: EdgeDiscovery) -> Self {
        self.edge_discovery = edge_discovery;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_close_the_lazy_gap() {
        let config = EngineConfig::default();
        assert_eq!(config.edge_discovery, EdgeDiscovery::Eager);
        assert_eq!(config.validation, Validation::Strict);
    }

    #[test]
    fn reference_settings() {
        let config = EngineConfig::reference();
        assert_eq!(config.edge_discovery, EdgeDiscovery::Lazy);
        assert_eq!(config.validation, Validation::Deferred);
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfig::new()
            .with_edge_discovery(EdgeDiscovery::Lazy)
            .with_validation(Validation::Deferred);
        assert_eq!(config, EngineConfig::reference());
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("lazy".parse::<EdgeDiscovery>(), Ok(EdgeDiscovery::Lazy));
        assert_eq!(" EAGER ".parse::<EdgeDiscovery>(), Ok(EdgeDiscovery::Eager));
        assert_eq!("Deferred".parse::<Validation>(), Ok(Validation::Deferred));
        assert_eq!(EdgeDiscovery::Lazy.to_string(), "lazy");
        assert_eq!(Validation::Strict.to_string(), "strict");

        let err = "sometimes".parse::<EdgeDiscovery>().unwrap_err();
        assert_eq!(err.to_string(), "invalid edge discovery 'sometimes'");
    }
}
