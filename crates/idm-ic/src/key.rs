//! Connector keys
//!
//! Identifies a connector implementation: the framework that hosts it and the
//! bundle (name + version) plus connector name inside that framework.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one connector implementation.
///
/// The `framework` segment is the connector-family discriminator used by the
/// aggregator to pick a [`ConnectorService`](crate::service::ConnectorService);
/// the remaining segments identify the bundle inside that framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorKey {
    framework: String,
    bundle_name: String,
    bundle_version: String,
    connector_name: String,
}

impl ConnectorKey {
    /// Create a new connector key.
    pub fn new(
        framework: impl Into<String>,
        bundle_name: impl Into<String>,
        bundle_version: impl Into<String>,
        connector_name: impl Into<String>,
    ) -> Self {
        Self {
            framework: framework.into(),
            bundle_name: bundle_name.into(),
            bundle_version: bundle_version.into(),
            connector_name: connector_name.into(),
        }
    }

    /// Connector family discriminator.
    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn bundle_version(&self) -> &str {
        &self.bundle_version
    }

    pub fn connector_name(&self) -> &str {
        &self.connector_name
    }

    /// Name of the connector inside its framework, without the framework segment.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{}:{}:{}",
            self.bundle_name, self.connector_name, self.bundle_version
        )
    }
}

impl fmt::Display for ConnectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.framework, self.bundle_name, self.bundle_version, self.connector_name
        )
    }
}

impl FromStr for ConnectorKey {
    type Err = ParseConnectorKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [framework, bundle_name, bundle_version, connector_name]
                if parts.iter().all(|p| !p.trim().is_empty()) =>
            {
                Ok(Self::new(
                    *framework,
                    *bundle_name,
                    *bundle_version,
                    *connector_name,
                ))
            }
            _ => Err(ParseConnectorKeyError(s.to_string())),
        }
    }
}

/// Error parsing a connector key from string.
#[derive(Debug, Clone)]
pub struct ParseConnectorKeyError(String);

impl fmt::Display for ParseConnectorKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid connector key '{}', expected framework:bundle:version:connector",
            self.0
        )
    }
}

impl std::error::Error for ParseConnectorKeyError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_equality_uses_all_fields() {
        let a = ConnectorKey::new("local", "memory", "1.0", "MemoryConnector");
        let b = ConnectorKey::new("local", "memory", "1.0", "MemoryConnector");
        let c = ConnectorKey::new("local", "memory", "1.1", "MemoryConnector");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_key_display_and_parse() {
        let key = ConnectorKey::new("local", "memory", "1.0", "MemoryConnector");
        let rendered = key.to_string();
        assert_eq!(rendered, "local:memory:1.0:MemoryConnector");

        let parsed: ConnectorKey = rendered.parse().unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.framework(), "local");
        assert_eq!(parsed.full_name(), "memory:MemoryConnector:1.0");
    }

    #[test]
    fn test_key_parse_rejects_malformed() {
        assert!("local:memory:1.0".parse::<ConnectorKey>().is_err());
        assert!("local::1.0:MemoryConnector".parse::<ConnectorKey>().is_err());
        assert!("a:b:c:d:e".parse::<ConnectorKey>().is_err());
    }
}
