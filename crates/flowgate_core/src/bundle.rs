//! Bundle coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinates of an installable extension bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleCoordinate {
    /// Bundle group
    pub group: String,
    /// Bundle artifact
    pub artifact: String,
    /// Bundle version
    pub version: String,
}

impl BundleCoordinate {
    /// Create new coordinates
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for BundleCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_display() {
        let c = BundleCoordinate::new("org.example", "example-nar", "2.1.0");
        assert_eq!(c.to_string(), "org.example:example-nar:2.1.0");
    }

    #[test]
    fn test_coordinate_serde() {
        let c = BundleCoordinate::new("g", "a", "v");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"group":"g","artifact":"a","version":"v"}"#);
    }
}
