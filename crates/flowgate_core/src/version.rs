//! Flow encoding versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the attribute carrying the encoding version
pub const ENCODING_VERSION_ATTRIBUTE: &str = "encoding-version";

/// Field-layout revision marker embedded in a flow document, `major.minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncodingVersion {
    /// Incompatible layout revision
    pub major: u32,
    /// Additive revision within a major
    pub minor: u32,
}

impl EncodingVersion {
    /// Create a new version
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse from string
    ///
    /// # Errors
    ///
    /// Returns error if the value is not `major.minor`
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| VersionError::InvalidFormat(s.to_string()))?;

        let major = major
            .parse()
            .map_err(|_| VersionError::InvalidComponent(major.to_string()))?;
        let minor = minor
            .parse()
            .map_err(|_| VersionError::InvalidComponent(minor.to_string()))?;

        Ok(Self { major, minor })
    }

    /// Read the version from an attribute value.
    ///
    /// Missing, blank or unparseable values mean "no version".
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Option<Self> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::parse(v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for EncodingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for EncodingVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Version-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid format
    InvalidFormat(String),
    /// Invalid component
    InvalidComponent(String),
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(s) => write!(f, "Invalid encoding version format: {}", s),
            Self::InvalidComponent(s) => write!(f, "Invalid encoding version component: {}", s),
        }
    }
}

impl std::error::Error for VersionError {}
