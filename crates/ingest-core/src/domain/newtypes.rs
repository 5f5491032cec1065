//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the two halves of the
//! dedup key. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RemotePath
// ============================================================================

/// A path on the remote server, as returned by a directory listing
///
/// Paths are kept exactly as the server reports them (e.g. `/inbox/a.txt` or
/// `inbox/a.txt`); the same string is what gets stored in the record table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if the path is empty or contains a NUL byte
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Err(DomainError::InvalidRemotePath(
                "Remote path must not be empty".to_string(),
            ));
        }

        if path.contains('\0') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains a NUL byte: {}",
                path.escape_debug()
            )));
        }

        Ok(Self(path))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the last `/`-separated segment
    ///
    /// This is the name a download is stored under locally, so segments that
    /// would resolve outside the destination folder are rejected.
    ///
    /// # Errors
    /// Returns error if the final segment is empty, `.` or `..`
    pub fn file_name(&self) -> Result<&str, DomainError> {
        let name = self.0.rsplit('/').next().unwrap_or_default();

        if name.is_empty() || name == "." || name == ".." {
            return Err(DomainError::MissingFileName(self.0.clone()));
        }

        Ok(name)
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// ModifiedTime
// ============================================================================

/// A modification timestamp normalized to UTC at whole-second precision
///
/// Remote servers report times in whatever offset their clock uses. Every
/// comparison against stored records goes through [`ModifiedTime::normalize`],
/// which converts to UTC and drops sub-second digits. Normalizing a value that
/// is already normalized returns it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModifiedTime(DateTime<Utc>);

impl ModifiedTime {
    /// Normalize a timestamp from any offset
    ///
    /// Only whole-second UTC values come back unchanged; a UTC value with
    /// sub-second digits is truncated to the second.
    #[must_use]
    pub fn normalize<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self(at.with_timezone(&Utc).trunc_subsecs(0))
    }

    /// Get the normalized UTC value
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Storage form: RFC 3339, second precision, `Z` suffix
    ///
    /// Equal instants always produce byte-identical strings, so stores may
    /// compare this value with plain text equality.
    #[must_use]
    pub fn to_storage_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parse a stored or user-supplied RFC 3339 string
    ///
    /// # Errors
    /// Returns error if the string is not valid RFC 3339
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::normalize(&dt))
            .map_err(|e| DomainError::InvalidTimestamp(format!("'{s}': {e}")))
    }
}

impl From<DateTime<Utc>> for ModifiedTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::normalize(&dt)
    }
}

impl Display for ModifiedTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_string())
    }
}

impl FromStr for ModifiedTime {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModifiedTime {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ModifiedTime> for String {
    fn from(t: ModifiedTime) -> Self {
        t.to_storage_string()
    }
}
