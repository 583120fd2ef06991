//! Import path newtype.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when an import path string is empty or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid import path {0:?}: import paths must not be blank")]
pub struct InvalidImportPath(pub String);

/// A package import path, e.g. `encoding/json`.
///
/// Import paths are opaque: test variants such as `pkg [pkg.test]` are valid
/// and distinct from `pkg`. The only requirement is that the path is not
/// blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImportPath(String);

impl ImportPath {
    pub fn new(path: impl Into<String>) -> Result<Self, InvalidImportPath> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(InvalidImportPath(path));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last `/`-separated segment, which is the conventional package name.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ImportPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ImportPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ImportPath {
    type Err = InvalidImportPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ImportPath {
    type Error = InvalidImportPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImportPath> for String {
    fn from(value: ImportPath) -> Self {
        value.0
    }
}

#[cfg(test)]
#[path = "../tests/import_path_tests.rs"]
mod import_path_tests;
