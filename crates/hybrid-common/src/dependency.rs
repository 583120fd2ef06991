use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a dependency as reported by the metadata query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// A regular library package.
    #[default]
    Ordinary,
    /// A built-in pseudo package with neither an artifact nor source (e.g. `unsafe`).
    Special,
    /// A program entry package (`main`); never imported as a library.
    Executable,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Ordinary => "ordinary",
            DependencyKind::Special => "special",
            DependencyKind::Executable => "executable",
        }
    }

    /// Special and executable packages are never resolved by the importer.
    pub fn is_importable(&self) -> bool {
        matches!(self, DependencyKind::Ordinary)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
