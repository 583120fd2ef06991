//! Hybrid package importer.
//!
//! Resolves the exported interface of every dependency of a target module
//! for a downstream type checker. Dependencies with an up-to-date compiled
//! artifact are decoded from it eagerly at construction; everything else is
//! type-checked from source on demand, at most once per import path.
//!
//! ```ignore
//! let toolchain = Toolchain::from_config(&config, decoder, checker);
//! let resolver = HybridResolver::new(&toolchain, &target, &dir)?;
//! let fmt = resolver.resolve(&"fmt".parse()?)?;
//! ```
//!
//! Construction runs, in order:
//! 1. the dependency catalog (`hybrid_catalog`),
//! 2. in rebuild mode, one detached rebuild per stale dependency (`rebuild`),
//! 3. the artifact lookup table and decoder (`artifact`),
//! 4. the façade over the decoded map and the source fallback (`resolver`, `source`).

pub use hybrid_catalog as catalog;
pub use hybrid_common as common;

pub mod artifact;
pub use artifact::{
    ArtifactHandle, ArtifactNotFound, ArtifactResolver, BinaryPackages, ExportDataDecoder,
    LookupTable,
};

pub mod source;
pub use source::{PackageRef, SourceChecker, SourceFallback, SourceImports};

pub mod rebuild;
pub use rebuild::{RebuildCommand, RebuildTrigger, Rebuilder};

pub mod resolver;
pub use resolver::{HybridResolver, Importer, Toolchain};

#[cfg(test)]
extern crate self as hybrid_importer;

#[cfg(test)]
#[path = "../tests/support/mod.rs"]
mod test_support;
