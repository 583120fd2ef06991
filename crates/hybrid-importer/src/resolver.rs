//! The resolution session façade.

use crate::artifact::{ArtifactResolver, BinaryPackages, ExportDataDecoder, LookupTable};
use crate::rebuild::{RebuildCommand, RebuildTrigger, Rebuilder};
use crate::source::{PackageRef, SourceChecker, SourceFallback};
use hybrid_catalog::{Classifier, DependencyCatalog, ListCommand, MetadataQuery};
use hybrid_common::{
    DependencyKind, ImportPath, ResolveError, SessionConfig, SessionError, TypePackage,
};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Anything that can hand a type checker the interface of an imported package.
pub trait Importer {
    fn import(&self, import_path: &ImportPath) -> Result<Arc<TypePackage>, ResolveError>;
}

/// The external collaborators a session is built from.
#[derive(Clone)]
pub struct Toolchain {
    pub query: Arc<dyn MetadataQuery>,
    pub classifier: Classifier,
    pub decoder: Arc<dyn ExportDataDecoder>,
    pub checker: Arc<dyn SourceChecker>,
    pub rebuilder: Arc<dyn Rebuilder>,
}

impl Toolchain {
    /// Command-backed query and rebuilder from `config`, plus the embedder's
    /// decoder and checker.
    pub fn from_config(
        config: &SessionConfig,
        decoder: Arc<dyn ExportDataDecoder>,
        checker: Arc<dyn SourceChecker>,
    ) -> Self {
        Self {
            query: Arc::new(ListCommand::from_config(config)),
            classifier: Classifier::from_config(config),
            decoder,
            checker,
            rebuilder: Arc::new(RebuildCommand::from_config(config)),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Arc<dyn MetadataQuery>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_rebuilder(mut self, rebuilder: Arc<dyn Rebuilder>) -> Self {
        self.rebuilder = rebuilder;
        self
    }
}

/// One resolution session for a target.
///
/// Every binary-usable dependency is decoded during construction; the map is
/// read-only afterwards. Everything else is checked from source on first use.
/// Resolution is safe from any number of threads.
pub struct HybridResolver {
    target: ImportPath,
    dir: PathBuf,
    binary: Arc<BinaryPackages>,
    fallback: SourceFallback,
}

impl HybridResolver {
    /// Build a session without touching stale artifacts.
    pub fn new(toolchain: &Toolchain, target: &ImportPath, dir: &Path) -> Result<Self, SessionError> {
        Self::build(toolchain, target, dir, false)
    }

    /// Build a session and launch one detached rebuild per stale dependency
    /// before decoding. The session never waits for them and still checks
    /// the stale packages from source.
    pub fn with_rebuilds(
        toolchain: &Toolchain,
        target: &ImportPath,
        dir: &Path,
    ) -> Result<Self, SessionError> {
        Self::build(toolchain, target, dir, true)
    }

    fn build(
        toolchain: &Toolchain,
        target: &ImportPath,
        dir: &Path,
        rebuild: bool,
    ) -> Result<Self, SessionError> {
        let _span =
            debug_span!("hybrid_session", target = %target, dir = %dir.display(), rebuild).entered();

        let catalog =
            DependencyCatalog::build(toolchain.query.as_ref(), &toolchain.classifier, target, dir)?;

        if rebuild {
            let launched = RebuildTrigger::new(Arc::clone(&toolchain.rebuilder))
                .fire(catalog.records(), catalog.dir());
            debug!(launched, "launched rebuilds for stale dependencies");
        }

        let table = LookupTable::open(&catalog)?;
        let binary = Arc::new(ArtifactResolver::new(table, toolchain.decoder.as_ref()).import_all()?);

        let mut excluded: FxHashMap<ImportPath, DependencyKind> = catalog
            .excluded()
            .map(|record| (record.import_path.clone(), record.kind))
            .collect();
        // Built-ins stay excluded even when the query leaves them out.
        for special in toolchain.classifier.special_paths() {
            if let Ok(import_path) = ImportPath::new(special) {
                excluded.entry(import_path).or_insert(DependencyKind::Special);
            }
        }

        let fallback = SourceFallback::new(
            Arc::clone(&toolchain.checker),
            Arc::clone(&binary),
            excluded,
        );

        Ok(Self {
            target: target.clone(),
            dir: dir.to_path_buf(),
            binary,
            fallback,
        })
    }

    /// Resolve `import_path` from the decoded map or, failing that, from source.
    pub fn resolve(&self, import_path: &ImportPath) -> Result<Arc<TypePackage>, ResolveError> {
        if let Some(package) = self.binary.get(import_path.as_str()) {
            return Ok(Arc::clone(package));
        }
        match self.fallback.resolve(import_path)? {
            PackageRef::Ready(package) => Ok(package),
            // Only reachable when the caller is itself inside a source check.
            PackageRef::InProgress(path) => Err(ResolveError::cycle(path)),
        }
    }

    pub fn binary_packages(&self) -> &BinaryPackages {
        &self.binary
    }

    pub fn target(&self) -> &ImportPath {
        &self.target
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Importer for HybridResolver {
    fn import(&self, import_path: &ImportPath) -> Result<Arc<TypePackage>, ResolveError> {
        self.resolve(import_path)
    }
}

#[cfg(test)]
#[path = "../tests/resolver_tests.rs"]
mod resolver_tests;
