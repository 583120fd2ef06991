//! Artifact lookup and binary export-data decoding.
//!
//! The lookup table opens one handle per binary-usable dependency before any
//! decoding starts, so a missing or unreadable artifact fails the session up
//! front instead of halfway through a type-checking walk. Each handle is
//! handed out exactly once.
//!
//! The artifact resolver then decodes every entry eagerly, in catalog order.
//! Because the catalog lists dependencies before dependents, whenever the
//! decoder meets a reference to another package, that package is already in
//! the decoded map and is reused as-is. Decoding one path never triggers
//! decoding of another.

use hybrid_catalog::DependencyCatalog;
use hybrid_common::{ImportPath, PackageOrigin, SessionError, TypePackage};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Decodes a compiled artifact's exported-interface section.
pub trait ExportDataDecoder: Send + Sync {
    /// Fixed identifier of the binary format this decoder understands.
    fn format(&self) -> &str;

    /// Decode the artifact for `import_path`.
    ///
    /// `decoded` holds every package decoded so far in this session; any
    /// package the artifact refers to must be taken from there rather than
    /// decoded again.
    fn decode(
        &self,
        import_path: &ImportPath,
        data: &mut dyn BufRead,
        decoded: &BinaryPackages,
    ) -> anyhow::Result<TypePackage>;
}

/// An open artifact, consumed exactly once by the decoder.
#[derive(Debug)]
pub struct ArtifactHandle {
    import_path: ImportPath,
    path: PathBuf,
    reader: BufReader<File>,
}

impl ArtifactHandle {
    fn open(import_path: &ImportPath, path: &Path) -> Result<Self, SessionError> {
        let file = File::open(path).map_err(|source| SessionError::ArtifactIo {
            import_path: import_path.clone(),
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            import_path: import_path.clone(),
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    pub fn import_path(&self) -> &ImportPath {
        &self.import_path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reader(&mut self) -> &mut dyn BufRead {
        &mut self.reader
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no artifact for {0}")]
pub struct ArtifactNotFound(pub String);

/// Open artifact handles for exactly the binary-usable dependencies.
#[derive(Debug, Default)]
pub struct LookupTable {
    handles: IndexMap<ImportPath, ArtifactHandle>,
}

impl LookupTable {
    /// Open every binary-usable artifact in `catalog`. A binary-usable record
    /// with no artifact location is an error, like a file that cannot be
    /// opened.
    pub fn open(catalog: &DependencyCatalog) -> Result<Self, SessionError> {
        let mut handles = IndexMap::new();
        for record in catalog.binary_usable() {
            let path = record.artifact_path.as_deref().ok_or_else(|| {
                SessionError::MissingArtifact {
                    import_path: record.import_path.clone(),
                }
            })?;
            let handle = ArtifactHandle::open(&record.import_path, path)?;
            trace!(import_path = %record.import_path, artifact = %path.display(), "opened artifact");
            handles.insert(record.import_path.clone(), handle);
        }
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.handles.contains_key(import_path)
    }

    /// Import paths whose handles have not been taken yet, in catalog order.
    pub fn paths(&self) -> impl Iterator<Item = &ImportPath> {
        self.handles.keys()
    }

    /// Take the handle for `import_path`. A second lookup of the same path
    /// reports `ArtifactNotFound`.
    pub fn lookup(&mut self, import_path: &str) -> Result<ArtifactHandle, ArtifactNotFound> {
        self.handles
            .shift_remove(import_path)
            .ok_or_else(|| ArtifactNotFound(import_path.to_string()))
    }
}

/// Packages decoded from artifacts, in decode order. Read-only once the
/// session is constructed.
#[derive(Debug, Default)]
pub struct BinaryPackages {
    packages: IndexMap<ImportPath, Arc<TypePackage>>,
}

impl BinaryPackages {
    pub fn get(&self, import_path: &str) -> Option<&Arc<TypePackage>> {
        self.packages.get(import_path)
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.packages.contains_key(import_path)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImportPath, &Arc<TypePackage>)> {
        self.packages.iter()
    }
}

impl FromIterator<Arc<TypePackage>> for BinaryPackages {
    fn from_iter<I: IntoIterator<Item = Arc<TypePackage>>>(iter: I) -> Self {
        Self {
            packages: iter
                .into_iter()
                .map(|package| (package.path().clone(), package))
                .collect(),
        }
    }
}

/// Layers an [`ExportDataDecoder`] over a [`LookupTable`].
pub struct ArtifactResolver<'d> {
    table: LookupTable,
    decoder: &'d dyn ExportDataDecoder,
    decoded: BinaryPackages,
}

impl<'d> ArtifactResolver<'d> {
    pub fn new(table: LookupTable, decoder: &'d dyn ExportDataDecoder) -> Self {
        Self {
            table,
            decoder,
            decoded: BinaryPackages::default(),
        }
    }

    /// Return the package for `import_path`, decoding its artifact on first use.
    pub fn import(&mut self, import_path: &ImportPath) -> Result<Arc<TypePackage>, SessionError> {
        if let Some(package) = self.decoded.get(import_path.as_str()) {
            return Ok(Arc::clone(package));
        }

        let mut handle = self
            .table
            .lookup(import_path.as_str())
            .map_err(|err| self.decode_error(import_path, err.into()))?;

        let package = self
            .decoder
            .decode(import_path, handle.reader(), &self.decoded)
            .map_err(|err| self.decode_error(import_path, err))?;

        if package.path() != import_path {
            return Err(self.decode_error(
                import_path,
                anyhow::anyhow!("artifact describes package {}", package.path()),
            ));
        }
        if package.origin() != PackageOrigin::Binary {
            return Err(self.decode_error(
                import_path,
                anyhow::anyhow!("decoder produced a {} package", package.origin()),
            ));
        }

        trace!(
            import_path = %import_path,
            artifact = %handle.path().display(),
            members = package.member_count(),
            "decoded artifact"
        );
        let package = Arc::new(package);
        self.decoded
            .packages
            .insert(import_path.clone(), Arc::clone(&package));
        Ok(package)
    }

    /// Decode every remaining artifact in catalog order and return the
    /// closed map. The first failure aborts the whole batch.
    pub fn import_all(mut self) -> Result<BinaryPackages, SessionError> {
        let pending: Vec<ImportPath> = self.table.paths().cloned().collect();
        for import_path in &pending {
            self.import(import_path)?;
        }
        debug!(
            format = self.decoder.format(),
            packages = self.decoded.len(),
            "decoded binary-usable dependencies"
        );
        Ok(self.decoded)
    }

    fn decode_error(&self, import_path: &ImportPath, source: anyhow::Error) -> SessionError {
        SessionError::Decode {
            import_path: import_path.clone(),
            format: self.decoder.format().to_string(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "../tests/artifact_tests.rs"]
mod artifact_tests;
