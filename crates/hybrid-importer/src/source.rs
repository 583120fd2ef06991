//! Source fallback with a reentrant, thread-safe memo.
//!
//! Every import path that did not qualify for binary reuse is type-checked
//! from source by the embedder's [`SourceChecker`]. The checker resolves the
//! package's own imports through [`SourceImports`], which consults the
//! session's binary map first and this memo second. It never goes back
//! through the façade.
//!
//! The memo stores one slot per import path:
//!
//! | Slot | Meaning |
//! |------|---------|
//! | `InProgress { thread }` | a check is running, started on `thread` |
//! | `Done(pkg)` | checked; every later request gets the same `Arc` |
//! | `Failed(err)` | checking failed; every later request gets the same error |
//!
//! Alongside the slots the memo keeps the pending requests as edges from
//! importer to import. An import made through [`SourceImports`] holds its
//! edge until it returns, whether it runs the check itself or waits for
//! someone else's. A request for a path that is in progress either
//! - returns [`PackageRef::InProgress`] when the requested path already
//!   reaches the importer along those edges (an import cycle), or
//! - blocks until the running check publishes its outcome.
//!
//! Cycles are found from the import chain alone, so a checker may resolve
//! its imports on any thread. Requests from outside a check carry no
//! importer; for those only a re-entry on the thread that started the check
//! counts as a cycle.
//!
//! The memo lock is never held while the checker runs.

use crate::artifact::BinaryPackages;
use hybrid_common::{DependencyKind, ImportPath, PackageOrigin, ResolveError, TypePackage};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::trace;

/// Parses and type-checks one package from its source files.
pub trait SourceChecker: Send + Sync {
    /// Check the package at `import_path`, resolving its imports through
    /// `imports`. The returned package must carry `import_path` and be of
    /// source origin.
    fn check(
        &self,
        import_path: &ImportPath,
        imports: &SourceImports<'_>,
    ) -> anyhow::Result<TypePackage>;
}

/// Result of resolving an import from inside the checker.
#[derive(Debug, Clone)]
pub enum PackageRef {
    Ready(Arc<TypePackage>),
    /// The package is still being checked further up the import chain.
    InProgress(ImportPath),
}

impl PackageRef {
    pub fn path(&self) -> &ImportPath {
        match self {
            PackageRef::Ready(package) => package.path(),
            PackageRef::InProgress(path) => path,
        }
    }

    pub fn ready(&self) -> Option<&Arc<TypePackage>> {
        match self {
            PackageRef::Ready(package) => Some(package),
            PackageRef::InProgress(_) => None,
        }
    }
}

#[derive(Debug)]
enum Slot {
    InProgress { thread: ThreadId },
    Done(Arc<TypePackage>),
    Failed(ResolveError),
}

#[derive(Debug, Default)]
struct Memo {
    slots: FxHashMap<ImportPath, Slot>,
    /// Importer -> imports it is currently requesting. One entry per pending
    /// request, so a path may repeat.
    edges: FxHashMap<ImportPath, Vec<ImportPath>>,
}

impl Memo {
    fn add_edge(&mut self, importer: &ImportPath, import_path: &ImportPath) {
        self.edges
            .entry(importer.clone())
            .or_default()
            .push(import_path.clone());
    }

    fn remove_edge(&mut self, importer: &ImportPath, import_path: &ImportPath) {
        let Some(pending) = self.edges.get_mut(importer) else {
            return;
        };
        if let Some(at) = pending.iter().position(|path| path == import_path) {
            pending.swap_remove(at);
        }
        if pending.is_empty() {
            self.edges.remove(importer);
        }
    }

    /// Whether `target` is `from` or is requested, directly or through other
    /// pending requests, by the check of `from`.
    fn reaches(&self, from: &ImportPath, target: &ImportPath) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(path) = stack.pop() {
            if path == target {
                return true;
            }
            if !seen.insert(path) {
                continue;
            }
            if let Some(pending) = self.edges.get(path) {
                stack.extend(pending);
            }
        }
        false
    }
}

/// Memoizing front end to a [`SourceChecker`], seeded with the session's
/// binary packages and excluded paths.
pub struct SourceFallback {
    checker: Arc<dyn SourceChecker>,
    binary: Arc<BinaryPackages>,
    excluded: FxHashMap<ImportPath, DependencyKind>,
    memo: Mutex<Memo>,
    published: Condvar,
}

impl SourceFallback {
    pub fn new(
        checker: Arc<dyn SourceChecker>,
        binary: Arc<BinaryPackages>,
        excluded: FxHashMap<ImportPath, DependencyKind>,
    ) -> Self {
        Self {
            checker,
            binary,
            excluded,
            memo: Mutex::new(Memo::default()),
            published: Condvar::new(),
        }
    }

    /// Resolve `import_path`, checking it from source at most once.
    pub fn resolve(&self, import_path: &ImportPath) -> Result<PackageRef, ResolveError> {
        self.resolve_from(None, import_path)
    }

    fn resolve_from(
        &self,
        importer: Option<&ImportPath>,
        import_path: &ImportPath,
    ) -> Result<PackageRef, ResolveError> {
        if let Some(kind) = self.excluded.get(import_path) {
            return Err(ResolveError::excluded(import_path.clone(), *kind));
        }
        if let Some(package) = self.binary.get(import_path.as_str()) {
            return Ok(PackageRef::Ready(Arc::clone(package)));
        }

        let me = thread::current().id();
        // Declared before the memo guard so it is released after it.
        let _edge = importer.map(|importer| PendingImport {
            fallback: self,
            importer,
            import_path,
        });
        let mut memo = self.lock();
        if let Some(importer) = importer {
            memo.add_edge(importer, import_path);
        }
        loop {
            let thread = match memo.slots.get(import_path) {
                Some(Slot::Done(package)) => return Ok(PackageRef::Ready(Arc::clone(package))),
                Some(Slot::Failed(err)) => return Err(err.clone()),
                Some(Slot::InProgress { thread }) => *thread,
                None => break,
            };
            let cycle = match importer {
                Some(importer) => memo.reaches(import_path, importer),
                None => thread == me,
            };
            if cycle {
                trace!(import_path = %import_path, "import cycle, returning in-progress package");
                return Ok(PackageRef::InProgress(import_path.clone()));
            }
            trace!(import_path = %import_path, "waiting for a running check");
            memo = self
                .published
                .wait(memo)
                .unwrap_or_else(PoisonError::into_inner);
        }
        memo.slots
            .insert(import_path.clone(), Slot::InProgress { thread: me });
        drop(memo);

        let mut guard = InProgressGuard {
            fallback: self,
            import_path,
            armed: true,
        };
        trace!(import_path = %import_path, "checking from source");
        let imports = SourceImports {
            fallback: self,
            importer: import_path,
        };
        let outcome = self.checker.check(import_path, &imports);
        guard.armed = false;

        let (slot, result) = match outcome.and_then(|package| validate(import_path, package)) {
            Ok(package) => {
                let package = Arc::new(package);
                (
                    Slot::Done(Arc::clone(&package)),
                    Ok(PackageRef::Ready(package)),
                )
            }
            Err(err) => {
                let err = ResolveError::source(import_path.clone(), &err);
                (Slot::Failed(err.clone()), Err(err))
            }
        };
        self.publish(import_path, slot);
        result
    }

    fn publish(&self, import_path: &ImportPath, slot: Slot) {
        trace!(
            import_path = %import_path,
            failed = matches!(slot, Slot::Failed(_)),
            "publishing source check"
        );
        self.lock().slots.insert(import_path.clone(), slot);
        self.published.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Memo> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(import_path: &ImportPath, package: TypePackage) -> anyhow::Result<TypePackage> {
    if package.path() != import_path {
        anyhow::bail!("source checker returned package {}", package.path());
    }
    if package.origin() != PackageOrigin::Source {
        anyhow::bail!("source checker produced a {} package", package.origin());
    }
    Ok(package)
}

/// Removes an importer -> import edge when its request returns.
struct PendingImport<'a> {
    fallback: &'a SourceFallback,
    importer: &'a ImportPath,
    import_path: &'a ImportPath,
}

impl Drop for PendingImport<'_> {
    fn drop(&mut self) {
        self.fallback
            .lock()
            .remove_edge(self.importer, self.import_path);
    }
}

/// Publishes a failure if the checker unwinds, so waiters are released.
struct InProgressGuard<'a> {
    fallback: &'a SourceFallback,
    import_path: &'a ImportPath,
    armed: bool,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let err = ResolveError::source(
                self.import_path.clone(),
                &anyhow::anyhow!("source checker panicked"),
            );
            self.fallback.publish(self.import_path, Slot::Failed(err));
        }
    }
}

/// Import capability handed to the [`SourceChecker`] while it checks one package.
pub struct SourceImports<'a> {
    fallback: &'a SourceFallback,
    importer: &'a ImportPath,
}

impl SourceImports<'_> {
    /// The package currently being checked.
    pub fn importer(&self) -> &ImportPath {
        self.importer
    }

    /// Resolve one of the importer's dependencies.
    pub fn import(&self, import_path: &ImportPath) -> Result<PackageRef, ResolveError> {
        trace!(importer = %self.importer, import_path = %import_path, "source import");
        self.fallback.resolve_from(Some(self.importer), import_path)
    }
}

#[cfg(test)]
#[path = "../tests/source_tests.rs"]
mod source_tests;
