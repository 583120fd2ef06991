use super::*;
use crate::test_support::{
    GatedRebuilder, LineDecoder, MapChecker, path, record, toolchain, write_artifact,
};
use crate::source::SourceImports;
use hybrid_common::{FailureKind, PackageOrigin, ResolveReason};
use std::sync::{Mutex, OnceLock, Weak};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    decoder: Arc<LineDecoder>,
    checker: Arc<MapChecker>,
    rebuilder: Arc<GatedRebuilder>,
    toolchain: Toolchain,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let errors = write_artifact(dir.path(), "errors.a", "package errors\nfunc New func(string) error\n");
    let fmt = write_artifact(dir.path(), "fmt.a", "package fmt\nimport errors\nfunc Println func(...any)\n");
    let stream = [
        record("unsafe", "unsafe", None, false),
        record("errors", "errors", Some(&errors), false),
        record("fmt", "fmt", Some(&fmt), false),
        record("example.com/lib", "lib", Some(&dir.path().join("lib.a")), true),
        record("example.com/app", "main", None, false),
    ]
    .join("\n");

    let decoder = Arc::new(LineDecoder::default());
    let checker = Arc::new(MapChecker::new().package("example.com/lib", &["fmt", "errors"]));
    let rebuilder = Arc::new(GatedRebuilder::default());
    let toolchain = toolchain(
        &stream,
        Arc::clone(&decoder),
        Arc::clone(&checker) as Arc<dyn SourceChecker>,
        Arc::clone(&rebuilder),
    );
    Fixture {
        _dir: dir,
        decoder,
        checker,
        rebuilder,
        toolchain,
    }
}

fn target() -> ImportPath {
    path("example.com/app")
}

#[test]
fn test_binary_packages_decoded_at_construction() {
    let fixture = fixture();
    let resolver = HybridResolver::new(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    assert_eq!(fixture.decoder.order(), ["errors", "fmt"]);
    assert_eq!(resolver.binary_packages().len(), 2);
    assert_eq!(resolver.target(), &target());
    assert_eq!(resolver.dir(), Path::new("/work"));

    let fmt = resolver.resolve(&path("fmt")).unwrap();
    assert_eq!(fmt.origin(), PackageOrigin::Binary);
    assert!(Arc::ptr_eq(&fmt, &resolver.resolve(&path("fmt")).unwrap()));
    assert_eq!(fixture.checker.total_calls(), 0);
}

#[test]
fn test_stale_package_checked_from_source() {
    let fixture = fixture();
    let resolver = HybridResolver::new(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    let lib = resolver.resolve(&path("example.com/lib")).unwrap();
    assert_eq!(lib.origin(), PackageOrigin::Source);
    assert_eq!(lib.imports(), [path("fmt"), path("errors")]);
    assert_eq!(fixture.checker.calls("example.com/lib"), 1);
    // Its binary imports were served from the decoded map.
    assert_eq!(fixture.checker.calls("fmt"), 0);
    assert_eq!(fixture.checker.calls("errors"), 0);
}

#[test]
fn test_excluded_paths_fail() {
    let fixture = fixture();
    let resolver = HybridResolver::new(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    for (import_path, kind) in [
        ("unsafe", DependencyKind::Special),
        ("example.com/app", DependencyKind::Executable),
    ] {
        let err = resolver.resolve(&path(import_path)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolution);
        assert_eq!(err.reason, ResolveReason::Excluded { kind });
    }
    assert_eq!(fixture.checker.total_calls(), 0);
}

#[test]
fn test_unlisted_special_path_is_excluded() {
    let dir = TempDir::new().unwrap();
    let stream = record("example.com/lib", "lib", Some(&dir.path().join("lib.a")), true);
    let checker = Arc::new(MapChecker::new().package("example.com/lib", &["unsafe"]));
    let toolchain = toolchain(
        &stream,
        Arc::new(LineDecoder::default()),
        Arc::clone(&checker) as Arc<dyn SourceChecker>,
        Arc::new(GatedRebuilder::default()),
    );
    let resolver = HybridResolver::new(&toolchain, &target(), Path::new("/work")).unwrap();

    let err = resolver.resolve(&path("unsafe")).unwrap_err();
    assert_eq!(
        err.reason,
        ResolveReason::Excluded {
            kind: DependencyKind::Special
        }
    );
    // An import of it fails the importer without a source check.
    assert!(resolver.resolve(&path("example.com/lib")).is_err());
    assert_eq!(checker.calls("unsafe"), 0);
    assert_eq!(checker.calls("example.com/lib"), 1);
}

#[test]
fn test_new_does_not_rebuild() {
    let fixture = fixture();
    HybridResolver::new(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    assert_eq!(fixture.rebuilder.wait_started(0), Vec::<String>::new());
    assert_eq!(fixture.rebuilder.finished(), 0);
}

#[test]
fn test_with_rebuilds_fires_and_does_not_wait() {
    let fixture = fixture();
    // The gate stays closed, so construction returning proves it did not wait.
    let resolver =
        HybridResolver::with_rebuilds(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    assert_eq!(fixture.rebuilder.wait_started(1), ["example.com/lib"]);

    // The session still treats the stale package as source.
    let lib = resolver.resolve(&path("example.com/lib")).unwrap();
    assert_eq!(lib.origin(), PackageOrigin::Source);

    fixture.rebuilder.open();
    assert_eq!(fixture.rebuilder.wait_finished(1), 1);
}

#[test]
fn test_importer_trait() {
    let fixture = fixture();
    let resolver = HybridResolver::new(&fixture.toolchain, &target(), Path::new("/work")).unwrap();
    let importer: &dyn Importer = &resolver;
    assert_eq!(importer.import(&path("errors")).unwrap().name(), "errors");
}

/// Re-enters the façade for the package it is checking.
#[derive(Default)]
struct ReentrantChecker {
    resolver: OnceLock<Weak<HybridResolver>>,
    reentry: Mutex<Option<Result<Arc<TypePackage>, ResolveError>>>,
}

impl SourceChecker for ReentrantChecker {
    fn check(
        &self,
        import_path: &ImportPath,
        _imports: &SourceImports<'_>,
    ) -> anyhow::Result<TypePackage> {
        let resolver = self.resolver.get().and_then(Weak::upgrade).unwrap();
        *self.reentry.lock().unwrap() = Some(resolver.resolve(import_path));
        Ok(TypePackage::builder(import_path.clone(), "lib", PackageOrigin::Source).build())
    }
}

#[test]
fn test_reentrant_resolve_reports_cycle() {
    let dir = TempDir::new().unwrap();
    let stream = record("example.com/lib", "lib", Some(&dir.path().join("lib.a")), true);
    let checker = Arc::new(ReentrantChecker::default());
    let toolchain = toolchain(
        &stream,
        Arc::new(LineDecoder::default()),
        Arc::clone(&checker) as Arc<dyn SourceChecker>,
        Arc::new(GatedRebuilder::default()),
    );
    let resolver =
        Arc::new(HybridResolver::new(&toolchain, &target(), Path::new("/work")).unwrap());
    checker.resolver.set(Arc::downgrade(&resolver)).unwrap();

    let lib = resolver.resolve(&path("example.com/lib")).unwrap();
    assert_eq!(lib.origin(), PackageOrigin::Source);
    let reentry = checker.reentry.lock().unwrap().take().unwrap();
    assert_eq!(reentry.unwrap_err().reason, ResolveReason::Cycle);
}
