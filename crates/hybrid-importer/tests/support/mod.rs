//! Test doubles shared by the unit tests and the session integration tests.
#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use hybrid_importer::catalog::{Classifier, RecordedQuery};
use hybrid_importer::common::{ImportPath, MemberKind, PackageOrigin, TypePackage, TypePackageBuilder};
use hybrid_importer::{
    BinaryPackages, ExportDataDecoder, PackageRef, Rebuilder, SourceChecker, SourceImports,
    Toolchain,
};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub fn path(text: &str) -> ImportPath {
    ImportPath::new(text).unwrap()
}

/// Decodes a line-oriented stand-in for export data:
///
/// ```text
/// package NAME [PATH]     # PATH overrides the described import path
/// import PATH             # must already be decoded
/// func|type|const|var NAME SIGNATURE
/// corrupt                 # fails the decode
/// ```
#[derive(Debug, Default)]
pub struct LineDecoder {
    order: Mutex<Vec<String>>,
}

impl LineDecoder {
    /// Import paths in the order they were decoded.
    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

impl ExportDataDecoder for LineDecoder {
    fn format(&self) -> &str {
        "line"
    }

    fn decode(
        &self,
        import_path: &ImportPath,
        data: &mut dyn BufRead,
        decoded: &BinaryPackages,
    ) -> Result<TypePackage> {
        self.order.lock().unwrap().push(import_path.to_string());
        let mut builder: Option<TypePackageBuilder> = None;
        for line in data.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
            builder = Some(match word {
                "package" => {
                    let (name, described) = match rest.split_once(' ') {
                        Some((name, described)) => (name, ImportPath::new(described)?),
                        None => (rest, import_path.clone()),
                    };
                    TypePackage::builder(described, name, PackageOrigin::Binary)
                }
                "import" => {
                    let dep = ImportPath::new(rest)?;
                    if !decoded.contains(dep.as_str()) {
                        bail!("{dep} referenced before it was decoded");
                    }
                    builder.context("import before package clause")?.import(dep)
                }
                "func" | "type" | "const" | "var" => {
                    let kind = match word {
                        "func" => MemberKind::Func,
                        "type" => MemberKind::Type,
                        "const" => MemberKind::Const,
                        _ => MemberKind::Var,
                    };
                    let (name, signature) = rest.split_once(' ').unwrap_or((rest, ""));
                    builder
                        .context("member before package clause")?
                        .member(kind, name, signature)
                }
                "corrupt" => bail!("corrupt export data"),
                other => bail!("unknown directive {other:?}"),
            });
        }
        Ok(builder.context("missing package clause")?.build())
    }
}

#[derive(Debug, Clone, Default)]
struct SourcePackage {
    imports: Vec<ImportPath>,
    fail: bool,
}

/// Source checker over an in-memory map of packages and their imports.
/// Counts how often each path is checked.
#[derive(Debug, Default)]
pub struct MapChecker {
    packages: HashMap<String, SourcePackage>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_progress_seen: Mutex<HashSet<String>>,
}

impl MapChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(mut self, import_path: &str, imports: &[&str]) -> Self {
        self.packages.insert(
            import_path.to_string(),
            SourcePackage {
                imports: imports.iter().map(|dep| path(dep)).collect(),
                fail: false,
            },
        );
        self
    }

    pub fn failing(mut self, import_path: &str) -> Self {
        self.packages.insert(
            import_path.to_string(),
            SourcePackage {
                fail: true,
                ..SourcePackage::default()
            },
        );
        self
    }

    /// Sleep this long inside every check, to make concurrent checks overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, import_path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| *call == import_path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Import paths that came back as `InProgress` during some check.
    pub fn in_progress_seen(&self) -> HashSet<String> {
        self.in_progress_seen.lock().unwrap().clone()
    }
}

impl SourceChecker for MapChecker {
    fn check(&self, import_path: &ImportPath, imports: &SourceImports<'_>) -> Result<TypePackage> {
        assert_eq!(imports.importer(), import_path);
        self.calls.lock().unwrap().push(import_path.to_string());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let Some(source) = self.packages.get(import_path.as_str()) else {
            bail!("no source files for {import_path}");
        };
        if source.fail {
            bail!("syntax error in {import_path}");
        }
        let mut builder = TypePackage::builder(
            import_path.clone(),
            import_path.last_segment(),
            PackageOrigin::Source,
        )
        .member(MemberKind::Func, "Checked", "func()");
        for dep in &source.imports {
            if let PackageRef::InProgress(dep) = imports.import(dep)? {
                self.in_progress_seen.lock().unwrap().insert(dep.to_string());
            }
            builder = builder.import(dep.clone());
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Default)]
struct Gate {
    started: Vec<String>,
    finished: usize,
    open: bool,
}

/// Rebuilder that blocks every rebuild until [`GatedRebuilder::open`].
#[derive(Debug, Default)]
pub struct GatedRebuilder {
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedRebuilder {
    pub fn open(&self) {
        self.gate.lock().unwrap().open = true;
        self.changed.notify_all();
    }

    /// Wait until `count` rebuilds have started and return their paths, sorted.
    pub fn wait_started(&self, count: usize) -> Vec<String> {
        let gate = self.gate.lock().unwrap();
        let (gate, _) = self
            .changed
            .wait_timeout_while(gate, Duration::from_secs(10), |gate| {
                gate.started.len() < count
            })
            .unwrap();
        let mut started = gate.started.clone();
        started.sort();
        started
    }

    /// Wait until `count` rebuilds have finished.
    pub fn wait_finished(&self, count: usize) -> usize {
        let gate = self.gate.lock().unwrap();
        let (gate, _) = self
            .changed
            .wait_timeout_while(gate, Duration::from_secs(10), |gate| gate.finished < count)
            .unwrap();
        gate.finished
    }

    pub fn finished(&self) -> usize {
        self.gate.lock().unwrap().finished
    }
}

impl Rebuilder for GatedRebuilder {
    fn rebuild(&self, import_path: &ImportPath, _dir: &Path) -> Result<()> {
        let mut gate = self.gate.lock().unwrap();
        gate.started.push(import_path.to_string());
        self.changed.notify_all();
        let (mut gate, _) = self
            .changed
            .wait_timeout_while(gate, Duration::from_secs(10), |gate| !gate.open)
            .unwrap();
        gate.finished += 1;
        self.changed.notify_all();
        Ok(())
    }
}

/// One metadata record in the query's output format.
pub fn record(import_path: &str, name: &str, artifact: Option<&Path>, stale: bool) -> String {
    let mut record = serde_json::json!({
        "ImportPath": import_path,
        "Name": name,
        "Stale": stale,
    });
    if let Some(artifact) = artifact {
        record["Target"] = serde_json::Value::from(artifact.display().to_string());
    }
    if stale {
        record["StaleReason"] = serde_json::Value::from("build ID mismatch");
    }
    record.to_string()
}

pub fn write_artifact(dir: &Path, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn toolchain(
    stream: &str,
    decoder: Arc<LineDecoder>,
    checker: Arc<dyn SourceChecker>,
    rebuilder: Arc<GatedRebuilder>,
) -> Toolchain {
    Toolchain {
        query: Arc::new(RecordedQuery::new(stream.as_bytes().to_vec())),
        classifier: Classifier::default(),
        decoder,
        checker,
        rebuilder,
    }
}
