//! Resolved package interfaces.
//!
//! A `TypePackage` is the in-memory description of a package's exported
//! interface. It is produced either by the binary export-data decoder or by
//! the source checker, is immutable once built, and is shared by reference
//! (`Arc<TypePackage>`) across every consumer in a session. Two imports that
//! name the same path in one session observe the same allocation, so identity
//! can be checked with `Arc::ptr_eq`.
//!
//! References to other packages are kept as import paths rather than
//! pointers. This lets a package that is part of an import cycle be built
//! while its dependency is still in progress.

use crate::ImportPath;
use indexmap::IndexMap;
use std::fmt;

/// Where a package's interface came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageOrigin {
    /// Decoded from a precompiled artifact.
    Binary,
    /// Derived by parsing and type-checking source files.
    Source,
}

impl fmt::Display for PackageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageOrigin::Binary => f.write_str("binary"),
            PackageOrigin::Source => f.write_str("source"),
        }
    }
}

/// Kind of an exported member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Type,
    Func,
    Const,
    Var,
}

/// One exported member of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// Rendered type or signature, e.g. `func(string) error`.
    pub signature: String,
}

/// The resolved exported interface of one package.
#[derive(Debug, PartialEq, Eq)]
pub struct TypePackage {
    path: ImportPath,
    name: String,
    origin: PackageOrigin,
    members: IndexMap<String, Member>,
    imports: Vec<ImportPath>,
}

impl TypePackage {
    pub fn builder(
        path: ImportPath,
        name: impl Into<String>,
        origin: PackageOrigin,
    ) -> TypePackageBuilder {
        TypePackageBuilder {
            package: TypePackage {
                path,
                name: name.into(),
                origin,
                members: IndexMap::new(),
                imports: Vec::new(),
            },
        }
    }

    pub fn path(&self) -> &ImportPath {
        &self.path
    }

    /// Package name as declared by the package itself.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> PackageOrigin {
        self.origin
    }

    /// Look up an exported member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Exported members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Import paths this package's interface refers to.
    pub fn imports(&self) -> &[ImportPath] {
        &self.imports
    }
}

/// Incremental constructor for [`TypePackage`].
#[derive(Debug)]
pub struct TypePackageBuilder {
    package: TypePackage,
}

impl TypePackageBuilder {
    /// Add an exported member. A later member with the same name replaces
    /// the earlier one but keeps its position.
    pub fn member(
        mut self,
        kind: MemberKind,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.package.members.insert(
            name.clone(),
            Member {
                name,
                kind,
                signature: signature.into(),
            },
        );
        self
    }

    /// Record a referenced import path. Duplicates are ignored.
    pub fn import(mut self, path: ImportPath) -> Self {
        if !self.package.imports.contains(&path) {
            self.package.imports.push(path);
        }
        self
    }

    pub fn build(self) -> TypePackage {
        self.package
    }
}

#[cfg(test)]
#[path = "../tests/package_tests.rs"]
mod package_tests;
