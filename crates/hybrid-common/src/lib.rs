//! Common types and utilities for the hybrid package importer.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - Import paths (`ImportPath`)
//! - Dependency kinds (`DependencyKind`)
//! - Resolved package interfaces (`TypePackage`, `Member`, `PackageOrigin`)
//! - The session/resolution error taxonomy (`SessionError`, `ResolveError`)
//! - Session configuration (`SessionConfig`, `CommandSpec`)

// Import paths - the key every map in a session is indexed by
pub mod import_path;
pub use import_path::{ImportPath, InvalidImportPath};

// Dependency kinds reported by the metadata query
pub mod dependency;
pub use dependency::DependencyKind;

// Resolved package interfaces
pub mod package;
pub use package::{Member, MemberKind, PackageOrigin, TypePackage, TypePackageBuilder};

// Error taxonomy
pub mod error;
pub use error::{FailureKind, ResolveError, ResolveReason, SessionError};

// Session configuration
pub mod config;
pub use config::{CommandSpec, SessionConfig};
