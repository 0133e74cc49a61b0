//! Saved constraint bundles and named graph instances
//!
//! Two small filesystem stores back the API's persistence endpoints:
//!
//! - [`ConstraintStore`] keeps user-authored RPC bundles as timestamped
//!   JSON files (`constraints-YYYYMMDD-HHMMSS.json`) with the layout
//!   `{"constraints": ["C1 = …", …]}`. The engine itself never writes
//!   files; only this store does, and only the `constraints` array is
//!   ever read back.
//! - [`InstanceManager`] manages named graph documents under a directory
//!   (`<name>.json`) plus a marker file recording which instance is
//!   active. A missing or stale marker falls back to
//!   [`DEFAULT_INSTANCE`].
//!
//! Bundle validation is purely syntactic (parse + blank-symbol check):
//! labels unknown to the graph legitimately denote empty pair-sets, so
//! they are not validation errors.

#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::eval::validate_symbols;
use crate::parser::parse_rpc;
use crate::probe::MemoryGraph;

/// Name of the instance used when no marker is present.
pub const DEFAULT_INSTANCE: &str = "default";

/// Persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("i/o failure on {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A stored document did not parse.
    #[error("malformed document {path}: {source}")]
    Malformed {
        /// Path involved.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// No saved bundle under that name.
    #[error("no such saved bundle '{0}'")]
    NoSuchBundle(String),
    /// No graph instance under that name.
    #[error("unknown graph instance '{0}'")]
    UnknownInstance(String),
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}

// ============================================================================
// Constraint bundles
// ============================================================================

/// A saved set of constraint strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConstraintBundle {
    /// The RPC strings, in authoring order.
    pub constraints: Vec<String>,
}

/// One rejected constraint in a bundle.
#[derive(Clone, Debug, Serialize)]
pub struct BundleIssue {
    /// Index into the bundle's `constraints` array.
    pub index: usize,
    /// Why the constraint was rejected.
    pub message: String,
}

/// Outcome of validating a bundle.
#[derive(Clone, Debug, Serialize)]
pub struct BundleReport {
    /// `true` iff every constraint parsed and passed symbol validation.
    pub ok: bool,
    /// The rejections, in bundle order.
    pub errors: Vec<BundleIssue>,
}

/// Syntax-check every constraint of a bundle.
pub fn validate_bundle(bundle: &ConstraintBundle) -> BundleReport {
    let mut errors = Vec::new();
    for (index, raw) in bundle.constraints.iter().enumerate() {
        match parse_rpc(raw) {
            Err(e) => errors.push(BundleIssue { index, message: e.to_string() }),
            Ok(rpc) => {
                for symbol_error in validate_symbols(&rpc) {
                    errors.push(BundleIssue { index, message: symbol_error.to_string() });
                }
            }
        }
    }
    BundleReport { ok: errors.is_empty(), errors }
}

/// Directory of timestamped bundle files.
#[derive(Clone, Debug)]
pub struct ConstraintStore {
    dir: PathBuf,
}

impl ConstraintStore {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }

    /// Write a bundle under a fresh timestamped name; returns the filename.
    pub fn save(&self, bundle: &ConstraintBundle) -> Result<String, StoreError> {
        let name = format!("constraints-{}.json", Local::now().format("%Y%m%d-%H%M%S"));
        let path = self.dir.join(&name);
        let text = serde_json::to_string_pretty(bundle)
            .map_err(|e| StoreError::Malformed { path: path.display().to_string(), source: e })?;
        fs::write(&path, text).map_err(|e| io_err(&path, e))?;
        Ok(name)
    }

    /// Saved bundle filenames, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("constraints-") && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read one saved bundle back.
    pub fn load(&self, name: &str) -> Result<ConstraintBundle, StoreError> {
        // File names only; no path traversal through the API.
        if name.contains('/') || name.contains('\\') {
            return Err(StoreError::NoSuchBundle(name.to_owned()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StoreError::NoSuchBundle(name.to_owned()));
        }
        let text = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Malformed { path: path.display().to_string(), source: e })
    }
}

// ============================================================================
// Graph instances
// ============================================================================

/// Named graph documents plus the active-instance marker.
#[derive(Clone, Debug)]
pub struct InstanceManager {
    graphs_dir: PathBuf,
    state_file: PathBuf,
}

impl InstanceManager {
    /// Open (and create if needed) the instance directory and marker home.
    pub fn open(
        graphs_dir: impl Into<PathBuf>,
        state_file: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let graphs_dir = graphs_dir.into();
        let state_file = state_file.into();
        fs::create_dir_all(&graphs_dir).map_err(|e| io_err(&graphs_dir, e))?;
        if let Some(parent) = state_file.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        Ok(Self { graphs_dir, state_file })
    }

    /// Available instance names (file stems), sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.graphs_dir).map_err(|e| io_err(&self.graphs_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.graphs_dir, e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Make `name` the active instance.
    pub fn set_active(&self, name: &str) -> Result<(), StoreError> {
        let name = name.trim();
        if !self.list()?.contains(&name.to_owned()) {
            return Err(StoreError::UnknownInstance(name.to_owned()));
        }
        fs::write(&self.state_file, name).map_err(|e| io_err(&self.state_file, e))
    }

    /// The active instance name, falling back to [`DEFAULT_INSTANCE`] when
    /// the marker is missing or names an instance that no longer exists.
    pub fn current_or_default(&self) -> String {
        let marked = fs::read_to_string(&self.state_file)
            .map(|s| s.trim().to_owned())
            .unwrap_or_default();
        if !marked.is_empty() && self.list().map_or(false, |all| all.contains(&marked)) {
            return marked;
        }
        // Stale marker: reset best-effort and fall back.
        let _ = fs::write(&self.state_file, DEFAULT_INSTANCE);
        DEFAULT_INSTANCE.to_owned()
    }

    /// Load one instance's graph document.
    pub fn load(&self, name: &str) -> Result<MemoryGraph, StoreError> {
        if name.contains('/') || name.contains('\\') {
            return Err(StoreError::UnknownInstance(name.to_owned()));
        }
        let path = self.graphs_dir.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(StoreError::UnknownInstance(name.to_owned()));
        }
        let text = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        MemoryGraph::from_json(&text)
            .map_err(|e| StoreError::Malformed { path: path.display().to_string(), source: e })
    }

    /// Load the active instance's graph.
    pub fn load_active(&self) -> Result<MemoryGraph, StoreError> {
        self.load(&self.current_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================
