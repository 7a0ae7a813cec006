//! Startup-built bundle of the type registry and the dialect profiles.
//!
//! A `Catalog` is assembled once (built-ins, then any profile files) and is
//! read-only afterwards. Compilers borrow its registry; profiles are handed
//! out behind `Arc` so a statement cache can key on them cheaply.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::compiler::Compiler;
use crate::dialect::DialectProfile;
use crate::error::{CompileError, CompileResult};
use crate::types::TypeRegistry;

/// Names of the profiles every catalog starts with.
pub const BUILTIN_DIALECTS: [&str; 6] = ["generic", "postgresql", "mysql", "sqlite", "oracle", "mssql"];

/// Default directory searched for `*.toml` dialect profiles.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sqlcraft").join("dialects"))
}

#[derive(Clone)]
pub struct Catalog {
    registry: Arc<TypeRegistry>,
    profiles: BTreeMap<String, Arc<DialectProfile>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtins()
    }
}

impl Catalog {
    /// Built-in registry and the built-in profiles.
    pub fn builtins() -> Self {
        Self::with_registry(TypeRegistry::with_builtins())
    }

    /// Built-in profiles over a caller-supplied registry.
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        let profiles = BUILTIN_DIALECTS
            .iter()
            .filter_map(|name| DialectProfile::builtin(name))
            .map(|p| (p.name.clone(), Arc::new(p)))
            .collect();
        Self { registry, profiles }
    }

    /// Add or replace a profile. Returns the profile it replaced, if any.
    pub fn register_profile(&mut self, profile: DialectProfile) -> Option<Arc<DialectProfile>> {
        let name = profile.name.clone();
        let previous = self.profiles.insert(name.clone(), Arc::new(profile));
        if previous.is_some() {
            debug!("dialect profile '{}' replaced", name);
        }
        previous
    }

    /// Load every `*.toml` file in `dir`, in file-name order.
    ///
    /// A missing directory loads nothing. A file that fails to parse aborts
    /// the load with the file's path in the message; profiles registered
    /// before it stay registered.
    pub fn load_profiles_dir(&mut self, dir: impl AsRef<Path>) -> CompileResult<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("no dialect profile directory at {}", dir.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let profile = DialectProfile::load(&path)?;
            if BUILTIN_DIALECTS.contains(&profile.name.as_str()) {
                warn!(
                    "{} overrides the built-in '{}' profile",
                    path.display(),
                    profile.name
                );
            }
            loaded.push(profile.name.clone());
            self.register_profile(profile);
        }
        Ok(loaded)
    }

    pub fn profile(&self, name: &str) -> CompileResult<Arc<DialectProfile>> {
        if let Some(p) = self.profiles.get(name) {
            return Ok(p.clone());
        }
        // Aliases such as "pg" or "postgres" resolve to the built-in's name.
        DialectProfile::builtin(name)
            .and_then(|p| self.profiles.get(&p.name).cloned())
            .ok_or_else(|| {
                CompileError::config(format!(
                    "unknown dialect '{}'; available: {}",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<DialectProfile>> {
        self.profiles.values()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// A compiler sharing this catalog's registry.
    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.registry.clone())
    }
}
