//! Compiled statement cache.
//!
//! Entries are keyed by the statement's structural fingerprint, the dialect
//! name and the compile options. Cached statements carry no bind values of
//! their own: a hit re-reads the values from the statement being looked up,
//! so two statements of the same shape share one compilation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::ast::Statement;
use crate::compiler::{BindInventory, CompileOptions, CompiledStatement, Compiler};
use crate::dialect::DialectProfile;
use crate::error::CompileResult;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: u64,
    dialect: String,
    options: CompileOptions,
}

/// Thread-safe cache in front of a [`Compiler`].
pub struct StatementCache {
    compiler: Compiler,
    entries: DashMap<CacheKey, CompiledStatement>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatementCache {
    pub fn new(compiler: Compiler, config: CacheConfig) -> Self {
        Self {
            compiler,
            entries: DashMap::with_capacity(config.max_entries),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn compile(
        &self,
        stmt: &Statement,
        dialect: &DialectProfile,
    ) -> CompileResult<CompiledStatement> {
        self.compile_with(stmt, dialect, CompileOptions::default())
    }

    /// Compile through the cache.
    ///
    /// In literal-binds mode values are part of the SQL text, so they are
    /// part of the key as well.
    pub fn compile_with(
        &self,
        stmt: &Statement,
        dialect: &DialectProfile,
        options: CompileOptions,
    ) -> CompileResult<CompiledStatement> {
        if !self.config.enabled {
            return self.compiler.compile_with(stmt, dialect, options);
        }

        let key = CacheKey {
            fingerprint: stmt.fingerprint(options.literal_binds),
            dialect: dialect.name.clone(),
            options,
        };

        if let Some(entry) = self.entries.get(&key) {
            // Same name, different settings: a profile edited in place.
            if entry.dialect() == dialect {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "statement cache hit for {} on {} ({:016x})",
                    stmt.kind(),
                    dialect.name,
                    key.fingerprint
                );
                let values = BindInventory::collect(stmt)?.values();
                return Ok(entry.with_values(values));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "statement cache miss for {} on {} ({:016x})",
            stmt.kind(),
            dialect.name,
            key.fingerprint
        );
        let compiled = self.compiler.compile_with(stmt, dialect, options)?;

        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            tracing::debug!(
                "statement cache full ({} entries), not storing",
                self.entries.len()
            );
        } else {
            self.entries.insert(key, compiled.with_values(Vec::new()));
        }
        Ok(compiled)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
