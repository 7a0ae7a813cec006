//! Identifier Namer: deterministic, length-bounded names for anonymous
//! aliases, generated labels and bind placeholders.
//!
//! Names longer than the dialect limit are cut to `limit - 9` characters and
//! suffixed with `_` plus the first eight hex digits of the MD5 of the full
//! name, so two long names sharing a prefix still diverge and the same name
//! always shortens the same way. One namer lives for exactly one compilation.

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult};

/// Room taken by the `_` + 8 hex digit suffix.
const HASH_SUFFIX_LEN: usize = 9;

fn hash8(name: &str) -> String {
    let digest = format!("{:x}", md5::compute(name.as_bytes()));
    digest[..8].to_string()
}

/// Shorten `name` to exactly `limit` characters.
///
/// Limits below ten leave no room for a prefix and raise
/// [`CompileError::Identifier`].
pub fn truncate_name(name: &str, limit: usize) -> CompileResult<String> {
    if limit <= HASH_SUFFIX_LEN {
        return Err(CompileError::Identifier {
            name: name.to_string(),
            limit,
        });
    }
    let prefix: String = name.chars().take(limit - HASH_SUFFIX_LEN).collect();
    Ok(format!("{}_{}", prefix, hash8(name)))
}

#[derive(Debug)]
pub struct IdentifierNamer {
    max_length: usize,
    counters: HashMap<String, usize>,
    bind_counters: HashMap<String, usize>,
    shortened: HashMap<String, String>,
    owners: HashMap<String, String>,
}

impl IdentifierNamer {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            counters: HashMap::new(),
            bind_counters: HashMap::new(),
            shortened: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Names chosen by the caller are never shortened.
    pub fn check_explicit(&self, name: &str) -> CompileResult<()> {
        if name.chars().count() > self.max_length {
            return Err(CompileError::Identifier {
                name: name.to_string(),
                limit: self.max_length,
            });
        }
        Ok(())
    }

    /// A generated name, shortened when it exceeds the limit. Repeated calls
    /// with the same name return the same result.
    pub fn generated(&mut self, name: &str) -> CompileResult<String> {
        if name.chars().count() <= self.max_length {
            return Ok(name.to_string());
        }
        if let Some(done) = self.shortened.get(name) {
            return Ok(done.clone());
        }

        let mut candidate = truncate_name(name, self.max_length)?;
        let mut counter = 0usize;
        while self.owners.get(&candidate).is_some_and(|owner| owner != name) {
            counter += 1;
            let suffix = format!("_{}_{}", hash8(name), counter);
            let room = self.max_length.checked_sub(suffix.len()).ok_or_else(|| {
                CompileError::Identifier {
                    name: name.to_string(),
                    limit: self.max_length,
                }
            })?;
            let prefix: String = name.chars().take(room).collect();
            candidate = format!("{}{}", prefix, suffix);
        }

        tracing::trace!("shortened identifier '{}' to '{}'", name, candidate);
        self.owners.insert(candidate.clone(), name.to_string());
        self.shortened.insert(name.to_string(), candidate.clone());
        Ok(candidate)
    }

    /// Next `<base>_<n>` name; counters are per base and start at 1.
    pub fn anonymous(&mut self, base: &str) -> CompileResult<String> {
        let n = self.counters.entry(base.to_string()).or_insert(0);
        *n += 1;
        let name = format!("{}_{}", base, n);
        self.generated(&name)
    }

    /// Next unshortened `<base>_<n>` key for an anonymous bind parameter.
    /// Binds count separately from labels and aliases.
    pub fn anonymous_key(&mut self, base: &str) -> String {
        let n = self.bind_counters.entry(base.to_string()).or_insert(0);
        *n += 1;
        format!("{}_{}", base, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_short_names_untouched() {
        let mut namer = IdentifierNamer::new(30);
        assert_eq!(namer.generated("users_name").unwrap(), "users_name");
    }

    #[test]
    fn test_truncated_shape() {
        let name = "some_large_named_table_this_is_the_primarykey_column";
        let short = truncate_name(name, 29).unwrap();
        assert_eq!(short.len(), 29);
        assert!(short.starts_with("some_large_named_tab_"));
        assert!(short[21..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(short, truncate_name(name, 29).unwrap());
    }

    #[test]
    fn test_shared_prefix_diverges() {
        let mut namer = IdentifierNamer::new(29);
        let a = namer
            .generated("some_large_named_table_this_is_the_primarykey_column")
            .unwrap();
        let b = namer
            .generated("some_large_named_table_this_is_the_data_column")
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 29);
        assert_eq!(b.len(), 29);
        assert_eq!(&a[..20], &b[..20]);
    }

    #[test]
    fn test_generated_is_memoized() {
        let mut namer = IdentifierNamer::new(12);
        let first = namer.generated("a_rather_long_label").unwrap();
        let again = namer.generated("a_rather_long_label").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_limit_too_small() {
        let err = truncate_name("abcdefghijkl", 9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Identifier);
        let mut namer = IdentifierNamer::new(5);
        assert!(namer.generated("abcdef").is_err());
        assert_eq!(namer.generated("abc").unwrap(), "abc");
    }

    #[test]
    fn test_anonymous_counters_per_base() {
        let mut namer = IdentifierNamer::new(63);
        assert_eq!(namer.anonymous("anon").unwrap(), "anon_1");
        assert_eq!(namer.anonymous("anon").unwrap(), "anon_2");
        assert_eq!(namer.anonymous("count").unwrap(), "count_1");
    }

    #[test]
    fn test_explicit_names_checked() {
        let namer = IdentifierNamer::new(10);
        assert!(namer.check_explicit("short").is_ok());
        let err = namer.check_explicit("much_too_long_name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Identifier);
    }
}
