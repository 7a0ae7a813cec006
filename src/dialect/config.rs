//! Dialect profiles from TOML.
//!
//! ```toml
//! name = "warehouse"
//! base = "postgresql"
//! paramstyle = "numbered"
//! max_identifier_length = 63
//! quote = "\""
//! recursive_cte = "keyword"
//!
//! [features]
//! returning = true
//!
//! [type_names]
//! json = "JSONB"
//! ```
//!
//! Every key except `name` is optional; missing keys keep the value of the
//! `base` profile (or of the generic profile when no base is given).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    BinaryLiteral, DialectProfile, DriverQuirks, Features, IdentifierPreparer, LimitStyle,
    ParamStyle, RecursiveCte, TypeFamily,
};
use crate::ast::TypeKey;
use crate::error::{CompileError, CompileResult};

/// Partial [`Features`]; unset fields inherit from the base profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cte: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_values_insert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal_binds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ilike: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat_operator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nulls_ordering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersect_except: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_enums: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_exists_ddl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backslash_escapes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_alias_as: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_update: Option<bool>,
}

impl FeaturesPatch {
    fn apply(&self, f: &mut Features) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { f.$field = v; })*
            };
        }
        set!(
            cte,
            returning,
            multi_values_insert,
            literal_binds,
            native_boolean,
            ilike,
            concat_operator,
            nulls_ordering,
            intersect_except,
            named_enums,
            if_exists_ddl,
            backslash_escapes,
            table_alias_as,
            for_update
        );
    }

    fn full(f: &Features) -> Self {
        Self {
            cte: Some(f.cte),
            returning: Some(f.returning),
            multi_values_insert: Some(f.multi_values_insert),
            literal_binds: Some(f.literal_binds),
            native_boolean: Some(f.native_boolean),
            ilike: Some(f.ilike),
            concat_operator: Some(f.concat_operator),
            nulls_ordering: Some(f.nulls_ordering),
            intersect_except: Some(f.intersect_except),
            named_enums: Some(f.named_enums),
            if_exists_ddl: Some(f.if_exists_ddl),
            backslash_escapes: Some(f.backslash_escapes),
            table_alias_as: Some(f.table_alias_as),
            for_update: Some(f.for_update),
        }
    }
}

/// Partial [`DriverQuirks`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuirksPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_json: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_as_int: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid_as_bytes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_as_text: Option<bool>,
}

impl QuirksPatch {
    fn apply(&self, q: &mut DriverQuirks) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { q.$field = v; })*
            };
        }
        set!(
            native_json,
            boolean_as_int,
            uuid_as_bytes,
            array_as_text
        );
    }

    fn full(q: &DriverQuirks) -> Self {
        Self {
            native_json: Some(q.native_json),
            boolean_as_int: Some(q.boolean_as_int),
            uuid_as_bytes: Some(q.uuid_as_bytes),
            array_as_text: Some(q.array_as_text),
        }
    }
}

/// On-disk form of a [`DialectProfile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paramstyle: Option<ParamStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_identifier_length: Option<usize>,
    /// One character, or two for distinct open/close quotes such as `"[]"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive_cte: Option<RecursiveCte>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_style: Option<LimitStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_limit_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_literal: Option<BinaryLiteral>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_family: Option<TypeFamily>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_words: Vec<String>,
    #[serde(default)]
    pub features: FeaturesPatch,
    #[serde(default)]
    pub quirks: QuirksPatch,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_names: BTreeMap<TypeKey, String>,
}

fn parse_quote(quote: &str) -> CompileResult<(char, char)> {
    let mut chars = quote.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(q), None, None) => Ok((q, q)),
        (Some(open), Some(close), None) => Ok((open, close)),
        _ => Err(CompileError::config(format!(
            "quote must be one or two characters, got '{}'",
            quote
        ))),
    }
}

impl ProfileConfig {
    pub fn from_toml_str(content: &str) -> CompileResult<Self> {
        toml::from_str(content).map_err(|e| CompileError::config(e.to_string()))
    }

    /// Resolve against the base profile.
    pub fn into_profile(self) -> CompileResult<DialectProfile> {
        if self.name.trim().is_empty() {
            return Err(CompileError::config("profile name must not be empty"));
        }
        let mut profile = match &self.base {
            Some(base) => DialectProfile::builtin(base).ok_or_else(|| {
                CompileError::config(format!("unknown base dialect '{}'", base))
            })?,
            None => DialectProfile::generic(),
        };
        profile.name = self.name;
        if let Some(style) = self.paramstyle {
            profile.paramstyle = style;
        }
        if let Some(limit) = self.max_identifier_length {
            if limit == 0 {
                return Err(CompileError::config(
                    "max_identifier_length must be positive",
                ));
            }
            profile.preparer.max_identifier_length = limit;
        }
        if let Some(quote) = &self.quote {
            let (open, close) = parse_quote(quote)?;
            profile.preparer.initial_quote = open;
            profile.preparer.final_quote = close;
        }
        if let Some(r) = self.recursive_cte {
            profile.recursive_cte = r;
        }
        if let Some(l) = self.limit_style {
            profile.limit_style = l;
        }
        if let Some(token) = self.no_limit_token {
            profile.no_limit_token = Some(token);
        }
        if let Some(b) = self.binary_literal {
            profile.binary_literal = b;
        }
        if let Some(family) = self.type_family {
            profile.type_compiler.family = family;
        }
        profile
            .preparer
            .extra_reserved
            .extend(self.reserved_words.iter().map(|w| w.to_lowercase()));
        self.features.apply(&mut profile.features);
        self.quirks.apply(&mut profile.quirks);
        profile.type_compiler.overrides.extend(self.type_names);
        Ok(profile)
    }

    /// Fully spelled-out config that loads back to `profile`.
    pub fn from_profile(profile: &DialectProfile) -> Self {
        let IdentifierPreparer {
            initial_quote,
            final_quote,
            max_identifier_length,
            extra_reserved,
        } = &profile.preparer;
        let quote = if initial_quote == final_quote {
            initial_quote.to_string()
        } else {
            format!("{}{}", initial_quote, final_quote)
        };
        Self {
            name: profile.name.clone(),
            base: None,
            paramstyle: Some(profile.paramstyle),
            max_identifier_length: Some(*max_identifier_length),
            quote: Some(quote),
            recursive_cte: Some(profile.recursive_cte),
            limit_style: Some(profile.limit_style),
            no_limit_token: profile.no_limit_token.clone(),
            binary_literal: Some(profile.binary_literal),
            type_family: Some(profile.type_compiler.family),
            reserved_words: extra_reserved.clone(),
            features: FeaturesPatch::full(&profile.features),
            quirks: QuirksPatch::full(&profile.quirks),
            type_names: profile.type_compiler.overrides.clone(),
        }
    }
}

impl DialectProfile {
    pub fn from_toml_str(content: &str) -> CompileResult<Self> {
        ProfileConfig::from_toml_str(content)?.into_profile()
    }

    pub fn load(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let profile = Self::from_toml_str(&content)
            .map_err(|e| CompileError::config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("loaded dialect profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    pub fn to_toml(&self) -> CompileResult<String> {
        toml::to_string(&ProfileConfig::from_profile(self))
            .map_err(|e| CompileError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_partial_profile_inherits_base() {
        let profile = DialectProfile::from_toml_str(
            r#"
            name = "warehouse"
            base = "postgresql"
            paramstyle = "numbered"

            [features]
            ilike = false
            for_update = false

            [type_names]
            json = "JSONB"
            "#,
        )
        .unwrap();
        assert_eq!(profile.name, "warehouse");
        assert_eq!(profile.paramstyle, ParamStyle::Numbered);
        assert_eq!(profile.max_identifier_length(), 63);
        assert!(profile.features.returning);
        assert!(!profile.features.ilike);
        assert!(!profile.features.for_update);
        assert_eq!(
            profile.type_compiler.overrides.get(&TypeKey::Json).map(String::as_str),
            Some("JSONB")
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DialectProfile::from_toml_str("name = \"x\"\nparamstlye = \"named\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = DialectProfile::from_toml_str("name = \"x\"\n[features]\nwindow = true").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_base_rejected() {
        let err = DialectProfile::from_toml_str("name = \"x\"\nbase = \"db2\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_bracket_quotes() {
        let profile = DialectProfile::from_toml_str("name = \"x\"\nquote = \"[]\"").unwrap();
        assert_eq!(profile.preparer.quote("order"), "[order]");
        assert!(DialectProfile::from_toml_str("name = \"x\"\nquote = \"abc\"").is_err());
    }

    #[test]
    fn test_to_toml_loads_back() {
        for name in DialectProfile::BUILTIN {
            let profile = DialectProfile::builtin(name).unwrap();
            let text = profile.to_toml().unwrap();
            let loaded = DialectProfile::from_toml_str(&text).unwrap();
            assert_eq!(loaded, profile, "{}", text);
        }
    }
}
