//! Dialect profiles.
//!
//! A [`DialectProfile`] is an immutable description of one target database:
//! how identifiers are quoted, how parameters are written, which constructs
//! exist, and how types are named. It is composed from independent strategy
//! values ([`IdentifierPreparer`], [`TypeCompiler`], [`DriverQuirks`]) rather
//! than a hierarchy, so a driver variant is just a profile with different
//! quirks.

pub mod config;
pub mod preparer;
pub mod type_compiler;

pub use config::ProfileConfig;
pub use preparer::{IdentifierPreparer, RESERVED_WORDS};
pub use type_compiler::{TypeCompiler, TypeFamily};

use std::fmt;

use serde::{Deserialize, Serialize};

/// How bind parameters are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamStyle {
    /// `:name`
    Named,
    /// `?`
    Qmark,
    /// `:1`
    Numbered,
    /// `$1`
    Dollar,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
}

impl ParamStyle {
    pub const ALL: [ParamStyle; 6] = [
        ParamStyle::Named,
        ParamStyle::Qmark,
        ParamStyle::Numbered,
        ParamStyle::Dollar,
        ParamStyle::Format,
        ParamStyle::Pyformat,
    ];

    /// Positional styles bind one value per placeholder occurrence.
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            ParamStyle::Qmark | ParamStyle::Numbered | ParamStyle::Dollar | ParamStyle::Format
        )
    }

    /// Placeholder text for a parameter; `position` is 1-based.
    pub fn placeholder(self, name: &str, position: usize) -> String {
        match self {
            ParamStyle::Named => format!(":{}", name),
            ParamStyle::Qmark => "?".to_string(),
            ParamStyle::Numbered => format!(":{}", position),
            ParamStyle::Dollar => format!("${}", position),
            ParamStyle::Format => "%s".to_string(),
            ParamStyle::Pyformat => format!("%({})s", name),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamStyle::Named => "named",
            ParamStyle::Qmark => "qmark",
            ParamStyle::Numbered => "numbered",
            ParamStyle::Dollar => "dollar",
            ParamStyle::Format => "format",
            ParamStyle::Pyformat => "pyformat",
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a statement containing a recursive CTE opens its WITH clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecursiveCte {
    /// `WITH RECURSIVE`
    Keyword,
    /// Plain `WITH`; recursion is detected by the database.
    Implicit,
    Unsupported,
}

/// Row-limiting syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH FIRST n ROWS ONLY`
    FetchFirst,
    /// `SELECT TOP n`; with an offset, `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
    Top,
}

/// How binary values are written as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryLiteral {
    /// `'\x0102'`
    EscapeBytea,
    /// `X'0102'`
    HexString,
    /// `0x0102`
    HexNumber,
}

/// Constructs the dialect can express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    pub cte: bool,
    pub returning: bool,
    pub multi_values_insert: bool,
    /// Inline values in place of placeholders when asked to.
    pub literal_binds: bool,
    /// TRUE/FALSE literals; otherwise 1/0.
    pub native_boolean: bool,
    pub ilike: bool,
    /// `a || b`; otherwise `concat(a, b)`.
    pub concat_operator: bool,
    pub nulls_ordering: bool,
    pub intersect_except: bool,
    /// Enum types are created as named types.
    pub named_enums: bool,
    pub if_exists_ddl: bool,
    /// String literals treat backslash as an escape character.
    pub backslash_escapes: bool,
    /// `FROM t AS a`; otherwise `FROM t a`.
    pub table_alias_as: bool,
    /// `SELECT ... FOR UPDATE`; otherwise the lock request is dropped.
    pub for_update: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            cte: true,
            returning: false,
            multi_values_insert: true,
            literal_binds: true,
            native_boolean: true,
            ilike: false,
            concat_operator: true,
            nulls_ordering: true,
            intersect_except: true,
            named_enums: false,
            if_exists_ddl: true,
            backslash_escapes: false,
            table_alias_as: true,
            for_update: true,
        }
    }
}

/// Behavior of the driver that exchanges values with the database. These
/// shape the wire form of binds and results, never the SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverQuirks {
    /// JSON columns travel as parsed documents.
    pub native_json: bool,
    /// Booleans travel as 0/1 integers.
    pub boolean_as_int: bool,
    /// UUIDs travel as 16 raw bytes.
    pub uuid_as_bytes: bool,
    /// Arrays travel in `{a,b,c}` text form.
    pub array_as_text: bool,
}

/// One target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectProfile {
    pub name: String,
    pub paramstyle: ParamStyle,
    pub recursive_cte: RecursiveCte,
    pub limit_style: LimitStyle,
    /// Written as LIMIT when only an OFFSET is given, e.g. `-1` on SQLite.
    pub no_limit_token: Option<String>,
    pub binary_literal: BinaryLiteral,
    pub features: Features,
    pub quirks: DriverQuirks,
    pub preparer: IdentifierPreparer,
    pub type_compiler: TypeCompiler,
}

impl DialectProfile {
    /// Built-in profile names, in display order.
    pub const BUILTIN: [&'static str; 6] =
        ["generic", "postgresql", "mysql", "sqlite", "oracle", "mssql"];

    /// ANSI-flavored profile with named parameters and no length limit.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            paramstyle: ParamStyle::Named,
            recursive_cte: RecursiveCte::Keyword,
            limit_style: LimitStyle::LimitOffset,
            no_limit_token: None,
            binary_literal: BinaryLiteral::HexString,
            features: Features::default(),
            quirks: DriverQuirks::default(),
            preparer: IdentifierPreparer::new('"', 9999),
            type_compiler: TypeCompiler::new(TypeFamily::Generic),
        }
    }

    pub fn postgresql() -> Self {
        Self {
            name: "postgresql".to_string(),
            paramstyle: ParamStyle::Dollar,
            recursive_cte: RecursiveCte::Keyword,
            limit_style: LimitStyle::LimitOffset,
            no_limit_token: None,
            binary_literal: BinaryLiteral::EscapeBytea,
            features: Features {
                returning: true,
                ilike: true,
                named_enums: true,
                ..Features::default()
            },
            quirks: DriverQuirks {
                native_json: true,
                ..DriverQuirks::default()
            },
            preparer: IdentifierPreparer::new('"', 63),
            type_compiler: TypeCompiler::new(TypeFamily::Postgresql),
        }
    }

    pub fn mysql() -> Self {
        Self {
            name: "mysql".to_string(),
            paramstyle: ParamStyle::Format,
            recursive_cte: RecursiveCte::Keyword,
            limit_style: LimitStyle::LimitOffset,
            no_limit_token: Some("18446744073709551615".to_string()),
            binary_literal: BinaryLiteral::HexString,
            features: Features {
                concat_operator: false,
                nulls_ordering: false,
                intersect_except: false,
                backslash_escapes: true,
                ..Features::default()
            },
            quirks: DriverQuirks {
                boolean_as_int: true,
                ..DriverQuirks::default()
            },
            preparer: IdentifierPreparer::new('`', 64).with_reserved(&["rank", "rows", "window"]),
            type_compiler: TypeCompiler::new(TypeFamily::Mysql),
        }
    }

    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            paramstyle: ParamStyle::Qmark,
            recursive_cte: RecursiveCte::Keyword,
            limit_style: LimitStyle::LimitOffset,
            no_limit_token: Some("-1".to_string()),
            binary_literal: BinaryLiteral::HexString,
            features: Features {
                returning: true,
                native_boolean: false,
                for_update: false,
                ..Features::default()
            },
            quirks: DriverQuirks {
                boolean_as_int: true,
                ..DriverQuirks::default()
            },
            preparer: IdentifierPreparer::new('"', 9999),
            type_compiler: TypeCompiler::new(TypeFamily::Sqlite),
        }
    }

    pub fn oracle() -> Self {
        Self {
            name: "oracle".to_string(),
            paramstyle: ParamStyle::Named,
            recursive_cte: RecursiveCte::Implicit,
            limit_style: LimitStyle::FetchFirst,
            no_limit_token: None,
            binary_literal: BinaryLiteral::HexString,
            features: Features {
                multi_values_insert: false,
                native_boolean: false,
                if_exists_ddl: false,
                table_alias_as: false,
                ..Features::default()
            },
            quirks: DriverQuirks {
                boolean_as_int: true,
                ..DriverQuirks::default()
            },
            preparer: IdentifierPreparer::new('"', 30).with_reserved(&["level", "size", "uid"]),
            type_compiler: TypeCompiler::new(TypeFamily::Oracle),
        }
    }

    pub fn mssql() -> Self {
        Self {
            name: "mssql".to_string(),
            paramstyle: ParamStyle::Qmark,
            recursive_cte: RecursiveCte::Implicit,
            limit_style: LimitStyle::Top,
            no_limit_token: None,
            binary_literal: BinaryLiteral::HexNumber,
            features: Features {
                native_boolean: false,
                concat_operator: false,
                nulls_ordering: false,
                for_update: false,
                ..Features::default()
            },
            quirks: DriverQuirks {
                boolean_as_int: true,
                ..DriverQuirks::default()
            },
            preparer: IdentifierPreparer::bracketed(128),
            type_compiler: TypeCompiler::new(TypeFamily::Mssql),
        }
    }

    /// Built-in profile by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "generic" | "default" => Some(Self::generic()),
            "postgresql" | "postgres" | "pg" => Some(Self::postgresql()),
            "mysql" | "mariadb" => Some(Self::mysql()),
            "sqlite" => Some(Self::sqlite()),
            "oracle" => Some(Self::oracle()),
            "mssql" | "sqlserver" => Some(Self::mssql()),
            _ => None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_paramstyle(mut self, style: ParamStyle) -> Self {
        self.paramstyle = style;
        self
    }

    pub fn with_max_identifier_length(mut self, limit: usize) -> Self {
        self.preparer.max_identifier_length = limit;
        self
    }

    pub fn with_recursive_cte(mut self, recursive: RecursiveCte) -> Self {
        self.recursive_cte = recursive;
        self
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn with_quirks(mut self, quirks: DriverQuirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn max_identifier_length(&self) -> usize {
        self.preparer.max_identifier_length
    }

    /// The WITH keyword for a clause containing a recursive CTE, or `None`
    /// when recursion cannot be expressed.
    pub fn recursive_with_keyword(&self) -> Option<&'static str> {
        match self.recursive_cte {
            RecursiveCte::Keyword => Some("WITH RECURSIVE"),
            RecursiveCte::Implicit => Some("WITH"),
            RecursiveCte::Unsupported => None,
        }
    }

    /// Quote a string literal, doubling quotes and, where the dialect treats
    /// backslash as an escape, doubling backslashes.
    pub fn quote_string(&self, s: &str) -> String {
        let mut escaped = s.replace('\'', "''");
        if self.features.backslash_escapes {
            escaped = escaped.replace('\\', "\\\\");
        }
        format!("'{}'", escaped)
    }

    pub fn bool_literal(&self, b: bool) -> &'static str {
        match (self.features.native_boolean, b) {
            (true, true) => "true",
            (true, false) => "false",
            (false, true) => "1",
            (false, false) => "0",
        }
    }

    pub fn binary_literal(&self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        match self.binary_literal {
            BinaryLiteral::EscapeBytea => format!("'\\x{}'", hex),
            BinaryLiteral::HexString => format!("X'{}'", hex),
            BinaryLiteral::HexNumber => format!("0x{}", hex),
        }
    }
}

impl Default for DialectProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl fmt::Display for DialectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(ParamStyle::Named.placeholder("x", 1), ":x");
        assert_eq!(ParamStyle::Numbered.placeholder("x", 3), ":3");
        assert_eq!(ParamStyle::Dollar.placeholder("x", 2), "$2");
        assert_eq!(ParamStyle::Qmark.placeholder("x", 2), "?");
        assert_eq!(ParamStyle::Format.placeholder("x", 2), "%s");
        assert_eq!(ParamStyle::Pyformat.placeholder("x", 2), "%(x)s");
        assert!(ParamStyle::Numbered.is_positional());
        assert!(!ParamStyle::Pyformat.is_positional());
    }

    #[test]
    fn test_builtin_lookup() {
        for name in DialectProfile::BUILTIN {
            let profile = DialectProfile::builtin(name).unwrap();
            assert_eq!(profile.name, name);
        }
        assert_eq!(DialectProfile::builtin("postgres").unwrap().name, "postgresql");
        assert!(DialectProfile::builtin("db2").is_none());
    }

    #[test]
    fn test_recursive_keyword() {
        assert_eq!(
            DialectProfile::postgresql().recursive_with_keyword(),
            Some("WITH RECURSIVE")
        );
        assert_eq!(DialectProfile::mssql().recursive_with_keyword(), Some("WITH"));
        let none = DialectProfile::generic().with_recursive_cte(RecursiveCte::Unsupported);
        assert_eq!(none.recursive_with_keyword(), None);
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(DialectProfile::postgresql().quote_string("it's"), "'it''s'");
        assert_eq!(DialectProfile::postgresql().quote_string("a\\b"), "'a\\b'");
        assert_eq!(DialectProfile::mysql().quote_string("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_binary_literal_forms() {
        assert_eq!(DialectProfile::postgresql().binary_literal(&[1, 255]), "'\\x01ff'");
        assert_eq!(DialectProfile::sqlite().binary_literal(&[1, 255]), "X'01ff'");
        assert_eq!(DialectProfile::mssql().binary_literal(&[1, 255]), "0x01ff");
    }
}
