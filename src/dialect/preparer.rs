//! Identifier quoting.

use serde::{Deserialize, Serialize};

/// Words quoted wherever they appear as identifiers, in every dialect.
pub const RESERVED_WORDS: &[&str] = &[
    "all",
    "alter",
    "and",
    "any",
    "as",
    "asc",
    "between",
    "by",
    "case",
    "cast",
    "check",
    "column",
    "constraint",
    "create",
    "cross",
    "current_date",
    "current_time",
    "current_timestamp",
    "default",
    "delete",
    "desc",
    "distinct",
    "drop",
    "else",
    "end",
    "except",
    "exists",
    "false",
    "fetch",
    "for",
    "foreign",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "in",
    "index",
    "inner",
    "insert",
    "intersect",
    "into",
    "is",
    "join",
    "key",
    "left",
    "like",
    "limit",
    "natural",
    "not",
    "null",
    "offset",
    "on",
    "or",
    "order",
    "outer",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "set",
    "some",
    "table",
    "then",
    "to",
    "true",
    "union",
    "unique",
    "update",
    "user",
    "using",
    "values",
    "when",
    "where",
    "with",
];

/// Quotes identifiers that need it: reserved words, names with characters
/// outside `[a-z0-9_$]`, names starting with a digit, and names with
/// uppercase letters (which would otherwise fold case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPreparer {
    pub initial_quote: char,
    pub final_quote: char,
    pub max_identifier_length: usize,
    /// Dialect-specific words quoted in addition to [`RESERVED_WORDS`].
    #[serde(default)]
    pub extra_reserved: Vec<String>,
}

impl IdentifierPreparer {
    pub fn new(quote: char, max_identifier_length: usize) -> Self {
        Self {
            initial_quote: quote,
            final_quote: quote,
            max_identifier_length,
            extra_reserved: Vec::new(),
        }
    }

    pub fn bracketed(max_identifier_length: usize) -> Self {
        Self {
            initial_quote: '[',
            final_quote: ']',
            max_identifier_length,
            extra_reserved: Vec::new(),
        }
    }

    pub fn with_reserved(mut self, words: &[&str]) -> Self {
        self.extra_reserved
            .extend(words.iter().map(|w| w.to_lowercase()));
        self
    }

    pub fn is_reserved(&self, lower: &str) -> bool {
        RESERVED_WORDS.contains(&lower) || self.extra_reserved.iter().any(|w| w == lower)
    }

    pub fn requires_quotes(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.is_reserved(&lower)
            || name.is_empty()
            || lower != name
            || name.chars().next().map(|c| c.is_ascii_digit() || c == '$').unwrap_or(false)
            || name
                .chars()
                .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$'))
    }

    /// Always quote, doubling any embedded closing quote.
    pub fn quote_identifier(&self, name: &str) -> String {
        let close = self.final_quote.to_string();
        format!(
            "{}{}{}",
            self.initial_quote,
            name.replace(&close, &format!("{}{}", close, close)),
            self.final_quote
        )
    }

    /// Quote only when needed.
    pub fn quote(&self, name: &str) -> String {
        if self.requires_quotes(name) {
            self.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    pub fn format_table(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(name)),
            None => self.quote(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unquoted() {
        let p = IdentifierPreparer::new('"', 63);
        assert_eq!(p.quote("t1"), "t1");
        assert_eq!(p.quote("user_id"), "user_id");
    }

    #[test]
    fn test_reserved_and_mixed_case_quoted() {
        let p = IdentifierPreparer::new('"', 63);
        assert_eq!(p.quote("order"), "\"order\"");
        assert_eq!(p.quote("UserName"), "\"UserName\"");
        assert_eq!(p.quote("1st"), "\"1st\"");
        assert_eq!(p.quote("has space"), "\"has space\"");
    }

    #[test]
    fn test_embedded_quote_doubled() {
        let p = IdentifierPreparer::new('`', 64);
        assert_eq!(p.quote("we`ird"), "`we``ird`");
        let b = IdentifierPreparer::bracketed(128);
        assert_eq!(b.quote("a]b"), "[a]]b]");
    }

    #[test]
    fn test_schema_qualified() {
        let p = IdentifierPreparer::new('"', 63);
        assert_eq!(p.format_table(Some("billing"), "select"), "billing.\"select\"");
    }

    #[test]
    fn test_dialect_reserved() {
        let p = IdentifierPreparer::new('`', 64).with_reserved(&["RANK"]);
        assert_eq!(p.quote("rank"), "`rank`");
    }
}
