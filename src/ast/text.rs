//! Textual SQL fragments.
//!
//! `:name` inside the text becomes a bind parameter, rendered in the
//! dialect's paramstyle like any other. A colon preceded by a word
//! character, another colon or a backslash is left alone, so `x::int`
//! passes through; `\:name` renders as a literal `:name`.

use super::expr::{BindParam, Expr};
use super::types::LogicalType;
use super::values::Value;
use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Sql(String),
    Bind(BindParam),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextClause {
    pub(crate) parts: Vec<TextPart>,
    pub(crate) ty: LogicalType,
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn parse(text: &str) -> Vec<TextPart> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut sql = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && chars.get(i + 1) == Some(&':') {
            sql.push(':');
            i += 2;
            continue;
        }
        if c == ':' {
            let after_word = i > 0 && (is_word(chars[i - 1]) || chars[i - 1] == ':');
            let mut end = i + 1;
            while end < chars.len() && is_word(chars[end]) {
                end += 1;
            }
            if !after_word && end > i + 1 && chars.get(end) != Some(&':') {
                if !sql.is_empty() {
                    parts.push(TextPart::Sql(std::mem::take(&mut sql)));
                }
                let name: String = chars[i + 1..end].iter().collect();
                parts.push(TextPart::Bind(BindParam::new(name)));
                i = end;
                continue;
            }
        }
        sql.push(c);
        i += 1;
    }
    if !sql.is_empty() {
        parts.push(TextPart::Sql(sql));
    }
    parts
}

impl TextClause {
    pub fn new(text: &str) -> Self {
        Self {
            parts: parse(text),
            ty: LogicalType::Null,
        }
    }

    pub fn parts(&self) -> &[TextPart] {
        &self.parts
    }

    /// Bind parameter names in order of first appearance.
    pub fn bind_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let TextPart::Bind(b) = part {
                if !out.contains(&b.key()) {
                    out.push(b.key());
                }
            }
        }
        out
    }

    /// Set the value of every `:key` occurrence.
    pub fn bind(self, key: &str, value: impl Into<Value>) -> CompileResult<Self> {
        let value = value.into();
        self.replace(key, |b| b.value(value.clone()))
    }

    /// Replace every `:key` occurrence with `param`, keeping its type and
    /// value. `param`'s key names the occurrences it replaces.
    pub fn bindparam(self, param: BindParam) -> CompileResult<Self> {
        let key = param.key().to_string();
        self.replace(&key, |_| param.clone())
    }

    fn replace(
        mut self,
        key: &str,
        mut with: impl FnMut(BindParam) -> BindParam,
    ) -> CompileResult<Self> {
        let mut found = false;
        let mut shared: Option<BindParam> = None;
        for part in &mut self.parts {
            if let TextPart::Bind(b) = part {
                if b.key() == key {
                    found = true;
                    // Every occurrence is the same node.
                    let next = match shared.clone() {
                        Some(done) => done,
                        None => {
                            let done = with(b.clone());
                            shared = Some(done.clone());
                            done
                        }
                    };
                    *b = next;
                }
            }
        }
        if !found {
            return Err(CompileError::argument(format!(
                "This text() construct doesn't define a bound parameter named '{}'",
                key
            )));
        }
        Ok(self)
    }

    /// Result type when the text is used as an expression.
    pub fn typed(mut self, ty: LogicalType) -> Self {
        self.ty = ty;
        self
    }

    /// Turn the text into a statement returning the given columns.
    pub fn columns<S: Into<String>>(
        self,
        columns: impl IntoIterator<Item = (S, LogicalType)>,
    ) -> TextualSelect {
        TextualSelect {
            text: self,
            columns: columns.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }
}

impl From<TextClause> for Expr {
    fn from(t: TextClause) -> Self {
        Expr::Text(t)
    }
}

/// Textual statement with a declared result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TextualSelect {
    pub(crate) text: TextClause,
    pub(crate) columns: Vec<(String, LogicalType)>,
}

impl TextualSelect {
    pub fn text(&self) -> &TextClause {
        &self.text
    }

    pub fn result_columns(&self) -> &[(String, LogicalType)] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn shape(t: &TextClause) -> Vec<String> {
        t.parts()
            .iter()
            .map(|p| match p {
                TextPart::Sql(s) => s.clone(),
                TextPart::Bind(b) => format!("<{}>", b.key()),
            })
            .collect()
    }

    #[test]
    fn test_bind_tokens() {
        let t = TextClause::new("select * from t where a = :a and b > :b_2 or a = :a");
        assert_eq!(
            shape(&t),
            vec![
                "select * from t where a = ",
                "<a>",
                " and b > ",
                "<b_2>",
                " or a = ",
                "<a>"
            ]
        );
        assert_eq!(t.bind_names(), vec!["a", "b_2"]);
    }

    #[test]
    fn test_colons_left_alone() {
        let t = TextClause::new("select x::int, '10:30', \\:raw from t");
        assert_eq!(shape(&t), vec!["select x::int, '10:30', :raw from t"]);
        assert!(t.bind_names().is_empty());
    }

    #[test]
    fn test_bind_sets_every_occurrence() {
        let t = TextClause::new(":x + :x").bind("x", 5).unwrap();
        let binds: Vec<&BindParam> = t
            .parts()
            .iter()
            .filter_map(|p| match p {
                TextPart::Bind(b) => Some(b),
                TextPart::Sql(_) => None,
            })
            .collect();
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0].id(), binds[1].id());
        assert_eq!(binds[0].current_value(), Some(&Value::Int(5)));
        assert_eq!(binds[0].ty(), &LogicalType::Integer);
    }

    #[test]
    fn test_unknown_bind_name() {
        let err = TextClause::new("a = :a").bind("b", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
