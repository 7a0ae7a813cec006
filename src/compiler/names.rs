//! Name assignment pass.
//!
//! Runs once, before rendering, and decides the final name of every alias,
//! label and bind parameter in the statement. The renderer only looks names
//! up, so nothing it does can change a name, and a reference that is
//! rendered before its definition still agrees with it.

use std::collections::HashMap;

use super::namer::IdentifierNamer;
use super::walk::{Visitor, Walker};
use crate::ast::{
    Alias, BindParam, Cte, Expr, Label, LabelStyle, NodeId, Select, Statement,
};
use crate::error::{CompileError, CompileResult};

/// The name a bind parameter is rendered and supplied under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BindName {
    /// Key callers use to supply a value.
    pub key: String,
    /// Placeholder name, shortened to the dialect limit.
    pub placeholder: String,
    /// First bind in walk order that carries this name; its value is used
    /// for every occurrence.
    pub owner: NodeId,
}

#[derive(Debug, Default)]
pub(crate) struct NameTable {
    aliases: HashMap<NodeId, String>,
    labels: HashMap<NodeId, String>,
    binds: HashMap<NodeId, BindName>,
    /// Generated `<table>_<col>` select-list labels, keyed by their
    /// unshortened form.
    entries: HashMap<String, String>,
}

impl NameTable {
    pub fn assign(stmt: &Statement, namer: &mut IdentifierNamer) -> CompileResult<Self> {
        let mut pass = Assigner {
            namer,
            table: NameTable::default(),
            by_key: HashMap::new(),
        };
        Walker::new(&mut pass).statement(stmt)?;
        Ok(pass.table)
    }

    pub fn alias(&self, alias: &Alias) -> CompileResult<&str> {
        self.aliases
            .get(&alias.id())
            .map(String::as_str)
            .ok_or_else(|| unnamed("alias", alias.name_or_hint()))
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn entry_label(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn bind(&self, bind: &BindParam) -> CompileResult<&BindName> {
        self.binds
            .get(&bind.id())
            .ok_or_else(|| unnamed("bind parameter", bind.key()))
    }
}

fn unnamed(what: &str, hint: &str) -> CompileError {
    CompileError::compile(format!(
        "{} '{}' is not part of the statement being compiled",
        what, hint
    ))
}

struct KeyUse {
    owner: NodeId,
    anonymous: bool,
    expanding: bool,
    placeholder: String,
}

struct Assigner<'n> {
    namer: &'n mut IdentifierNamer,
    table: NameTable,
    by_key: HashMap<String, KeyUse>,
}

impl Visitor for Assigner<'_> {
    fn bind(&mut self, bind: &BindParam) -> CompileResult<()> {
        if self.table.binds.contains_key(&bind.id()) {
            return Ok(());
        }

        let key = if bind.is_anonymous() {
            self.namer.anonymous_key(bind.key())
        } else {
            bind.key().to_string()
        };

        let name = match self.by_key.get(&key) {
            Some(existing) => {
                if bind.is_anonymous() || existing.anonymous {
                    return Err(CompileError::compile(format!(
                        "Bind parameter '{}' conflicts with unique bind parameter of the same name",
                        key
                    )));
                }
                if existing.expanding != bind.is_expanding() {
                    return Err(CompileError::compile(format!(
                        "Can't reuse bound parameter name '{}' in both 'expanding' (e.g. within an IN expression) and non-expanding contexts",
                        key
                    )));
                }
                BindName {
                    key: key.clone(),
                    placeholder: existing.placeholder.clone(),
                    owner: existing.owner,
                }
            }
            None => {
                let placeholder = self.namer.generated(&key)?;
                self.by_key.insert(
                    key.clone(),
                    KeyUse {
                        owner: bind.id(),
                        anonymous: bind.is_anonymous(),
                        expanding: bind.is_expanding(),
                        placeholder: placeholder.clone(),
                    },
                );
                BindName {
                    key: key.clone(),
                    placeholder,
                    owner: bind.id(),
                }
            }
        };

        tracing::trace!("bind {:?} named '{}'", bind.id(), name.placeholder);
        self.table.binds.insert(bind.id(), name);
        Ok(())
    }

    fn label(&mut self, label: &Label) -> CompileResult<()> {
        if self.table.labels.contains_key(&label.id()) {
            return Ok(());
        }
        let name = match label.name() {
            Some(explicit) => {
                self.namer.check_explicit(explicit)?;
                explicit.to_string()
            }
            None => self.namer.anonymous(label.key())?,
        };
        tracing::trace!("label {:?} named '{}'", label.id(), name);
        self.table.labels.insert(label.id(), name);
        Ok(())
    }

    fn alias(&mut self, alias: &Alias) -> CompileResult<()> {
        if self.table.aliases.contains_key(&alias.id()) {
            return Ok(());
        }
        let name = match alias.name() {
            Some(explicit) => {
                self.namer.check_explicit(explicit)?;
                explicit.to_string()
            }
            None => self.namer.anonymous(alias.hint())?,
        };
        tracing::trace!("alias {:?} named '{}'", alias.id(), name);
        self.table.aliases.insert(alias.id(), name);
        Ok(())
    }

    fn select(&mut self, select: &Select) -> CompileResult<()> {
        if select.get_label_style() != LabelStyle::TablenamePlusCol {
            return Ok(());
        }
        for (entry, name) in select.output_exprs().iter().zip(select.entry_names()) {
            if matches!(entry, Expr::Column(_)) && !self.table.entries.contains_key(&name) {
                let label = self.namer.generated(&name)?;
                tracing::trace!("select entry '{}' labeled '{}'", name, label);
                self.table.entries.insert(name, label);
            }
        }
        Ok(())
    }

    fn cte_ref(&mut self, cte: &Cte) -> CompileResult<()> {
        self.namer.check_explicit(cte.name())
    }
}
