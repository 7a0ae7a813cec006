//! Result column map: what each position of a returned row is.

use std::sync::Arc;

use super::namer::IdentifierNamer;
use super::names::NameTable;
use crate::ast::{ColumnIdentity, ColumnRef, Expr, LogicalType, Proxy, Selectable, Statement};
use crate::dialect::DialectProfile;
use crate::error::CompileResult;
use crate::types::{HandlerRef, TypeRegistry};

/// One column of the rows a compiled statement returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub position: usize,
    /// Name the column carries in the SQL text.
    pub name: String,
    /// The column it was selected from, when it comes straight from one.
    pub origin: Option<ColumnIdentity>,
    /// Full lineage, used to find the position of a column later on.
    pub proxies: Vec<Proxy>,
    pub handler: HandlerRef,
}

impl ResultColumn {
    pub fn ty(&self) -> &LogicalType {
        self.handler.ty()
    }
}

fn origin(proxies: &[Proxy], distance: u32) -> Option<ColumnIdentity> {
    proxies
        .iter()
        .find(|p| p.distance == distance)
        .map(|p| p.identity.clone())
}

pub(crate) fn build(
    stmt: &Statement,
    names: &NameTable,
    namer: &mut IdentifierNamer,
    registry: &Arc<TypeRegistry>,
    dialect: &DialectProfile,
) -> CompileResult<Vec<ResultColumn>> {
    let mut out = Vec::new();
    match stmt {
        Statement::Select(s) => selected(&s.columns(), names, namer, registry, dialect, &mut out)?,
        Statement::Compound(c) => {
            selected(&c.columns(), names, namer, registry, dialect, &mut out)?
        }
        Statement::Insert(ins) => {
            returned(ins.returning_exprs(), names, registry, dialect, &mut out)?
        }
        Statement::Update(upd) => {
            returned(upd.returning_exprs(), names, registry, dialect, &mut out)?
        }
        Statement::Delete(del) => {
            returned(del.returning_exprs(), names, registry, dialect, &mut out)?
        }
        Statement::Text(ts) => {
            for (position, (name, ty)) in ts.result_columns().iter().enumerate() {
                out.push(ResultColumn {
                    position,
                    name: name.clone(),
                    origin: None,
                    proxies: Vec::new(),
                    handler: registry.resolve(ty, dialect)?,
                });
            }
        }
        Statement::CreateTable(_)
        | Statement::DropTable(_)
        | Statement::CreateIndex(_)
        | Statement::DropIndex(_) => {}
    }
    Ok(out)
}

fn selected(
    columns: &[ColumnRef],
    names: &NameTable,
    namer: &mut IdentifierNamer,
    registry: &Arc<TypeRegistry>,
    dialect: &DialectProfile,
    out: &mut Vec<ResultColumn>,
) -> CompileResult<()> {
    for (position, c) in columns.iter().enumerate() {
        let name = match c.label_id().and_then(|id| names.label(id)) {
            Some(label) => label.to_string(),
            None => namer.generated(c.name())?,
        };
        out.push(ResultColumn {
            position,
            name,
            origin: origin(c.proxies(), 1),
            proxies: c.proxies().to_vec(),
            handler: registry.resolve(c.ty(), dialect)?,
        });
    }
    Ok(())
}

fn returned(
    exprs: &[Expr],
    names: &NameTable,
    registry: &Arc<TypeRegistry>,
    dialect: &DialectProfile,
    out: &mut Vec<ResultColumn>,
) -> CompileResult<()> {
    for (position, e) in exprs.iter().enumerate() {
        let (name, proxies) = match e {
            Expr::Column(c) => (c.name().to_string(), c.proxies().to_vec()),
            Expr::Label(l) => {
                let name = names.label(l.id()).unwrap_or(l.key()).to_string();
                (name, Vec::new())
            }
            other => (other.label_hint(), Vec::new()),
        };
        out.push(ResultColumn {
            position,
            name,
            origin: origin(&proxies, 0),
            proxies,
            handler: registry.resolve(&e.type_of(), dialect)?,
        });
    }
    Ok(())
}
