//! Statement AST.
//!
//! Every node is immutable once built. Builders are generative: each call
//! consumes `self` and returns a modified copy, so a shared sub-tree is never
//! changed underneath another statement that holds it.

pub mod builders;
pub mod column;
pub mod compound;
pub mod cte;
pub mod ddl;
pub mod dml;
pub mod expr;
pub mod fingerprint;
pub mod from;
pub mod ids;
pub mod operators;
pub mod select;
pub mod selectable;
pub mod statement;
pub mod table;
pub mod text;
pub mod types;
pub mod values;

pub use builders::*;
pub use column::{ColumnIdentity, ColumnRef, Proxy, SourceRef};
pub use compound::{CompoundSelect, SetOp};
pub use cte::Cte;
pub use ddl::{CreateIndex, CreateTable, DropIndex, DropTable};
pub use dml::{Delete, Insert, InsertSource, Update};
pub use expr::{
    BindParam, CaseExpr, Expr, ExprExt, FunctionCall, IntoOperand, Label, OrderBy, OrderDirection,
    NullsOrder,
};
pub use fingerprint::Fingerprinter;
pub use from::{Alias, AliasTarget, FromItem, Join, JoinKind};
pub use ids::NodeId;
pub use operators::{BinaryOp, UnaryOp};
pub use select::{ForUpdate, LabelStyle, Select};
pub use selectable::{Correspondence, Selectable, best_match};
pub use statement::{Queryable, Statement};
pub use table::{
    CheckConstraint, ColumnDef, ForeignKey, ForeignKeyDef, MetaData, MetaDataBuilder, Table,
    TableDef, UniqueConstraint,
};
pub use text::{TextClause, TextPart, TextualSelect};
pub use types::{LogicalType, TypeKey};
pub use values::Value;
