//! # sqlcraft
//!
//! A database-independent SQL statement compiler. Build a statement as an
//! immutable tree, pick a dialect profile, and get back SQL text, the
//! ordered parameter list and a map of the result columns.
//!
//! ## Quick Example
//!
//! ```rust
//! use sqlcraft::prelude::*;
//!
//! let md = MetaData::builder()
//!     .table(
//!         TableDef::new("users")
//!             .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
//!             .column(ColumnDef::new("email", LogicalType::string(120))),
//!     )
//!     .build()?;
//! let users = md.table("users")?;
//!
//! let stmt = select([users.c("email")?]).filter(users.c("id")?.eq(bindparam("id")));
//! let compiled = Compiler::default().compile(&stmt.into(), &DialectProfile::postgresql())?;
//! assert_eq!(compiled.sql(), "SELECT users.email FROM users WHERE users.id = $1");
//! # Ok::<(), sqlcraft::CompileError>(())
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`ast`] | statement tree and builders |
//! | [`dialect`] | target database profiles |
//! | [`types`] | type handlers and their registry |
//! | [`compiler`] | tree + profile to SQL |
//! | [`catalog`] | startup bundle of registry and profiles |
//! | [`cache`] | compiled statement cache |

pub mod ast;
pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod dialect;
pub mod error;
pub mod types;

pub use error::{CompileError, CompileResult, ErrorKind};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::cache::{CacheConfig, StatementCache};
    pub use crate::catalog::Catalog;
    pub use crate::compiler::{CompileOptions, CompiledStatement, Compiler, Parameter, ResultColumn};
    pub use crate::dialect::{DialectProfile, Features, LimitStyle, ParamStyle, RecursiveCte};
    pub use crate::error::*;
    pub use crate::types::{TypeRegistry, WireValue};
}
