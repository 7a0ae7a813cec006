use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::numeric::NumericHandler;
use super::scalar::{
    BinaryHandler, BooleanHandler, IntegerHandler, NullHandler, StringHandler, UuidHandler,
};
use super::structured::{ArrayHandler, EnumHandler, JsonHandler};
use super::temporal::{DateHandler, DateTimeHandler, TimeHandler};
use super::{HandlerRef, TypeHandler};
use crate::ast::{LogicalType, TypeKey};
use crate::dialect::DialectProfile;
use crate::error::{CompileError, CompileResult};

/// Handlers by type key, with optional per-dialect overrides. Immutable once
/// built.
pub struct TypeRegistry {
    handlers: HashMap<TypeKey, Arc<dyn TypeHandler>>,
    overrides: HashMap<(String, TypeKey), Arc<dyn TypeHandler>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Registry holding only the built-in handlers.
    pub fn with_builtins() -> Arc<Self> {
        TypeRegistryBuilder::with_builtins().build()
    }

    /// The handler serving `key` on the named dialect.
    pub fn handler(&self, key: &TypeKey, dialect: &str) -> Option<Arc<dyn TypeHandler>> {
        self.overrides
            .get(&(dialect.to_string(), key.clone()))
            .or_else(|| self.handlers.get(key))
            .cloned()
    }

    /// Bind `ty` to its handler for `dialect`.
    pub fn resolve(
        self: &Arc<Self>,
        ty: &LogicalType,
        dialect: &DialectProfile,
    ) -> CompileResult<HandlerRef> {
        let key = ty.key();
        let handler = self.handler(&key, &dialect.name).ok_or_else(|| {
            CompileError::compile(format!("No type handler registered for type '{}'", key))
        })?;
        Ok(HandlerRef::new(handler, ty.clone(), Arc::clone(self)))
    }

    /// Registered keys in a stable order.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.keys().iter().map(TypeKey::to_string).collect();
        f.debug_struct("TypeRegistry")
            .field("handlers", &keys)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

/// Collects handlers before the registry is frozen.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    handlers: HashMap<TypeKey, Arc<dyn TypeHandler>>,
    overrides: HashMap<(String, TypeKey), Arc<dyn TypeHandler>>,
}

impl TypeRegistryBuilder {
    pub fn with_builtins() -> Self {
        Self::default()
            .register(NullHandler)
            .register(IntegerHandler)
            .register(NumericHandler)
            .register(StringHandler)
            .register(BooleanHandler)
            .register(DateTimeHandler)
            .register(DateHandler)
            .register(TimeHandler)
            .register(BinaryHandler)
            .register(JsonHandler)
            .register(UuidHandler)
            .register(EnumHandler)
            .register(ArrayHandler)
    }

    /// Register a handler for its key, replacing any earlier one.
    pub fn register(mut self, handler: impl TypeHandler + 'static) -> Self {
        let handler: Arc<dyn TypeHandler> = Arc::new(handler);
        if let Some(old) = self.handlers.insert(handler.key(), Arc::clone(&handler)) {
            tracing::debug!("type handler {} replaced by {}", old.name(), handler.name());
        }
        self
    }

    /// Register a handler used only when compiling for `dialect`.
    pub fn register_for_dialect(
        mut self,
        dialect: &str,
        handler: impl TypeHandler + 'static,
    ) -> Self {
        let handler: Arc<dyn TypeHandler> = Arc::new(handler);
        self.overrides
            .insert((dialect.to_string(), handler.key()), handler);
        self
    }

    pub fn build(self) -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry {
            handlers: self.handlers,
            overrides: self.overrides,
        })
    }
}
