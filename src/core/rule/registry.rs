#![allow(clippy::result_large_err)] // Registry lookups return AppError directly for structured diagnostics without boxing.

use crate::core::error::AppError;
use crate::core::rule::{Rule, RuleDeclaration};
use crate::core::types::ErrorCategory;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Builds a rule from its declaration attributes.
pub type RuleFactory = fn(Value) -> Result<Box<dyn Rule>, AppError>;

/// Generic factory: deserialize the attributes into `T` and check its shape.
pub fn decode_rule<T>(attributes: Value) -> Result<Box<dyn Rule>, AppError>
where
    T: Rule + DeserializeOwned,
{
    let rule: T = serde_json::from_value(attributes).map_err(|err| {
        AppError::new(
            ErrorCategory::Configuration,
            format!("invalid rule attributes: {}", err),
        )
        .with_code("RG-DECL-003")
    })?;
    rule.check_shape()?;
    Ok(Box::new(rule))
}

/// Builder used to register rule kinds per backend before plans are decoded.
pub struct RuleRegistryBuilder {
    factories: BTreeMap<String, HashMap<String, RuleFactory>>,
}

impl Default for RuleRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistryBuilder {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, backend: &str, kind: &str, factory: RuleFactory) -> &mut Self {
        let kinds = self.factories.entry(backend.to_string()).or_default();
        if kinds.contains_key(kind) {
            panic!("duplicate rule registered: {}/{}", backend, kind);
        }
        kinds.insert(kind.to_string(), factory);
        self
    }

    pub fn build(self) -> RuleRegistry {
        RuleRegistry {
            inner: Arc::new(self.factories),
        }
    }
}

/// Immutable (backend, kind) → factory table.
#[derive(Clone)]
pub struct RuleRegistry {
    inner: Arc<BTreeMap<String, HashMap<String, RuleFactory>>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistryBuilder::new().build()
    }

    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::new()
    }

    /// Registry with every backend bundled in this crate.
    pub fn with_builtins() -> Self {
        let mut builder = RuleRegistryBuilder::new();
        crate::core::backends::register_builtins(&mut builder);
        builder.build()
    }

    pub fn backends(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    pub fn has_backend(&self, backend: &str) -> bool {
        self.inner.contains_key(backend)
    }

    /// Kind names registered for `backend`, sorted.
    pub fn kinds(&self, backend: &str) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .inner
            .get(backend)
            .map(|kinds| kinds.keys().map(String::as_str).collect())
            .unwrap_or_default();
        kinds.sort_unstable();
        kinds
    }

    pub fn get(&self, backend: &str, kind: &str) -> Result<RuleFactory, AppError> {
        let kinds = self.inner.get(backend).ok_or_else(|| {
            AppError::new(
                ErrorCategory::Configuration,
                format!("Unknown backend '{}'.", backend),
            )
            .with_code("RG-DECL-001")
            .with_suggestion(format!("known backends: {}", self.backends().join(", ")))
        })?;
        kinds.get(kind).copied().ok_or_else(|| {
            AppError::new(
                ErrorCategory::Configuration,
                format!("Backend '{}' has no rule kind '{}'.", backend, kind),
            )
            .with_code("RG-DECL-002")
            .with_suggestion(format!("known kinds: {}", self.kinds(backend).join(", ")))
        })
    }

    /// Instantiate a rule from its declaration.
    ///
    /// Attributes the kind does not know are rejected: the decoded rule is
    /// re-encoded and every declared key must survive.
    pub fn instantiate(
        &self,
        backend: &str,
        declaration: &RuleDeclaration,
    ) -> Result<Box<dyn Rule>, AppError> {
        let factory = self.get(backend, &declaration.kind)?;
        let rule = factory(Value::Object(declaration.attributes.clone()))?;
        let known = rule.attributes()?;
        let mut unknown: Vec<&str> = declaration
            .attributes
            .keys()
            .filter(|key| !known.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(AppError::new(
                ErrorCategory::Configuration,
                format!(
                    "{} does not accept attribute(s): {}",
                    declaration.kind,
                    unknown.join(", ")
                ),
            )
            .with_code("RG-DECL-004"));
        }
        Ok(rule)
    }
}
