//! Stage registry: maps a runtime type to the stage that persists it.
//!
//! Entries are tried in registration order and the first match wins. The
//! process-wide registry is built once inside a `OnceLock`; every reader observes the
//! fully initialized value.

use std::any::TypeId;
use std::fmt;
use std::sync::OnceLock;

use sqlstage_core::{Error, Persist, Result, TypeRef};

use crate::stage::{CollectionStage, EmbeddedStage, ScalarStage, Stage};

/// Key of a registry entry.
#[derive(Clone, Copy)]
pub enum StageMatcher {
    /// Exactly one Rust type (nullability ignored).
    Type(TypeId),
    /// A category of types.
    Predicate {
        /// Name used in logs.
        name: &'static str,
        /// Membership test.
        test: fn(&TypeRef) -> bool,
    },
}

impl StageMatcher {
    /// Matcher for exactly `T`.
    pub fn of<T: Persist>() -> Self {
        StageMatcher::Type(T::type_ref().id())
    }

    /// Matcher for a category of types.
    pub fn predicate(name: &'static str, test: fn(&TypeRef) -> bool) -> Self {
        StageMatcher::Predicate { name, test }
    }

    /// Whether `ty` belongs to this entry.
    pub fn matches(&self, ty: &TypeRef) -> bool {
        match self {
            StageMatcher::Type(id) => *id == ty.id(),
            StageMatcher::Predicate { test, .. } => test(ty),
        }
    }
}

impl fmt::Debug for StageMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageMatcher::Type(id) => f.debug_tuple("Type").field(id).finish(),
            StageMatcher::Predicate { name, .. } => f.debug_tuple("Predicate").field(name).finish(),
        }
    }
}

/// Multi-valued container types.
pub fn is_collection(ty: &TypeRef) -> bool {
    ty.is_sequence()
}

/// Mapped structs flattened into their parent's table.
pub fn is_embedded(ty: &TypeRef) -> bool {
    ty.is_record()
}

static GLOBAL: OnceLock<StageRegistry> = OnceLock::new();

/// Ordered `(matcher, stage)` entries.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    entries: Vec<(StageMatcher, Stage)>,
}

impl StageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry: scalar primitives, then collections, then embedded records.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let scalar = Stage::Scalar(ScalarStage);
        registry
            .register_type::<bool>(scalar)
            .register_type::<i8>(scalar)
            .register_type::<i16>(scalar)
            .register_type::<i32>(scalar)
            .register_type::<i64>(scalar)
            .register_type::<u8>(scalar)
            .register_type::<u16>(scalar)
            .register_type::<u32>(scalar)
            .register_type::<f32>(scalar)
            .register_type::<f64>(scalar)
            .register_type::<String>(scalar)
            .register(
                StageMatcher::predicate("collection", is_collection),
                Stage::Collection(CollectionStage),
            )
            .register(
                StageMatcher::predicate("embedded", is_embedded),
                Stage::Embedded(EmbeddedStage),
            );
        registry
    }

    /// Append an entry. Earlier entries take precedence.
    pub fn register(&mut self, matcher: StageMatcher, stage: Stage) -> &mut Self {
        tracing::trace!(matcher = ?matcher, stage = stage.kind_name(), "Registering stage");
        self.entries.push((matcher, stage));
        self
    }

    /// Append an exact-type entry for `T`.
    pub fn register_type<T: Persist>(&mut self, stage: Stage) -> &mut Self {
        self.register(StageMatcher::of::<T>(), stage)
    }

    /// First stage whose matcher accepts `ty`.
    pub fn lookup(&self, ty: &TypeRef) -> Option<&Stage> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(ty))
            .map(|(_, stage)| stage)
    }

    /// Like [`lookup`](Self::lookup), failing with `StageNotFound`.
    pub fn resolve(&self, ty: &TypeRef) -> Result<&Stage> {
        self.lookup(ty).ok_or_else(|| {
            tracing::debug!(type_name = ty.name(), "No stage registered");
            Error::stage_not_found(ty.name())
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The process-wide registry, built from [`with_defaults`](Self::with_defaults)
    /// unless [`install`](Self::install) ran first.
    pub fn global() -> &'static StageRegistry {
        GLOBAL.get_or_init(|| {
            tracing::debug!("Initializing default stage registry");
            Self::with_defaults()
        })
    }

    /// Install a custom process-wide registry. Must run before the first call to
    /// [`global`](Self::global).
    pub fn install(registry: StageRegistry) -> Result<()> {
        GLOBAL.set(registry).map_err(|_| {
            Error::Config("stage registry is already initialized".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, crate::Mapped)]
    struct Address {
        city: String,
    }

    #[test]
    fn test_default_resolution() {
        let registry = StageRegistry::with_defaults();
        assert!(registry.resolve(&i64::type_ref()).unwrap().is_scalar());
        assert!(registry.resolve(&Option::<String>::type_ref()).unwrap().is_scalar());
        assert!(matches!(
            registry.resolve(&Vec::<i32>::type_ref()).unwrap(),
            Stage::Collection(_)
        ));
        assert!(matches!(
            registry.resolve(&Address::type_ref()).unwrap(),
            Stage::Embedded(_)
        ));
    }

    #[test]
    fn test_unregistered_type_is_not_found() {
        let registry = StageRegistry::new();
        assert!(registry.is_empty());
        match registry.resolve(&i32::type_ref()) {
            Err(Error::StageNotFound { type_name }) => assert_eq!(type_name, "i32"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = StageRegistry::new();
        registry
            .register(
                StageMatcher::predicate("any", |_| true),
                Stage::Embedded(EmbeddedStage),
            )
            .register(
                StageMatcher::predicate("any", |_| true),
                Stage::Scalar(ScalarStage),
            );
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.lookup(&i32::type_ref()),
            Some(&Stage::Embedded(EmbeddedStage))
        );
    }

    #[test]
    fn test_install_after_init_fails() {
        let _ = StageRegistry::global();
        assert!(matches!(
            StageRegistry::install(StageRegistry::new()),
            Err(Error::Config(_))
        ));
    }
}
