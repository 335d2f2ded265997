//! The schema registry
//!
//! A `SchemaRegistry` maps type names to structural schemas or enum mappings. It is
//! assembled once at startup through a `RegistryBuilder` (usually from `#[derive(Model)]`
//! and `#[derive(ModelEnum)]` types), validated so every reference resolves, and then only
//! read. The process-wide instance lives behind a `OnceLock`: it can be installed exactly
//! once, and reading it before installation freezes the built-in registry in place.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use error_stack::Report;
use indexmap::IndexMap;
use tracing::debug;

use super::{EnumEntry, FieldSpec, SchemaEntry, TypeDescriptor, TypeName};
use crate::error::{Error, Result};
use crate::model::{Model, ModelEnum, builtin};

/// Inheritance chains deeper than this are treated as cycles
const MAX_INHERITANCE_DEPTH: usize = 32;

static GLOBAL_REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

/// What a type name resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    /// A record schema
    Schema(SchemaEntry),
    /// An enumeration
    Enum(EnumEntry),
}

impl RegistryEntry {
    /// The registry key of this entry
    pub const fn type_name(&self) -> &TypeName {
        match self {
            Self::Schema(schema) => &schema.type_name,
            Self::Enum(entry) => &entry.type_name,
        }
    }
}

/// Catalog of every model shape the SDK can encode or decode
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries:        HashMap<TypeName, RegistryEntry>,
    discriminators: HashMap<String, TypeName>,
}

impl SchemaRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a registry pre-populated with the SDK's built-in models
    pub fn builder() -> Result<RegistryBuilder> {
        RegistryBuilder::new().with_builtin_models()
    }

    /// A validated registry holding only the built-in models
    pub fn with_builtin_models() -> Result<Self> {
        Self::builder()?.build()
    }

    /// Install the process-wide registry
    ///
    /// Fails if a registry is already installed, or if `global()` was read first.
    pub fn install(registry: Self) -> Result<Arc<Self>> {
        let registry = Arc::new(registry);
        GLOBAL_REGISTRY.set(Arc::clone(&registry)).map_err(|_| {
            Report::new(Error::Configuration(
                "The global schema registry is already installed".to_string(),
            ))
        })?;
        debug!(types = registry.len(), "Installed global schema registry");
        Ok(registry)
    }

    /// The process-wide registry
    ///
    /// Falls back to the built-in models when nothing was installed.
    pub fn global() -> Result<Arc<Self>> {
        if let Some(registry) = GLOBAL_REGISTRY.get() {
            return Ok(Arc::clone(registry));
        }
        let builtin = Arc::new(Self::with_builtin_models()?);
        Ok(Arc::clone(GLOBAL_REGISTRY.get_or_init(|| builtin)))
    }

    /// Register an entry
    ///
    /// Registering the same entry twice is a no-op; a different entry under a name that
    /// is already taken is a configuration error.
    pub fn register(&mut self, entry: RegistryEntry) -> Result<()> {
        if let RegistryEntry::Schema(schema) = &entry {
            schema.check_wire_keys()?;
        }

        let type_name = entry.type_name().clone();
        if let Some(existing) = self.entries.get(&type_name) {
            if *existing == entry {
                return Ok(());
            }
            return Err(Report::new(Error::Configuration(format!(
                "Type `{type_name}` is already registered with a different shape"
            ))));
        }

        if let RegistryEntry::Schema(schema) = &entry {
            let discriminator = schema.discriminator_value().to_string();
            if let Some(owner) = self.discriminators.get(&discriminator) {
                return Err(Report::new(Error::Configuration(format!(
                    "Discriminator `{discriminator}` of `{type_name}` is already used by `{owner}`"
                ))));
            }
            self.discriminators.insert(discriminator, type_name.clone());
        }

        self.entries.insert(type_name, entry);
        Ok(())
    }

    /// Look a type name up
    pub fn lookup(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(&TypeName::from(type_name))
    }

    /// The schema registered under `type_name`
    pub fn schema(&self, type_name: &str) -> Result<&SchemaEntry> {
        match self.lookup(type_name) {
            Some(RegistryEntry::Schema(schema)) => Ok(schema),
            Some(RegistryEntry::Enum(_)) => Err(Report::new(Error::Configuration(format!(
                "Type `{type_name}` is an enum, not a record schema"
            )))),
            None => Err(Report::new(Error::type_not_registered(type_name))),
        }
    }

    /// The enum registered under `type_name`, if any
    pub fn enum_entry(&self, type_name: &str) -> Option<&EnumEntry> {
        match self.lookup(type_name) {
            Some(RegistryEntry::Enum(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&TypeName> {
        let mut names: Vec<&TypeName> = self.entries.keys().collect();
        names.sort();
        names
    }

    /// Fields of `type_name` including inherited ones, parents first
    ///
    /// A child field with the same identifier as a parent field replaces it in place.
    pub fn resolved_fields(&self, type_name: &str) -> Result<IndexMap<&str, &FieldSpec>> {
        let mut fields = IndexMap::new();
        self.collect_fields(type_name, &mut fields, 0)?;
        Ok(fields)
    }

    fn collect_fields<'a>(
        &'a self,
        type_name: &str,
        fields: &mut IndexMap<&'a str, &'a FieldSpec>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_INHERITANCE_DEPTH {
            return Err(Report::new(Error::Configuration(format!(
                "Inheritance chain of `{type_name}` is cyclic or deeper than {MAX_INHERITANCE_DEPTH}"
            ))));
        }
        let schema = self.schema(type_name)?;
        for parent in &schema.parents {
            self.collect_fields(parent.as_str(), fields, depth + 1)?;
        }
        for (name, spec) in &schema.fields {
            fields.insert(name.as_str(), spec);
        }
        Ok(())
    }

    /// Whether `type_name` is `ancestor` or inherits from it
    pub fn is_descendant(&self, type_name: &str, ancestor: &str) -> bool {
        self.is_descendant_at(type_name, ancestor, 0)
    }

    fn is_descendant_at(&self, type_name: &str, ancestor: &str, depth: usize) -> bool {
        if type_name == ancestor {
            return true;
        }
        if depth > MAX_INHERITANCE_DEPTH {
            return false;
        }
        match self.lookup(type_name) {
            Some(RegistryEntry::Schema(schema)) => schema
                .parents
                .iter()
                .any(|parent| self.is_descendant_at(parent.as_str(), ancestor, depth + 1)),
            _ => false,
        }
    }

    /// Whether `type_name` is, or inherits from, a polymorphic base
    pub fn is_polymorphic(&self, type_name: &str) -> bool {
        matches!(self.lookup(type_name), Some(RegistryEntry::Schema(schema)) if schema.polymorphic)
    }

    /// The concrete schema selected by a discriminator value for a requested base type
    pub fn resolve_discriminator(&self, base: &str, discriminator: &str) -> Result<&SchemaEntry> {
        let concrete = self.discriminators.get(discriminator).ok_or_else(|| {
            Report::new(Error::unregistered(
                "discriminator",
                format!("`{discriminator}` (requested as `{base}`)"),
            ))
        })?;

        if !self.is_descendant(concrete.as_str(), base) {
            return Err(Report::new(Error::Configuration(format!(
                "Discriminator `{discriminator}` names `{concrete}`, which is not a subtype of `{base}`"
            ))));
        }

        self.schema(concrete.as_str())
    }

    /// Check that every parent and every field reference resolves
    pub fn validate(&self) -> Result<()> {
        let mut unresolved: HashSet<String> = HashSet::new();

        for entry in self.entries.values() {
            let RegistryEntry::Schema(schema) = entry else {
                continue;
            };

            for parent in &schema.parents {
                if !matches!(self.lookup(parent.as_str()), Some(RegistryEntry::Schema(_))) {
                    unresolved.insert(format!("{} (parent of {})", parent, schema.type_name));
                }
            }

            for (field, spec) in &schema.fields {
                for reference in spec.field_type.referenced_types() {
                    if self.lookup(reference.as_str()).is_none() {
                        unresolved.insert(format!(
                            "{reference} (field `{field}` of {})",
                            schema.type_name
                        ));
                    }
                }
                if let TypeDescriptor::Polymorphic(base) = &spec.field_type
                    && matches!(self.lookup(base.as_str()), Some(RegistryEntry::Enum(_)))
                {
                    unresolved.insert(format!("{base} (enum used as polymorphic base)"));
                }
            }
        }

        if !unresolved.is_empty() {
            let mut unresolved: Vec<String> = unresolved.into_iter().collect();
            unresolved.sort();
            return Err(Report::new(Error::Configuration(format!(
                "Unresolved type references: {}",
                unresolved.join(", ")
            ))));
        }

        // Every parent resolves, so the only remaining failure is a cycle
        for entry in self.entries.values() {
            if let RegistryEntry::Schema(schema) = entry {
                self.resolved_fields(schema.type_name.as_str())?;
            }
        }
        Ok(())
    }
}

/// Startup-time assembly of a `SchemaRegistry`
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: SchemaRegistry,
}

impl RegistryBuilder {
    /// An empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the SDK's built-in models
    pub fn with_builtin_models(self) -> Result<Self> {
        builtin::register_builtin_models(self)
    }

    /// Register a derived model
    pub fn register_model<M: Model>(self) -> Result<Self> {
        self.register_schema(M::schema())
    }

    /// Register a derived enum
    pub fn register_enum<E: ModelEnum>(self) -> Result<Self> {
        self.register_enum_entry(E::entry())
    }

    /// Register a hand-written schema
    pub fn register_schema(mut self, schema: SchemaEntry) -> Result<Self> {
        self.registry.register(RegistryEntry::Schema(schema))?;
        Ok(self)
    }

    /// Register a hand-written enum mapping
    pub fn register_enum_entry(mut self, entry: EnumEntry) -> Result<Self> {
        self.registry.register(RegistryEntry::Enum(entry))?;
        Ok(self)
    }

    /// Validate and finish
    pub fn build(self) -> Result<SchemaRegistry> {
        self.registry.validate()?;
        Ok(self.registry)
    }
}
