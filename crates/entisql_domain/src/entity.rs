//! Entity values.

use crate::attribute::{Attribute, EntityType, ForeignKey};
use crate::definition::EntityDefinition;
use crate::error::{DomainError, DomainResult};
use crate::key::Key;
use entisql_db::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One row of an entity type.
///
/// Holds the current value of each attribute that has been set, the
/// original value of each attribute modified since the entity was built or
/// last saved, and the entities referenced through foreign keys.
///
/// Attributes that were never set are absent, not null: an entity selected
/// without its blob column does not claim the blob is null.
///
/// Equality and hashing go by primary key.
#[derive(Clone)]
pub struct Entity {
    definition: Arc<EntityDefinition>,
    values: HashMap<Attribute, Value>,
    originals: HashMap<Attribute, Value>,
    references: HashMap<Attribute, Option<Entity>>,
}

impl Entity {
    /// Creates an empty entity.
    #[must_use]
    pub fn new(definition: Arc<EntityDefinition>) -> Self {
        Self {
            definition,
            values: HashMap::new(),
            originals: HashMap::new(),
            references: HashMap::new(),
        }
    }

    /// Starts building an entity; values given to the builder are initial
    /// values, not modifications.
    #[must_use]
    pub fn builder(definition: Arc<EntityDefinition>) -> EntityBuilder {
        EntityBuilder {
            entity: Self::new(definition),
            error: None,
        }
    }

    /// Creates a placeholder holding only the primary key values of `key`.
    #[must_use]
    pub fn key_only(definition: Arc<EntityDefinition>, key: &Key) -> Self {
        let mut entity = Self::new(definition);
        for (attribute, value) in key.components() {
            entity.values.insert(attribute.clone(), value.clone());
        }
        entity
    }

    /// Returns the definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<EntityDefinition> {
        &self.definition
    }

    /// Returns the entity type.
    #[must_use]
    pub fn entity_type(&self) -> &EntityType {
        self.definition.entity_type()
    }

    /// Returns the value of `attribute`, if it has been set.
    #[must_use]
    pub fn get(&self, attribute: &Attribute) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Returns the value of `attribute`, null when unset.
    ///
    /// Derived attributes are computed on each call.
    #[must_use]
    pub fn value(&self, attribute: &Attribute) -> Value {
        if let Some(derived) = self.definition.derived(attribute) {
            return derived.compute(self);
        }
        self.values.get(attribute).cloned().unwrap_or_default()
    }

    /// Returns true if `attribute` has been set.
    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.values.contains_key(attribute)
    }

    /// Returns the set attributes and their values.
    pub fn values(&self) -> impl Iterator<Item = (&Attribute, &Value)> {
        self.values.iter()
    }

    /// Sets the value of a column attribute, recording the original value.
    ///
    /// Setting a value back to its original clears the modification.
    /// Changing a foreign key column drops the cached referenced entity.
    /// Returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAttribute`] if `attribute` is not a
    /// column of this entity type, or [`DomainError::InvalidValue`] if the
    /// value does not fit the column type.
    pub fn put(&mut self, attribute: &Attribute, value: impl Into<Value>) -> DomainResult<Value> {
        let value = self.validate(attribute, value.into())?;
        let previous = self
            .values
            .insert(attribute.clone(), value.clone())
            .unwrap_or_default();
        match self.originals.get(attribute) {
            Some(original) if *original == value => {
                self.originals.remove(attribute);
            }
            Some(_) => {}
            None if previous != value => {
                self.originals.insert(attribute.clone(), previous.clone());
            }
            None => {}
        }
        if previous != value {
            let stale: Vec<Attribute> = self
                .definition
                .foreign_keys_with_column(attribute)
                .map(|fk| fk.attribute().clone())
                .collect();
            for fk in stale {
                self.references.remove(&fk);
            }
        }
        Ok(previous)
    }

    /// Sets a value and returns the entity, for chained construction.
    ///
    /// # Errors
    ///
    /// See [`Entity::put`].
    pub fn with(mut self, attribute: &Attribute, value: impl Into<Value>) -> DomainResult<Self> {
        self.put(attribute, value)?;
        Ok(self)
    }

    /// Sets the entity referenced through `foreign_key`, copying its key
    /// values into the referencing columns.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAttribute`] if the foreign key does not
    /// belong to this entity type, or [`DomainError::InvalidValue`] if
    /// `referenced` is of the wrong type.
    pub fn set_reference(&mut self, foreign_key: &ForeignKey, referenced: Option<Entity>) -> DomainResult<()> {
        self.check_reference(foreign_key, referenced.as_ref())?;
        for reference in foreign_key.references() {
            let value = referenced
                .as_ref()
                .map(|entity| entity.value(&reference.referenced))
                .unwrap_or_default();
            self.put(&reference.column, value)?;
        }
        self.references
            .insert(foreign_key.attribute().clone(), referenced);
        Ok(())
    }

    /// Caches the entity referenced through `foreign_key` without touching
    /// the referencing columns.
    ///
    /// Used when loading references for values already in place.
    ///
    /// # Errors
    ///
    /// Same as [`Entity::set_reference`].
    pub fn attach_reference(&mut self, foreign_key: &ForeignKey, referenced: Option<Entity>) -> DomainResult<()> {
        self.check_reference(foreign_key, referenced.as_ref())?;
        self.references
            .insert(foreign_key.attribute().clone(), referenced);
        Ok(())
    }

    /// Returns the entity referenced through `foreign_key`, if loaded and
    /// not null.
    #[must_use]
    pub fn referenced(&self, foreign_key: &ForeignKey) -> Option<&Entity> {
        self.references
            .get(foreign_key.attribute())
            .and_then(Option::as_ref)
    }

    /// Returns true if the reference through `foreign_key` has been loaded
    /// (possibly as null).
    #[must_use]
    pub fn is_loaded(&self, foreign_key: &ForeignKey) -> bool {
        self.references.contains_key(foreign_key.attribute())
    }

    /// Returns the key referenced through `foreign_key`, built from the
    /// referencing column values, or `None` if any of them is null.
    #[must_use]
    pub fn referenced_key(&self, foreign_key: &ForeignKey) -> Option<Key> {
        let mut components = Vec::with_capacity(foreign_key.references().len());
        for reference in foreign_key.references() {
            let value = self.value(&reference.column);
            if value.is_null() {
                return None;
            }
            components.push((reference.referenced.clone(), value));
        }
        Some(Key::new(foreign_key.referenced_type().clone(), components))
    }

    /// Returns the primary key built from current values.
    #[must_use]
    pub fn key(&self) -> Key {
        self.build_key(|attribute| self.value(attribute))
    }

    /// Returns the primary key built from original values.
    ///
    /// Differs from [`Entity::key`] when a key column has been modified.
    #[must_use]
    pub fn original_key(&self) -> Key {
        self.build_key(|attribute| self.original(attribute))
    }

    fn build_key(&self, value: impl Fn(&Attribute) -> Value) -> Key {
        let components = self
            .definition
            .primary_key_columns()
            .into_iter()
            .map(|column| (column.attribute().clone(), value(column.attribute())))
            .collect();
        Key::new(self.entity_type().clone(), components)
    }

    /// Returns the original value of `attribute`: the value before the first
    /// modification, or the current value if unmodified.
    #[must_use]
    pub fn original(&self, attribute: &Attribute) -> Value {
        match self.originals.get(attribute) {
            Some(original) => original.clone(),
            None => self.value(attribute),
        }
    }

    /// Returns true if any attribute has been modified.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.originals.is_empty()
    }

    /// Returns true if `attribute` has been modified.
    #[must_use]
    pub fn is_modified_attribute(&self, attribute: &Attribute) -> bool {
        self.originals.contains_key(attribute)
    }

    /// Returns the modified attributes.
    pub fn modified_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.originals.keys()
    }

    /// Accepts the current values as originals.
    pub fn save(&mut self) {
        self.originals.clear();
    }

    /// Restores all original values.
    pub fn revert(&mut self) {
        for (attribute, original) in self.originals.drain() {
            if original.is_null() {
                self.values.remove(&attribute);
            } else {
                self.values.insert(attribute, original);
            }
        }
        self.references.clear();
    }

    fn validate(&self, attribute: &Attribute, value: Value) -> DomainResult<Value> {
        let column = self.definition.column(attribute)?;
        if column.value_type().accepts(&value) {
            Ok(value)
        } else {
            Err(DomainError::invalid_value(
                attribute,
                format!("expected {}, got {}", column.value_type(), value.type_name()),
            ))
        }
    }

    fn check_reference(&self, foreign_key: &ForeignKey, referenced: Option<&Entity>) -> DomainResult<()> {
        if self.definition.foreign_key(foreign_key.attribute()).is_none() {
            return Err(DomainError::invalid_attribute(
                foreign_key,
                format!("not a foreign key of {}", self.entity_type()),
            ));
        }
        match referenced {
            Some(entity) if entity.entity_type() != foreign_key.referenced_type() => {
                Err(DomainError::invalid_value(
                    foreign_key,
                    format!(
                        "expected {}, got {}",
                        foreign_key.referenced_type(),
                        entity.entity_type()
                    ),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        map.entry(&"type", &self.entity_type().name());
        for column in self.definition.columns() {
            if let Some(value) = self.values.get(column.attribute()) {
                map.entry(&column.attribute().name(), value);
            }
        }
        for fk in self.definition.foreign_keys() {
            if let Some(referenced) = self.references.get(fk.attribute()) {
                map.entry(&fk.attribute().name(), &referenced.as_ref().map(Entity::key));
            }
        }
        map.finish()
    }
}

/// Builds an [`Entity`] from initial values.
///
/// Errors are deferred to [`EntityBuilder::build`].
#[derive(Debug)]
pub struct EntityBuilder {
    entity: Entity,
    error: Option<DomainError>,
}

impl EntityBuilder {
    /// Sets an initial value.
    #[must_use]
    pub fn with(mut self, attribute: &Attribute, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match self.entity.validate(attribute, value.into()) {
                Ok(value) => {
                    self.entity.values.insert(attribute.clone(), value);
                }
                Err(error) => self.error = Some(error),
            }
        }
        self
    }

    /// Sets an initial referenced entity, copying its key values into the
    /// referencing columns.
    #[must_use]
    pub fn with_reference(mut self, foreign_key: &ForeignKey, referenced: Option<Entity>) -> Self {
        if self.error.is_none() {
            if let Err(error) = self.entity.set_reference(foreign_key, referenced) {
                self.error = Some(error);
            }
            self.entity.save();
        }
        self
    }

    /// Finishes the entity.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a `with` call.
    pub fn build(self) -> DomainResult<Entity> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.entity),
        }
    }
}
