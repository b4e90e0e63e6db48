//! The entity definition registry.

use crate::attribute::{Attribute, EntityType};
use crate::definition::{EntityDefinition, ForeignKeyDefinition};
use crate::entity::{Entity, EntityBuilder};
use crate::error::{DomainError, DomainResult};
use crate::key::Key;
use entisql_db::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// All entity definitions of a domain.
///
/// Built once at startup and immutable afterwards; share it with `Arc`.
#[derive(Debug)]
pub struct Entities {
    domain_name: String,
    definitions: HashMap<EntityType, Arc<EntityDefinition>>,
    order: Vec<EntityType>,
}

impl Entities {
    /// Starts a registry for the named domain.
    pub fn builder(domain_name: impl Into<String>) -> EntitiesBuilder {
        EntitiesBuilder {
            domain_name: domain_name.into(),
            definitions: Vec::new(),
        }
    }

    /// Returns the domain name.
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Returns the definition of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownEntityType`] if it is not registered.
    pub fn definition(&self, entity_type: &EntityType) -> DomainResult<&Arc<EntityDefinition>> {
        self.definitions
            .get(entity_type)
            .ok_or_else(|| DomainError::UnknownEntityType(entity_type.to_string()))
    }

    /// Returns true if `entity_type` is registered.
    #[must_use]
    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.definitions.contains_key(entity_type)
    }

    /// Returns all definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<EntityDefinition>> {
        self.order.iter().filter_map(|t| self.definitions.get(t))
    }

    /// Starts building an entity of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownEntityType`] if it is not registered.
    pub fn entity(&self, entity_type: &EntityType) -> DomainResult<EntityBuilder> {
        Ok(Entity::builder(self.definition(entity_type)?.clone()))
    }

    /// Creates a primary key of `entity_type` from values in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or the values do not fit the
    /// primary key.
    pub fn primary_key(&self, entity_type: &EntityType, values: Vec<Value>) -> DomainResult<Key> {
        Key::primary_key(self.definition(entity_type)?, values)
    }

    /// Returns every non-soft foreign key, across all definitions, that
    /// references `entity_type`.
    #[must_use]
    pub fn referencing(&self, entity_type: &EntityType) -> Vec<(&Arc<EntityDefinition>, &ForeignKeyDefinition)> {
        self.definitions()
            .flat_map(|definition| {
                definition
                    .foreign_keys()
                    .iter()
                    .filter(move |fk| !fk.is_soft() && fk.foreign_key().referenced_type() == entity_type)
                    .map(move |fk| (definition, fk))
            })
            .collect()
    }
}

/// Builds and validates an [`Entities`] registry.
#[derive(Debug)]
pub struct EntitiesBuilder {
    domain_name: String,
    definitions: Vec<EntityDefinition>,
}

impl EntitiesBuilder {
    /// Adds a definition.
    #[must_use]
    pub fn add(mut self, definition: EntityDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validates the definitions and finishes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidSchema`] if an entity type is defined
    /// twice, has no columns, repeats an attribute, declares an attribute of
    /// another type, or has a foreign key whose columns or referenced key do
    /// not line up with the referenced definition.
    pub fn build(self) -> DomainResult<Entities> {
        let mut definitions = HashMap::new();
        let mut order = Vec::new();
        for definition in self.definitions {
            let entity_type = definition.entity_type().clone();
            validate_attributes(&definition)?;
            if definitions
                .insert(entity_type.clone(), Arc::new(definition))
                .is_some()
            {
                return Err(DomainError::invalid_schema(format!(
                    "entity type {entity_type} is defined more than once"
                )));
            }
            order.push(entity_type);
        }
        for definition in definitions.values() {
            validate_foreign_keys(definition, &definitions)?;
        }
        debug!(domain = %self.domain_name, entity_types = order.len(), "domain registered");
        Ok(Entities {
            domain_name: self.domain_name,
            definitions,
            order,
        })
    }
}

fn validate_attributes(definition: &EntityDefinition) -> DomainResult<()> {
    let entity_type = definition.entity_type();
    if definition.columns().is_empty() {
        return Err(DomainError::invalid_schema(format!(
            "entity type {entity_type} has no columns"
        )));
    }
    let mut seen: HashSet<&Attribute> = HashSet::new();
    for attribute in definition.attributes() {
        if attribute.entity_type() != entity_type {
            return Err(DomainError::invalid_schema(format!(
                "attribute {attribute} does not belong to {entity_type}"
            )));
        }
        if !seen.insert(attribute) {
            return Err(DomainError::invalid_schema(format!(
                "attribute {attribute} is defined more than once"
            )));
        }
    }
    let key_indexes: Vec<usize> = definition
        .primary_key_columns()
        .iter()
        .filter_map(|c| c.key_index())
        .collect();
    if key_indexes.iter().enumerate().any(|(position, index)| position != *index) {
        return Err(DomainError::invalid_schema(format!(
            "primary key indexes of {entity_type} must run from 0 without gaps"
        )));
    }
    Ok(())
}

fn validate_foreign_keys(
    definition: &EntityDefinition,
    definitions: &HashMap<EntityType, Arc<EntityDefinition>>,
) -> DomainResult<()> {
    for fk in definition.foreign_keys() {
        let foreign_key = fk.foreign_key();
        let referenced = definitions.get(foreign_key.referenced_type()).ok_or_else(|| {
            DomainError::invalid_schema(format!(
                "foreign key {foreign_key} references undefined entity type {}",
                foreign_key.referenced_type()
            ))
        })?;
        if foreign_key.references().is_empty() {
            return Err(DomainError::invalid_schema(format!(
                "foreign key {foreign_key} has no references"
            )));
        }
        for reference in foreign_key.references() {
            if definition.find_column(&reference.column).is_none() {
                return Err(DomainError::invalid_schema(format!(
                    "foreign key {foreign_key} column {} is not a column of {}",
                    reference.column,
                    definition.entity_type()
                )));
            }
            if referenced.find_column(&reference.referenced).is_none() {
                return Err(DomainError::invalid_schema(format!(
                    "foreign key {foreign_key} references {}, not a column of {}",
                    reference.referenced,
                    referenced.entity_type()
                )));
            }
        }
    }
    Ok(())
}
