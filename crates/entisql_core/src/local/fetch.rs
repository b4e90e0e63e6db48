//! Foreign key resolution.
//!
//! Referenced entities are fetched breadth first: one select per foreign
//! key per level, each batch keyed by the distinct non-null keys its parent
//! batch references. Batches are attached bottom up once every level has
//! been fetched, so each parent receives fully resolved children.

use super::{LocalEntityConnection, State};
use crate::error::EntityResult;
use entisql_domain::condition::{self, Select};
use entisql_domain::{Entity, EntityDefinition, ForeignKey, ForeignKeyDefinition, Key};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

struct Batch {
    definition: Arc<EntityDefinition>,
    entities: Vec<Entity>,
    depth: usize,
    /// Fetch depth of the foreign key this batch was fetched through.
    inherited: Option<usize>,
    parent: Option<(usize, ForeignKey)>,
}

/// The key `entity` is referenced by through `foreign_key`.
fn referenced_by(foreign_key: &ForeignKey, entity: &Entity) -> Key {
    Key::new(
        foreign_key.referenced_type().clone(),
        foreign_key
            .references()
            .iter()
            .map(|reference| (reference.referenced.clone(), entity.value(&reference.referenced)))
            .collect(),
    )
}

/// True if every referencing column of `foreign_key` was selected for
/// `entity`. References over columns left out of a select stay unloaded.
fn has_columns(entity: &Entity, foreign_key: &ForeignKey) -> bool {
    foreign_key
        .references()
        .iter()
        .all(|reference| entity.contains(&reference.column))
}

/// Keys of the referenced type already present in `index` or the batches
/// it descends from. Without a depth limit these end the descent.
fn ancestor_keys(batches: &[Batch], index: usize, foreign_key: &ForeignKey) -> HashSet<Key> {
    let mut keys = HashSet::new();
    let mut current = Some(index);
    while let Some(index) = current {
        let batch = &batches[index];
        if batch.definition.entity_type() == foreign_key.referenced_type() {
            keys.extend(batch.entities.iter().map(|entity| referenced_by(foreign_key, entity)));
        }
        current = batch.parent.as_ref().map(|(parent, _)| *parent);
    }
    keys
}

impl LocalEntityConnection {
    fn depth_limit(&self, state: &State, select: &Select, batch: &Batch, foreign_key: &ForeignKeyDefinition) -> Option<usize> {
        if !state.limit_fetch_depth {
            return self.config.max_fetch_depth;
        }
        batch.inherited.or_else(|| {
            Some(
                select
                    .foreign_key_fetch_depth(foreign_key.attribute())
                    .or(select.get_fetch_depth())
                    .unwrap_or(foreign_key.default_fetch_depth()),
            )
        })
    }

    /// Populates the foreign key references of `entities`, selected with
    /// `select` from `definition`.
    ///
    /// References beyond the fetch depth, references with nothing left to
    /// fetch, and every reference of a `for update` select, are attached as
    /// key-only placeholders. Null references are attached as `None`.
    pub(super) fn resolve_foreign_keys(
        &self,
        state: &mut State,
        definition: &Arc<EntityDefinition>,
        entities: Vec<Entity>,
        select: &Select,
    ) -> EntityResult<Vec<Entity>> {
        if entities.is_empty() || definition.foreign_keys().is_empty() {
            return Ok(entities);
        }
        let mut batches = vec![Batch {
            definition: definition.clone(),
            entities,
            depth: 0,
            inherited: None,
            parent: None,
        }];
        let mut fetched: HashSet<(usize, ForeignKey)> = HashSet::new();

        let mut index = 0;
        while index < batches.len() && !select.is_for_update() {
            let batch_definition = batches[index].definition.clone();
            for foreign_key in batch_definition.foreign_keys() {
                let limit = self.depth_limit(state, select, &batches[index], foreign_key);
                if limit.is_some_and(|limit| batches[index].depth >= limit) {
                    continue;
                }
                let reference = foreign_key.foreign_key();
                let mut keys: Vec<Key> = Vec::new();
                for entity in &batches[index].entities {
                    if let Some(key) = entity.referenced_key(reference) {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
                if limit.is_none() {
                    let seen = ancestor_keys(&batches, index, reference);
                    keys.retain(|key| !seen.contains(key));
                }
                if keys.is_empty() {
                    continue;
                }
                let referenced_definition = self.definition(reference.referenced_type())?.clone();
                let fetch = Select::where_(condition::keys(&keys)?);
                let children = self.query_entities(state, &referenced_definition, &fetch)?;
                trace!(
                    foreign_key = %reference.attribute(),
                    depth = batches[index].depth + 1,
                    keys = keys.len(),
                    rows = children.len(),
                    "fetched referenced entities"
                );
                fetched.insert((index, reference.clone()));
                let depth = batches[index].depth + 1;
                batches.push(Batch {
                    definition: referenced_definition,
                    entities: children,
                    depth,
                    inherited: limit,
                    parent: Some((index, reference.clone())),
                });
            }
            index += 1;
        }

        for (index, batch) in batches.iter_mut().enumerate() {
            for foreign_key in batch.definition.clone().foreign_keys() {
                let reference = foreign_key.foreign_key();
                if fetched.contains(&(index, reference.clone())) {
                    continue;
                }
                let referenced_definition = self.definition(reference.referenced_type())?;
                for entity in batch.entities.iter_mut().filter(|entity| has_columns(entity, reference)) {
                    let placeholder = entity
                        .referenced_key(reference)
                        .map(|key| Entity::key_only(referenced_definition.clone(), &key));
                    entity.attach_reference(reference, placeholder)?;
                }
            }
        }

        for child in (1..batches.len()).rev() {
            let Some((parent, reference)) = batches[child].parent.clone() else {
                continue;
            };
            let child_definition = batches[child].definition.clone();
            let by_key: HashMap<Key, Entity> = std::mem::take(&mut batches[child].entities)
                .into_iter()
                .map(|entity| (referenced_by(&reference, &entity), entity))
                .collect();
            for entity in batches[parent]
                .entities
                .iter_mut()
                .filter(|entity| has_columns(entity, &reference))
            {
                let referenced = entity.referenced_key(&reference).map(|key| {
                    by_key
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| Entity::key_only(child_definition.clone(), &key))
                });
                entity.attach_reference(&reference, referenced)?;
            }
        }

        Ok(batches.swap_remove(0).entities)
    }
}
