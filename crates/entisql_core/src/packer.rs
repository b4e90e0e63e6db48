//! Packing result rows into entities.

use crate::error::EntityResult;
use entisql_db::Row;
use entisql_domain::{ColumnDefinition, Entity, EntityDefinition};
use std::sync::Arc;
use tracing::trace;

/// Turns rows selected with a known column list into entities.
#[derive(Debug)]
pub struct EntityPacker<'a> {
    definition: &'a Arc<EntityDefinition>,
    columns: Vec<&'a ColumnDefinition>,
}

impl<'a> EntityPacker<'a> {
    /// Creates a packer for rows holding `columns`, in that order.
    #[must_use]
    pub fn new(definition: &'a Arc<EntityDefinition>, columns: Vec<&'a ColumnDefinition>) -> Self {
        Self { definition, columns }
    }

    /// Packs one row.
    ///
    /// Each value passes through the column's converter, or is coerced to
    /// the column's declared type. Columns absent from the row stay unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a converted value does not fit its column.
    pub fn pack_row(&self, row: Row) -> EntityResult<Entity> {
        let mut builder = Entity::builder(self.definition.clone());
        for (column, value) in self.columns.iter().zip(row) {
            builder = builder.with(column.attribute(), column.from_column(value));
        }
        Ok(builder.build()?)
    }

    /// Packs rows, stopping after `fetch_count` when set.
    ///
    /// # Errors
    ///
    /// See [`EntityPacker::pack_row`].
    pub fn pack(&self, rows: Vec<Row>, fetch_count: Option<usize>) -> EntityResult<Vec<Entity>> {
        let limit = fetch_count.unwrap_or(usize::MAX);
        let entities = rows
            .into_iter()
            .take(limit)
            .map(|row| self.pack_row(row))
            .collect::<EntityResult<Vec<_>>>()?;
        trace!(
            entity_type = %self.definition.entity_type(),
            rows = entities.len(),
            "packed rows"
        );
        Ok(entities)
    }
}
