//! SQL statement synthesis.
//!
//! Pure functions over an entity definition, already rendered condition
//! text and the database dialect. Column order in every statement equals
//! the order in which the caller binds parameters.

use entisql_db::Database;
use entisql_domain::{ColumnDefinition, EntityDefinition};

/// Joins column expressions with `", "`.
#[must_use]
pub fn columns_clause(columns: &[&ColumnDefinition]) -> String {
    columns
        .iter()
        .map(|column| column.column_expression())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `insert [hint] into table(a, b) values(?, ?)`
#[must_use]
pub fn insert_query(definition: &EntityDefinition, columns: &[&ColumnDefinition]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let hint = definition
        .insert_hint()
        .map(|hint| format!("{hint} "))
        .unwrap_or_default();
    format!(
        "insert {hint}into {}({}) values({placeholders})",
        definition.table_name(),
        columns_clause(columns)
    )
}

/// `update table set a = ?, b = ? [where ...]`
#[must_use]
pub fn update_query(table_name: &str, columns: &[&ColumnDefinition], where_clause: &str) -> String {
    let assignments = columns
        .iter()
        .map(|column| format!("{} = ?", column.column_expression()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("update {table_name} set {assignments}{}", where_suffix(where_clause))
}

/// `select column from table [where ...]`, reading one lazily loaded
/// column from the base table.
#[must_use]
pub fn column_query(table_name: &str, column: &ColumnDefinition, where_clause: &str) -> String {
    format!(
        "select {} from {table_name}{}",
        column.column_expression(),
        where_suffix(where_clause)
    )
}

/// `delete from table [where ...]`
#[must_use]
pub fn delete_query(table_name: &str, where_clause: &str) -> String {
    format!("delete from {table_name}{}", where_suffix(where_clause))
}

fn where_suffix(where_clause: &str) -> String {
    if where_clause.is_empty() {
        String::new()
    } else {
        format!(" where {where_clause}")
    }
}

/// A `select` statement over one entity type.
#[derive(Debug, Clone)]
pub struct SelectStatement<'a> {
    definition: &'a EntityDefinition,
    columns: String,
    where_clause: String,
    order_by: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    for_update: bool,
    grouped: bool,
}

impl<'a> SelectStatement<'a> {
    /// Starts a select of `columns` from the definition's select table.
    ///
    /// Ignored for definitions with a custom select query, which carries
    /// its own column list.
    #[must_use]
    pub fn new(definition: &'a EntityDefinition, columns: impl Into<String>) -> Self {
        Self {
            definition,
            columns: columns.into(),
            where_clause: String::new(),
            order_by: None,
            limit: None,
            offset: None,
            for_update: false,
            grouped: true,
        }
    }

    /// Sets the rendered condition, without the `where` keyword.
    #[must_use]
    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    /// Sets the rendered `order by` list.
    #[must_use]
    pub fn order_by(mut self, order_by: Option<String>) -> Self {
        self.order_by = order_by.filter(|order_by| !order_by.is_empty());
        self
    }

    /// Sets the row limit and offset.
    #[must_use]
    pub const fn page(mut self, limit: Option<usize>, offset: Option<usize>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Requests row locks.
    #[must_use]
    pub const fn for_update(mut self, for_update: bool) -> Self {
        self.for_update = for_update;
        self
    }

    /// Leaves out the definition's `group by` and `having` clauses.
    #[must_use]
    pub const fn ungrouped(mut self) -> Self {
        self.grouped = false;
        self
    }

    /// Renders the statement for `database`.
    ///
    /// A `for update` select on a database with row locks leaves out
    /// grouping, ordering and paging.
    #[must_use]
    pub fn to_sql(&self, database: &dyn Database) -> String {
        let mut sql = self.base();
        if self.for_update && database.supports_select_for_update() {
            sql.push_str(" for update");
            if database.supports_nowait() {
                sql.push_str(" nowait");
            }
            return sql;
        }
        if self.grouped {
            if let Some(group_by) = self.definition.group_by_clause() {
                sql.push_str(" group by ");
                sql.push_str(&group_by);
            }
            if let Some(having) = self.definition.having_clause() {
                sql.push_str(" having ");
                sql.push_str(having);
            }
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" order by ");
            sql.push_str(order_by);
        }
        if let Some(page) = database.limit_offset_clause(self.limit, self.offset) {
            sql.push(' ');
            sql.push_str(&page);
        }
        sql
    }

    fn base(&self) -> String {
        match self.definition.select_query() {
            Some(query) if self.where_clause.is_empty() => query.query().to_string(),
            Some(query) => {
                let keyword = if query.contains_where_clause() { "and" } else { "where" };
                format!("{} {keyword} {}", query.query(), self.where_clause)
            }
            None => format!(
                "select {} from {}{}",
                self.columns,
                self.definition.select_table_name(),
                where_suffix(&self.where_clause)
            ),
        }
    }
}

/// `select count(*)` over the rows matching `where_clause`.
///
/// Custom and grouped queries are counted through a derived table, aliased
/// when the dialect requires it.
#[must_use]
pub fn count_query(definition: &EntityDefinition, where_clause: &str, database: &dyn Database) -> String {
    if definition.select_query().is_none() && definition.group_by_clause().is_none() {
        return format!(
            "select count(*) from {}{}",
            definition.select_table_name(),
            where_suffix(where_clause)
        );
    }
    let key_columns = definition.primary_key_columns();
    let columns = if key_columns.is_empty() {
        columns_clause(&definition.selected_columns())
    } else {
        columns_clause(&key_columns)
    };
    let subquery = SelectStatement::new(definition, columns)
        .where_clause(where_clause)
        .to_sql(database);
    let alias = if database.subquery_requires_alias() { " as row_count" } else { "" };
    format!("select count(*) from ({subquery}){alias}")
}
