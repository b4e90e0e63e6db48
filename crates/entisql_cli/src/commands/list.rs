//! List command implementation.

use super::{entity_type, json_value, open, text_value};
use entisql_core::EntityConnection;
use entisql_domain::condition::Select;
use entisql_domain::{Attribute, Entity, EntityDefinition};
use std::path::Path;

/// Runs the list command.
pub fn run(path: &Path, entity: &str, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let connection = open(path)?;
    let entity_type = entity_type(connection.entities(), entity)?;
    let definition = connection.entities().definition(&entity_type)?.clone();

    let mut select = Select::all(entity_type);
    if let Some(limit) = limit {
        select = select.limit(limit);
    }
    let rows = connection.select(&select)?;
    let attributes = output_attributes(&definition);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&to_json(&rows, &attributes))?);
        }
        _ => {
            print_text_output(&rows, &attributes);
        }
    }

    Ok(())
}

/// Selected columns followed by derived attributes.
fn output_attributes(definition: &EntityDefinition) -> Vec<Attribute> {
    definition
        .selected_columns()
        .into_iter()
        .map(|column| column.attribute().clone())
        .chain(definition.derived_attributes().iter().map(|d| d.attribute().clone()))
        .collect()
}

fn to_json(rows: &[Entity], attributes: &[Attribute]) -> serde_json::Value {
    rows.iter()
        .map(|row| {
            attributes
                .iter()
                .map(|attribute| (attribute.name().to_string(), json_value(&row.value(attribute))))
                .collect::<serde_json::Map<_, _>>()
        })
        .map(serde_json::Value::Object)
        .collect()
}

fn print_text_output(rows: &[Entity], attributes: &[Attribute]) {
    let header: Vec<&str> = attributes.iter().map(Attribute::name).collect();
    println!("{}", header.join("\t"));
    for row in rows {
        let values: Vec<String> = attributes.iter().map(|a| text_value(&row.value(a))).collect();
        println!("{}", values.join("\t"));
    }
    println!();
    println!("{} rows", rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use entisql_domain::condition::OrderBy;
    use entisql_testkit::domain::{DEPT, DEPT_NAME, EMP, EMP_LABEL, EMP_PHOTO};
    use entisql_testkit::TestDatabase;

    #[test]
    fn derived_attributes_follow_columns() {
        let db = TestDatabase::memory();
        let definition = db.entities().definition(&EMP).unwrap();
        let attributes = output_attributes(definition);
        assert_eq!(attributes.last(), Some(&EMP_LABEL));
        assert!(!attributes.contains(&EMP_PHOTO));
    }

    #[test]
    fn rows_become_json_objects() {
        let db = TestDatabase::memory();
        let select = Select::all(DEPT).order_by(OrderBy::ascending(&[DEPT_NAME])).limit(1);
        let rows = db.select(&select).unwrap();
        let attributes = output_attributes(db.entities().definition(&DEPT).unwrap());
        assert_eq!(
            to_json(&rows, &attributes),
            serde_json::json!([{ "deptno": 10, "dname": "ACCOUNTING", "locno": 2 }])
        );
    }
}
