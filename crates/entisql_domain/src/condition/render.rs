//! Rendering conditions to `where` clause text.

use super::{ColumnCondition, Condition, Operator};
use crate::definition::EntityDefinition;
use crate::error::DomainResult;

pub(super) fn render(condition: &Condition, definition: &EntityDefinition, limit: usize) -> DomainResult<String> {
    match condition {
        Condition::All(_) => Ok(String::new()),
        Condition::Column(column) => render_column(column, definition, limit),
        Condition::Custom(custom) => Ok(custom.sql.clone()),
        Condition::Combination(combination) => {
            let mut parts = Vec::with_capacity(combination.conditions.len());
            for operand in &combination.conditions {
                let sql = render(operand, definition, limit)?;
                if !sql.is_empty() {
                    parts.push(sql);
                }
            }
            Ok(match parts.len() {
                0 => String::new(),
                1 => parts.remove(0),
                _ => format!("({})", parts.join(&format!(" {} ", combination.conjunction))),
            })
        }
    }
}

fn render_column(condition: &ColumnCondition, definition: &EntityDefinition, limit: usize) -> DomainResult<String> {
    let column = definition.column(&condition.attribute)?;
    let expression = column.column_expression();
    let ignore_case = !condition.case_sensitive && column.value_type().is_text();
    let identifier = if ignore_case {
        format!("upper({expression})")
    } else {
        expression.to_string()
    };
    let placeholder = if ignore_case { "upper(?)" } else { "?" };
    let values = condition.values.len();

    let sql = match condition.operator {
        Operator::Equal if values == 0 => format!("{expression} is null"),
        Operator::NotEqual if values == 0 => format!("{expression} is not null"),
        Operator::Equal => format!("{identifier} = {placeholder}"),
        Operator::NotEqual => format!("{identifier} <> {placeholder}"),
        Operator::LessThan => format!("{identifier} < {placeholder}"),
        Operator::LessThanOrEqual => format!("{identifier} <= {placeholder}"),
        Operator::GreaterThan => format!("{identifier} > {placeholder}"),
        Operator::GreaterThanOrEqual => format!("{identifier} >= {placeholder}"),
        Operator::Like => format!("{identifier} like {placeholder}"),
        Operator::NotLike => format!("{identifier} not like {placeholder}"),
        Operator::In => in_list(&identifier, "in", "or", placeholder, values, limit),
        Operator::NotIn => in_list(&identifier, "not in", "and", placeholder, values, limit),
        Operator::Between => format!("({identifier} >= {placeholder} and {identifier} <= {placeholder})"),
        Operator::BetweenExclusive => format!("({identifier} > {placeholder} and {identifier} < {placeholder})"),
        Operator::NotBetween => format!("({identifier} < {placeholder} or {identifier} > {placeholder})"),
        Operator::NotBetweenExclusive => {
            format!("({identifier} <= {placeholder} or {identifier} >= {placeholder})")
        }
    };
    Ok(sql)
}

/// `col in (?, ?)`, split into `limit` sized lists joined by `joiner` and
/// wrapped in parentheses when `count` exceeds `limit`.
fn in_list(identifier: &str, keyword: &str, joiner: &str, placeholder: &str, count: usize, limit: usize) -> String {
    let list = |size: usize| format!("{identifier} {keyword} ({})", vec![placeholder; size].join(", "));
    if count <= limit {
        return list(count);
    }
    let chunks: Vec<String> = (0..count)
        .step_by(limit)
        .map(|start| list(limit.min(count - start)))
        .collect();
    format!("({})", chunks.join(&format!(" {joiner} ")))
}
