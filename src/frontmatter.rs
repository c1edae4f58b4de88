use serde_yaml::{Mapping, Value};

use crate::block::{PageProperties, PropertyValue};
use crate::config::{EmptyPolicy, FrontmatterConfig};
use crate::diagnostic::Diagnostics;

const DELIMITER: &str = "---";

/// Largest integer an f64 holds exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Build the delimited frontmatter header for a page.
///
/// Each property is serialized on its own, so a value that cannot be
/// represented only drops that one field.
pub fn build_frontmatter(
    properties: &PageProperties,
    config: &FrontmatterConfig,
    diagnostics: &mut Diagnostics,
) -> String {
    let mut out = String::from(DELIMITER);
    out.push('\n');

    let selected: Vec<(&str, Option<&PropertyValue>)> = if config.fields.is_empty() {
        properties.iter().map(|(name, value)| (name, Some(value))).collect()
    } else {
        config
            .fields
            .iter()
            .map(|name| (name.as_str(), properties.get(name)))
            .collect()
    };

    for (name, value) in selected {
        let yaml = match value {
            Some(value) => match to_yaml(name, value, diagnostics) {
                Some(Field::Value(yaml)) => yaml,
                Some(Field::Empty(empty)) => match config.empty {
                    EmptyPolicy::Omit => continue,
                    EmptyPolicy::Explicit => empty,
                },
                None => continue,
            },
            None => match config.empty {
                EmptyPolicy::Omit => continue,
                EmptyPolicy::Explicit => Value::Null,
            },
        };

        let mut entry = Mapping::new();
        entry.insert(Value::String(name.to_string()), yaml);
        match serde_yaml::to_string(&entry) {
            Ok(line) => out.push_str(&line),
            Err(e) => diagnostics.malformed_property(name, format!("cannot serialize: {e}")),
        }
    }

    out.push_str(DELIMITER);
    out
}

enum Field {
    Value(Value),
    /// No value; carries the explicit empty form for this type
    Empty(Value),
}

fn to_yaml(name: &str, value: &PropertyValue, diagnostics: &mut Diagnostics) -> Option<Field> {
    let field = match value {
        PropertyValue::Text(text) if text.is_empty() => Field::Empty(Value::String(String::new())),
        PropertyValue::Text(text) => Field::Value(Value::String(text.clone())),
        PropertyValue::Select(Some(option)) => Field::Value(Value::String(option.clone())),
        PropertyValue::Select(None) => Field::Empty(Value::Null),
        PropertyValue::MultiSelect(items) | PropertyValue::Relation(items) => {
            if items.is_empty() {
                Field::Empty(Value::Sequence(Vec::new()))
            } else {
                Field::Value(Value::Sequence(
                    items.iter().cloned().map(Value::String).collect(),
                ))
            }
        }
        PropertyValue::Date(None) => Field::Empty(Value::Null),
        PropertyValue::Date(Some(range)) => {
            if range.start.is_empty() {
                diagnostics.malformed_property(name, "date has no start");
                return None;
            }
            match range.end.as_deref().filter(|end| !end.is_empty()) {
                Some(end) => Field::Value(Value::String(format!("{}/{end}", range.start))),
                None => Field::Value(Value::String(range.start.clone())),
            }
        }
        PropertyValue::Checkbox(checked) => Field::Value(Value::Bool(*checked)),
        PropertyValue::Number(None) => Field::Empty(Value::Null),
        PropertyValue::Number(Some(n)) => {
            if !n.is_finite() {
                diagnostics.malformed_property(name, format!("number {n} is not finite"));
                return None;
            }
            if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
                Field::Value(Value::Number((*n as i64).into()))
            } else {
                Field::Value(Value::Number((*n).into()))
            }
        }
        PropertyValue::Unsupported { raw_type } => {
            diagnostics.malformed_property(name, format!("unsupported property type `{raw_type}`"));
            return None;
        }
    };
    Some(field)
}
