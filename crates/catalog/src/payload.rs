use serde_json::{Map, Value};

use agencyops_core::{DomainError, DomainResult};

use crate::operation_type::{FieldKind, OperationType};

/// Submitted form values, keyed by field name.
///
/// Kept loosely typed: the schema it is checked against is itself catalog data.
pub type Payload = Map<String, Value>;

/// Check a payload against the live fields of `op_type`.
///
/// Required fields must be present and non-blank; typed fields must hold a
/// value of their kind. Unknown keys are tolerated (older clients send extras).
pub fn validate_payload(op_type: &OperationType, payload: &Payload) -> DomainResult<()> {
    for field in op_type.live_fields() {
        let value = payload.get(&field.name).filter(|v| !is_blank(v));

        let Some(value) = value else {
            if field.required {
                return Err(DomainError::validation(format!(
                    "missing required field '{}'",
                    field.name
                )));
            }
            continue;
        };

        match field.kind {
            FieldKind::Number if !is_numeric(value) => {
                return Err(DomainError::validation(format!(
                    "field '{}' must be a number",
                    field.name
                )));
            }
            FieldKind::Select => {
                let chosen = value.as_str().unwrap_or_default();
                if !field.options.iter().any(|o| o == chosen) {
                    return Err(DomainError::validation(format!(
                        "field '{}' must be one of {:?}",
                        field.name, field.options
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        // Non-finite parses ("NaN", "1e400") are not amounts.
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}
