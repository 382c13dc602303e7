use super::error::{ResourceError, ResourceResult};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Increment,
}

/// One patch operation on a JSON-pointer field (`/mail` or `mail`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub operation: PatchOp,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn new(operation: PatchOp, field: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            operation,
            field: field.into(),
            value,
        }
    }

    pub fn add(field: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Add, field, Some(value))
    }

    pub fn replace(field: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Replace, field, Some(value))
    }

    pub fn remove(field: impl Into<String>) -> Self {
        Self::new(PatchOp::Remove, field, None)
    }

    pub fn increment(field: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Increment, field, Some(value))
    }

    fn pointer(&self) -> String {
        if self.field.starts_with('/') {
            self.field.clone()
        } else {
            format!("/{}", self.field)
        }
    }

    fn required_value(&self) -> ResourceResult<&Value> {
        self.value.as_ref().ok_or_else(|| {
            ResourceError::bad_request(format!(
                "Patch operation on {} requires a value",
                self.field
            ))
        })
    }
}

/// Apply operations in order; the first failing operation aborts the patch
pub fn apply(content: &mut Value, operations: &[PatchOperation]) -> ResourceResult<()> {
    for operation in operations {
        apply_one(content, operation)?;
    }
    Ok(())
}

fn apply_one(content: &mut Value, operation: &PatchOperation) -> ResourceResult<()> {
    let pointer = operation.pointer();
    let (parent_pointer, token) = split_pointer(&pointer)?;

    let parent = content.pointer_mut(parent_pointer).ok_or_else(|| {
        ResourceError::bad_request(format!(
            "The field {} does not exist",
            parent_pointer
        ))
    })?;

    match operation.operation {
        PatchOp::Add => {
            let value = operation.required_value()?.clone();
            match parent {
                Value::Object(fields) => {
                    fields.insert(token, value);
                }
                Value::Array(items) if token == "-" => items.push(value),
                Value::Array(items) => {
                    let index = array_index(&token, items.len() + 1)?;
                    items.insert(index, value);
                }
                _ => return Err(not_a_container(parent_pointer)),
            }
        }
        PatchOp::Replace => {
            let value = operation.required_value()?.clone();
            match parent {
                Value::Object(fields) => {
                    fields.insert(token, value);
                }
                Value::Array(items) => {
                    let index = array_index(&token, items.len())?;
                    items[index] = value;
                }
                _ => return Err(not_a_container(parent_pointer)),
            }
        }
        PatchOp::Remove => match parent {
            Value::Object(fields) => {
                fields.remove(&token);
            }
            Value::Array(items) => {
                let index = array_index(&token, items.len())?;
                items.remove(index);
            }
            _ => return Err(not_a_container(parent_pointer)),
        },
        PatchOp::Increment => {
            let amount = operation.required_value()?;
            let target = match parent {
                Value::Object(fields) => fields.get_mut(&token),
                Value::Array(items) => {
                    let index = array_index(&token, items.len())?;
                    items.get_mut(index)
                }
                _ => None,
            }
            .ok_or_else(|| {
                ResourceError::bad_request(format!("The field {} does not exist", pointer))
            })?;

            *target = increment(target, amount).ok_or_else(|| {
                ResourceError::bad_request(format!(
                    "Unable to increment field {}: both values must be numbers",
                    pointer
                ))
            })?;
        }
    }

    Ok(())
}

/// Split `/a/b~1c` into (`/a`, `b/c`)
fn split_pointer(pointer: &str) -> ResourceResult<(&str, String)> {
    let (parent, token) = pointer
        .rsplit_once('/')
        .ok_or_else(|| ResourceError::bad_request(format!("Invalid field {}", pointer)))?;

    if token.is_empty() {
        return Err(ResourceError::bad_request("Patch field must not be empty"));
    }

    Ok((parent, token.replace("~1", "/").replace("~0", "~")))
}

fn array_index(token: &str, len: usize) -> ResourceResult<usize> {
    token
        .parse::<usize>()
        .ok()
        .filter(|index| *index < len)
        .ok_or_else(|| ResourceError::bad_request(format!("Invalid array index {}", token)))
}

fn not_a_container(pointer: &str) -> ResourceError {
    ResourceError::bad_request(format!(
        "The field {} is neither an object nor an array",
        pointer
    ))
}

fn increment(current: &Value, amount: &Value) -> Option<Value> {
    let (Value::Number(current), Value::Number(amount)) = (current, amount) else {
        return None;
    };

    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        return a.checked_add(b).map(Value::from);
    }

    let sum = current.as_f64()? + amount.as_f64()?;
    Number::from_f64(sum).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> Value {
        json!({
            "_id": "andy123",
            "name": "Andy",
            "mail": "andrew.forrest@forgerock.com",
            "logins": 1,
            "roles": ["user"]
        })
    }

    #[test]
    fn test_replace_and_add() {
        let mut content = user();
        apply(
            &mut content,
            &[
                PatchOperation::replace("name", json!("Andrew")),
                PatchOperation::add("/telephone", json!("555-0100")),
                PatchOperation::add("/roles/-", json!("admin")),
            ],
        )
        .unwrap();

        assert_eq!(content["name"], "Andrew");
        assert_eq!(content["telephone"], "555-0100");
        assert_eq!(content["roles"], json!(["user", "admin"]));
    }

    #[test]
    fn test_remove_and_increment() {
        let mut content = user();
        apply(
            &mut content,
            &[
                PatchOperation::remove("mail"),
                PatchOperation::increment("logins", json!(2)),
            ],
        )
        .unwrap();

        assert!(content.get("mail").is_none());
        assert_eq!(content["logins"], 3);
    }

    #[test]
    fn test_increment_requires_numbers() {
        let mut content = user();
        let result = apply(&mut content, &[PatchOperation::increment("name", json!(1))]);
        assert!(matches!(result, Err(ResourceError::BadRequest(_))));

        let result = apply(&mut content, &[PatchOperation::increment("missing", json!(1))]);
        assert!(matches!(result, Err(ResourceError::BadRequest(_))));
    }

    #[test]
    fn test_missing_parent_and_value() {
        let mut content = user();
        let result = apply(&mut content, &[PatchOperation::add("/address/city", json!("Bristol"))]);
        assert!(matches!(result, Err(ResourceError::BadRequest(_))));

        let result = apply(
            &mut content,
            &[PatchOperation::new(PatchOp::Replace, "name", None)],
        );
        assert!(matches!(result, Err(ResourceError::BadRequest(_))));
    }

    #[test]
    fn test_deserializes_wire_format() {
        let operations: Vec<PatchOperation> = serde_json::from_value(json!([
            { "operation": "replace", "field": "/mail", "value": "andy@example.com" },
            { "operation": "remove", "field": "/name" }
        ]))
        .unwrap();

        assert_eq!(operations[0], PatchOperation::replace("/mail", json!("andy@example.com")));
        assert_eq!(operations[1].operation, PatchOp::Remove);
    }
}
