//! The live, dynamically typed form instance.
//!
//! `FormInstance` holds member values as JSON. Typed Rust structs cross the
//! boundary through serde: `from_typed` flattens a struct into fields and
//! `into_typed` rebuilds it once the form has been populated.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInstance {
    type_name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FormInstance {
    /// A fresh instance with every member unset.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Map::new(),
        }
    }

    /// Wrap an existing JSON object as an instance of `type_name`.
    pub fn from_fields(type_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Serialize a typed value into an instance. The value must serialize to
    /// a JSON object.
    pub fn from_typed<T: Serialize>(
        type_name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self::from_fields(type_name, fields)),
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "form instance must serialize to an object, got {other}"
            ))),
        }
    }

    /// Rebuild a typed value from the populated fields.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields))
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, member: &str) -> Option<&Value> {
        self.fields.get(member)
    }

    /// Text value of a member, if it holds a string.
    pub fn get_str(&self, member: &str) -> Option<&str> {
        self.fields.get(member).and_then(Value::as_str)
    }

    /// Assign a member, returning the previous value.
    pub fn set(&mut self, member: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(member.into(), value.into())
    }

    /// A member counts as set when present and not null.
    pub fn is_set(&self, member: &str) -> bool {
        self.fields.get(member).is_some_and(|v| !v.is_null())
    }

    pub fn take(&mut self, member: &str) -> Option<Value> {
        self.fields.remove(member)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// JSON object view, as assigned into a parent member.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Login {
        username: String,
        #[serde(default)]
        attempts: u32,
    }

    #[test]
    fn test_set_and_is_set() {
        let mut inst = FormInstance::new("Login");
        assert!(!inst.is_set("username"));
        inst.set("username", "ada");
        assert!(inst.is_set("username"));
        assert_eq!(inst.get_str("username"), Some("ada"));

        inst.set("token", Value::Null);
        assert!(!inst.is_set("token"));
    }

    #[test]
    fn test_typed_roundtrip() {
        let login = Login {
            username: "ada".to_string(),
            attempts: 2,
        };
        let mut inst = FormInstance::from_typed("Login", &login).unwrap();
        assert_eq!(inst.type_name(), "Login");
        inst.set("attempts", json!(3));
        let back: Login = inst.into_typed().unwrap();
        assert_eq!(back.attempts, 3);
        assert_eq!(back.username, "ada");
    }

    #[test]
    fn test_from_typed_rejects_non_object() {
        let err = FormInstance::from_typed("Login", &42).unwrap_err();
        assert!(err.to_string().contains("must serialize to an object"));
    }
}
