use super::{Entity, LazyRelation, Record};

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 32-bit integer
    I32(i32),

    /// Signed 64-bit integer
    I64(i64),

    /// Double precision float
    F64(f64),

    /// String value
    String(String),

    /// Binary blob
    Bytes(Vec<u8>),

    /// Structured JSON document, as stored in a JSON column
    Json(serde_json::Value),

    /// A list of values
    List(Vec<Value>),

    /// An embedded object or an untyped key/value map
    Record(Record),

    /// A materialized entity
    Entity(Box<Entity>),

    /// A relation that has not been loaded yet
    Lazy(LazyRelation),

    /// Null value
    #[default]
    Null,
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I32(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::String(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Returns `true` if the value is null or a record whose every leaf is
    /// null.
    pub fn is_empty_record(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Record(record) => record.values().all(Value::is_empty_record),
            _ => false,
        }
    }

    /// Renders the value as one component of a row grouping key.
    ///
    /// Blobs render as hex and structured values as their JSON text.
    pub fn to_key_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(v) => v.to_string(),
            Self::I32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Bytes(v) => hex::encode(v),
            Self::Json(v) => v.to_string(),
            Self::List(_) | Self::Record(_) | Self::Entity(_) | Self::Lazy(_) => {
                self.to_json().to_string()
            }
        }
    }

    /// Converts the value into a JSON document. Lazy relations that have not
    /// been loaded render as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(v) => Json::Bool(*v),
            Self::I32(v) => Json::from(*v),
            Self::I64(v) => Json::from(*v),
            Self::F64(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(v) => Json::String(v.clone()),
            Self::Bytes(v) => Json::String(hex::encode(v)),
            Self::Json(v) => v.clone(),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Record(record) => Json::Object(
                record
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Entity(entity) => Value::Record(entity.fields.clone()).to_json(),
            Self::Lazy(lazy) => lazy.get().map(|v| v.to_json()).unwrap_or(Json::Null),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I32(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<serde_json::Value> for Value {
    fn from(src: serde_json::Value) -> Self {
        Self::Json(src)
    }
}

impl From<Vec<Value>> for Value {
    fn from(src: Vec<Value>) -> Self {
        Self::List(src)
    }
}

impl From<Record> for Value {
    fn from(src: Record) -> Self {
        Self::Record(src)
    }
}

impl From<Entity> for Value {
    fn from(src: Entity) -> Self {
        Self::Entity(Box::new(src))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Self {
        match src {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}
