use super::Value;

/// A hashable, typed identity for a tuple of column values.
///
/// Used to correlate loader rows with their owners. Integers of different
/// widths compare equal; an integer and a string with the same digits do
/// not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Vec<KeyPart>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
    Json(String),
}

impl Key {
    pub fn new<'a>(values: impl IntoIterator<Item = &'a Value>) -> Key {
        Key(values.into_iter().map(KeyPart::from).collect())
    }

    pub fn single(value: &Value) -> Key {
        Key(vec![KeyPart::from(value)])
    }

    /// Returns `true` if any component of the key is null. Null keys never
    /// correlate with anything.
    pub fn has_null(&self) -> bool {
        self.0.iter().any(|part| matches!(part, KeyPart::Null))
    }
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> KeyPart {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(v) => KeyPart::Bool(*v),
            Value::I32(v) => KeyPart::Int(i64::from(*v)),
            Value::I64(v) => KeyPart::Int(*v),
            Value::F64(v) => KeyPart::Float(v.to_bits()),
            Value::String(v) => KeyPart::String(v.clone()),
            Value::Bytes(v) => KeyPart::Bytes(v.clone()),
            other => KeyPart::Json(other.to_json().to_string()),
        }
    }
}
