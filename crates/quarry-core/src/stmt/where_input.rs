use super::{FindOperator, Value, WhereKind};

use indexmap::IndexMap;

/// A where object: property names mapped to values, operators or nested
/// objects for embedded and related properties. Keys are `and`-combined.
#[derive(Debug, Clone, Default)]
pub struct FindWhere(IndexMap<String, WhereValue>);

#[derive(Debug, Clone)]
pub enum WhereValue {
    Value(Value),
    Operator(FindOperator),
    Object(FindWhere),
}

/// Anything accepted by `where_`, `and_where` and `or_where`.
#[derive(Debug, Clone)]
pub enum WhereInput {
    /// SQL text with `alias.property` paths and `:name` parameters.
    Raw(String),

    Object(FindWhere),

    /// Objects `or`-combined with each other.
    Objects(Vec<FindWhere>),

    Brackets(Brackets),
}

/// A group of where inputs rendered inside parentheses.
#[derive(Debug, Clone, Default)]
pub struct Brackets {
    pub(crate) clauses: Vec<(WhereKind, WhereInput)>,
    pub(crate) negated: bool,
}

impl FindWhere {
    pub fn new() -> FindWhere {
        FindWhere::default()
    }

    pub fn field(mut self, property: impl Into<String>, value: impl Into<WhereValue>) -> Self {
        self.0.insert(property.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, property: &str) -> Option<&WhereValue> {
        self.0.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WhereValue)> + '_ {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl Brackets {
    pub fn new() -> Brackets {
        Brackets::default()
    }

    /// Brackets rendered as `NOT (...)`.
    pub fn not() -> Brackets {
        Brackets {
            clauses: vec![],
            negated: true,
        }
    }

    pub fn where_(mut self, input: impl Into<WhereInput>) -> Self {
        self.clauses.clear();
        self.clauses.push((WhereKind::Simple, input.into()));
        self
    }

    pub fn and_where(mut self, input: impl Into<WhereInput>) -> Self {
        self.clauses.push((WhereKind::And, input.into()));
        self
    }

    pub fn or_where(mut self, input: impl Into<WhereInput>) -> Self {
        self.clauses.push((WhereKind::Or, input.into()));
        self
    }
}

impl From<FindOperator> for WhereValue {
    fn from(src: FindOperator) -> Self {
        Self::Operator(src)
    }
}

impl From<FindWhere> for WhereValue {
    fn from(src: FindWhere) -> Self {
        Self::Object(src)
    }
}

impl<T: Into<Value>> From<T> for WhereValue {
    fn from(src: T) -> Self {
        Self::Value(src.into())
    }
}

impl From<&str> for WhereInput {
    fn from(src: &str) -> Self {
        Self::Raw(src.to_string())
    }
}

impl From<String> for WhereInput {
    fn from(src: String) -> Self {
        Self::Raw(src)
    }
}

impl From<FindWhere> for WhereInput {
    fn from(src: FindWhere) -> Self {
        Self::Object(src)
    }
}

impl From<Vec<FindWhere>> for WhereInput {
    fn from(src: Vec<FindWhere>) -> Self {
        Self::Objects(src)
    }
}

impl From<Brackets> for WhereInput {
    fn from(src: Brackets) -> Self {
        Self::Brackets(src)
    }
}
