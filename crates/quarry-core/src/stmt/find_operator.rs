use super::{Record, Value};

use std::{fmt, sync::Arc};

/// A predicate applied to a property in a where object.
#[derive(Debug, Clone)]
pub enum FindOperator {
    Equal(Value),
    Not(Box<FindOperator>),
    LessThan(Value),
    LessThanOrEqual(Value),
    MoreThan(Value),
    MoreThanOrEqual(Value),
    Like(Value),
    ILike(Value),
    Between(Value, Value),

    /// Bound as one parameter per value.
    In(Vec<Value>),

    /// Bound as a single list parameter: `column = ANY(:p)`.
    Any(Vec<Value>),

    IsNull,
    ArrayContains(Vec<Value>),
    ArrayContainedBy(Vec<Value>),
    ArrayOverlap(Vec<Value>),
    JsonContains(serde_json::Value),
    Raw(RawSql),
    And(Vec<FindOperator>),
    Or(Vec<FindOperator>),
}

/// SQL produced from the column it is applied to, with its own named
/// parameters.
#[derive(Clone)]
pub struct RawSql {
    render: Arc<dyn Fn(&str) -> String + Send + Sync>,
    pub parameters: Record,
}

impl FindOperator {
    pub fn equal(value: impl Into<Value>) -> Self {
        Self::Equal(value.into())
    }

    /// Negates an operator. A plain value negates equality.
    pub fn not(operator: impl Into<FindOperator>) -> Self {
        Self::Not(Box::new(operator.into()))
    }

    pub fn less_than(value: impl Into<Value>) -> Self {
        Self::LessThan(value.into())
    }

    pub fn less_than_or_equal(value: impl Into<Value>) -> Self {
        Self::LessThanOrEqual(value.into())
    }

    pub fn more_than(value: impl Into<Value>) -> Self {
        Self::MoreThan(value.into())
    }

    pub fn more_than_or_equal(value: impl Into<Value>) -> Self {
        Self::MoreThanOrEqual(value.into())
    }

    pub fn like(pattern: impl Into<Value>) -> Self {
        Self::Like(pattern.into())
    }

    pub fn ilike(pattern: impl Into<Value>) -> Self {
        Self::ILike(pattern.into())
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::Between(from.into(), to.into())
    }

    pub fn in_<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::In(values.into_iter().map(Into::into).collect())
    }

    pub fn any<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::Any(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null() -> Self {
        Self::IsNull
    }

    pub fn array_contains<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::ArrayContains(values.into_iter().map(Into::into).collect())
    }

    pub fn array_contained_by<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::ArrayContainedBy(values.into_iter().map(Into::into).collect())
    }

    pub fn array_overlap<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::ArrayOverlap(values.into_iter().map(Into::into).collect())
    }

    pub fn json_contains(document: serde_json::Value) -> Self {
        Self::JsonContains(document)
    }

    /// SQL built from the column reference, e.g.
    /// `FindOperator::raw(|column| format!("LENGTH({column}) > 3"))`.
    pub fn raw(render: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Raw(RawSql {
            render: Arc::new(render),
            parameters: Record::new(),
        })
    }

    /// Like [`FindOperator::raw`], binding the given parameters by name.
    pub fn raw_with(
        render: impl Fn(&str) -> String + Send + Sync + 'static,
        parameters: Record,
    ) -> Self {
        Self::Raw(RawSql {
            render: Arc::new(render),
            parameters,
        })
    }

    pub fn and(operators: impl IntoIterator<Item = FindOperator>) -> Self {
        Self::And(operators.into_iter().collect())
    }

    pub fn or(operators: impl IntoIterator<Item = FindOperator>) -> Self {
        Self::Or(operators.into_iter().collect())
    }
}

impl RawSql {
    pub fn render(&self, column: &str) -> String {
        (self.render)(column)
    }
}

impl fmt::Debug for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSql")
            .field("render", &"<fn>")
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl From<Value> for FindOperator {
    fn from(src: Value) -> Self {
        Self::Equal(src)
    }
}

macro_rules! impl_from_scalar {
    ( $( $ty:ty ),* ) => {
        $(
            impl From<$ty> for FindOperator {
                fn from(src: $ty) -> Self {
                    Self::Equal(src.into())
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i32, i64, f64, &str, String);
