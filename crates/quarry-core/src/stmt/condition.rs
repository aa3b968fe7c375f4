/// How a where clause attaches to the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereKind {
    Simple,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct WhereClause {
    pub kind: WhereKind,
    pub condition: Condition,
}

/// A node in the where tree.
#[derive(Debug, Clone)]
pub enum Condition {
    /// SQL text written by the caller. It may reference `alias.property`
    /// paths and `:name` parameters.
    Raw(String),

    /// A clause list. Parenthesized when it holds more than one clause.
    Clauses(Vec<WhereClause>),

    /// A clause list that is always parenthesized.
    Brackets(Vec<WhereClause>),

    Not(Box<Condition>),

    And(Vec<Condition>),

    Or(Vec<Condition>),

    /// A comparison against a column.
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Vec<Operand>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    MoreThan,
    MoreThanOrEqual,
    Like,
    ILike,
    Between,
    In,
    Any,
    IsNull,
    ArrayContains,
    ArrayContainedBy,
    ArrayOverlap,
    JsonContains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A property of an alias, resolved to its column when compiled.
    Column { alias: String, path: String },

    /// A named parameter.
    Param(String),

    /// SQL text, emitted as written.
    Raw(String),
}

impl WhereClause {
    pub fn new(kind: WhereKind, condition: Condition) -> WhereClause {
        WhereClause { kind, condition }
    }

    pub fn and(condition: Condition) -> WhereClause {
        WhereClause::new(WhereKind::And, condition)
    }
}

impl Condition {
    pub fn compare(op: CompareOp, lhs: Operand, rhs: impl IntoIterator<Item = Operand>) -> Self {
        Condition::Compare {
            op,
            lhs,
            rhs: rhs.into_iter().collect(),
        }
    }

    /// An `and`-joined list of conditions.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Clauses(conditions.into_iter().map(WhereClause::and).collect())
    }

    /// An `or`-joined list of conditions.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Clauses(
            conditions
                .into_iter()
                .map(|condition| WhereClause::new(WhereKind::Or, condition))
                .collect(),
        )
    }
}

impl Operand {
    pub fn column(alias: impl Into<String>, path: impl Into<String>) -> Operand {
        Operand::Column {
            alias: alias.into(),
            path: path.into(),
        }
    }

    pub fn param(name: impl Into<String>) -> Operand {
        Operand::Param(name.into())
    }
}
