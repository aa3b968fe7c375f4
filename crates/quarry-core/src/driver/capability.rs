use serde::Deserialize;

/// SQL dialects the compiler knows how to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgresql,
    Mysql,
}

/// How bound parameters are referenced from SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... A name used twice reuses its number.
    Dollar,

    /// `?1`, `?2`, ... A name used twice reuses its number.
    NumberedQuestion,

    /// `?` for every occurrence. A name used twice is bound twice.
    Question,
}

#[derive(Debug, Clone)]
pub struct Capability {
    pub dialect: Dialect,

    /// Character used to quote identifiers. The same character closes the
    /// identifier; embedded occurrences are doubled.
    pub identifier_quote: char,

    pub placeholder: PlaceholderStyle,

    /// Supports `ILIKE`. Otherwise both sides are upper-cased and compared
    /// with `LIKE`.
    pub ilike: bool,

    /// Requires `WITH RECURSIVE` when a common table expression refers to
    /// itself.
    pub cte_recursive_hint: bool,

    /// Supports `AS [NOT] MATERIALIZED` on common table expressions.
    pub cte_materialized_hint: bool,

    /// Supports INSERT, UPDATE and DELETE bodies in common table expressions.
    pub cte_writable: bool,

    /// Supports `DEFAULT` as a value in a multi-row VALUES list. When false,
    /// missing values are bound as NULL.
    pub values_default_keyword: bool,

    /// Supports the `@>`, `<@` and `&&` array operators.
    pub array_operators: bool,

    /// Wrap every where statement in parentheses before joining them.
    pub isolate_where_statements: bool,

    /// Value rendered as LIMIT when only an offset is requested. `None` when
    /// OFFSET may appear on its own.
    pub offset_only_limit: Option<&'static str>,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,
        identifier_quote: '"',
        placeholder: PlaceholderStyle::NumberedQuestion,
        ilike: false,
        cte_recursive_hint: true,
        cte_materialized_hint: false,
        cte_writable: false,
        values_default_keyword: false,
        array_operators: false,
        isolate_where_statements: false,
        offset_only_limit: Some("-1"),
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        dialect: Dialect::Postgresql,
        placeholder: PlaceholderStyle::Dollar,
        ilike: true,
        cte_materialized_hint: true,
        cte_writable: true,
        values_default_keyword: true,
        array_operators: true,
        offset_only_limit: None,
        ..Self::SQLITE
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        dialect: Dialect::Mysql,
        identifier_quote: '`',
        placeholder: PlaceholderStyle::Question,
        values_default_keyword: true,
        offset_only_limit: Some("18446744073709551615"),
        ..Self::SQLITE
    };
}

impl Dialect {
    pub fn capability(self) -> &'static Capability {
        match self {
            Dialect::Sqlite => &Capability::SQLITE,
            Dialect::Postgresql => &Capability::POSTGRESQL,
            Dialect::Mysql => &Capability::MYSQL,
        }
    }
}
