use super::QueryExpression;

/// A common table expression prepended to a statement.
#[derive(Debug, Clone)]
pub struct Cte {
    pub name: String,
    pub body: CteBody,

    /// Explicit column names. When empty the body's names are used.
    pub columns: Vec<String>,

    pub recursive: bool,

    /// `Some(true)` renders `AS MATERIALIZED`, `Some(false)` renders
    /// `AS NOT MATERIALIZED`.
    pub materialized: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum CteBody {
    Raw(String),
    Query(Box<QueryExpression>),
}

impl Cte {
    pub fn new(name: impl Into<String>, body: impl Into<CteBody>) -> Cte {
        Cte {
            name: name.into(),
            body: body.into(),
            columns: vec![],
            recursive: false,
            materialized: None,
        }
    }

    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn materialized(mut self, materialized: bool) -> Self {
        self.materialized = Some(materialized);
        self
    }
}

impl From<&str> for CteBody {
    fn from(src: &str) -> CteBody {
        CteBody::Raw(src.to_string())
    }
}

impl From<String> for CteBody {
    fn from(src: String) -> CteBody {
        CteBody::Raw(src)
    }
}

impl From<QueryExpression> for CteBody {
    fn from(src: QueryExpression) -> CteBody {
        CteBody::Query(Box::new(src))
    }
}
