#[macro_use]
mod fmt;
use fmt::ToSql;

mod alias;
pub use alias::column_alias;

mod condition;
mod cte;

mod delim;
use delim::{Comma, Period};

mod dialect;

mod ident;
use ident::{ColumnRef, Ident};

mod params;
pub use params::{Params, Placeholder};

mod replacements;
use replacements::Replacements;

// Fragment serializers
mod raw;
mod statement;

use quarry_core::{
    driver::Capability,
    stmt::{QueryExpression, Record, Value},
    Registry, Result,
};

use indexmap::IndexMap;
use std::{collections::HashMap, rc::Rc};

/// Serialize a query expression to a SQL string
#[derive(Debug)]
pub struct Serializer<'a> {
    /// Metadata against which property paths are resolved
    registry: &'a Registry,

    /// The dialect flags handle the differences between SQL dialects and
    /// supported features.
    capability: Capability,

    /// Synthetic column aliases longer than this are shortened.
    max_alias_length: Option<usize>,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer<'a>,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,

    /// Placeholder numbers already handed out, by parameter name and value.
    /// Shared by nested queries, which may bind the same name to another
    /// value.
    bound: &'a mut HashMap<String, Vec<(Value, usize)>>,

    /// The query currently being serialized
    scope: Scope<'a>,
}

/// Name resolution state for one (possibly nested) query.
struct Scope<'a> {
    expr: &'a QueryExpression,

    /// Every alias visible from this query, including those of enclosing
    /// queries. Aliases without metadata map to `None`.
    aliases: IndexMap<String, Option<Rc<Replacements>>>,

    /// Parameter maps, innermost first.
    parameters: Vec<&'a Record>,

    /// Quote identifiers
    escape: bool,
}

impl<'a> Serializer<'a> {
    pub fn new(registry: &'a Registry, capability: Capability) -> Serializer<'a> {
        Serializer {
            registry,
            capability,
            max_alias_length: None,
        }
    }

    pub fn max_alias_length(mut self, max: Option<usize>) -> Self {
        self.max_alias_length = max;
        self
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The result column name under which `alias.column` is selected.
    pub fn column_alias(&self, alias: &str, column: &str) -> String {
        column_alias(alias, column, self.max_alias_length)
    }

    pub fn serialize(&self, expr: &QueryExpression, params: &mut impl Params) -> Result<String> {
        let mut ret = String::new();
        let mut bound = HashMap::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params,
            bound: &mut bound,
            scope: Scope::new(self.registry, expr, None),
        };

        fmt.statement()?;

        tracing::trace!(sql = %ret, "serialized statement");
        Ok(ret)
    }

    /// Serializes the expression, collecting its parameters in placeholder
    /// order.
    pub fn compile(&self, expr: &QueryExpression) -> Result<(String, Vec<Value>)> {
        let mut params = vec![];
        let sql = self.serialize(expr, &mut params)?;
        Ok((sql, params))
    }
}

impl<'a, T: Params> Formatter<'a, T> {
    /// A formatter for a query nested in the current one. It writes to the
    /// same buffer and shares parameter numbering.
    fn nested<'b>(&'b mut self, expr: &'b QueryExpression) -> Formatter<'b, T> {
        let scope = Scope::new(self.serializer.registry, expr, Some(&self.scope));

        Formatter {
            serializer: self.serializer,
            dst: &mut *self.dst,
            params: &mut *self.params,
            bound: &mut *self.bound,
            scope,
        }
    }

    /// Runs `body` and returns what it wrote instead of keeping it in the
    /// output.
    fn capture(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let start = self.dst.len();
        body(self)?;
        Ok(self.dst.split_off(start))
    }

    fn capability(&self) -> &Capability {
        &self.serializer.capability
    }
}

impl<'a> Scope<'a> {
    fn new(
        registry: &Registry,
        expr: &'a QueryExpression,
        parent: Option<&Scope<'a>>,
    ) -> Scope<'a> {
        let mut aliases = parent.map(|p| p.aliases.clone()).unwrap_or_default();
        let mut parameters = vec![&expr.parameters];

        if let Some(parent) = parent {
            parameters.extend(parent.parameters.iter().copied());
        }

        for alias in expr
            .aliases
            .iter()
            .chain(expr.joins.iter().map(|join| &join.alias))
        {
            let table = alias
                .entity()
                .map(|id| Rc::new(Replacements::new(registry, registry.entity(id))));
            aliases.insert(alias.name.clone(), table);
        }

        Scope {
            expr,
            aliases,
            parameters,
            escape: parent.map_or(true, |p| p.escape) && !expr.disable_escaping,
        }
    }

    fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.parameters.iter().find_map(|record| record.get(name))
    }

    /// Replacement table of an alias bound to an entity.
    fn table(&self, alias: &str) -> Option<&Rc<Replacements>> {
        self.aliases.get(alias).and_then(Option::as_ref)
    }

    fn main_table(&self) -> Option<&Rc<Replacements>> {
        self.table(self.expr.main_alias.as_deref()?)
    }
}
