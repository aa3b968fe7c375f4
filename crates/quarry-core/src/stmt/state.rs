use super::{
    record_path, Alias, AliasSource, Brackets, CompareOp, Condition, FindOperator, FindWhere,
    Operand, QueryExpression, QueryKind, Value, WhereClause, WhereInput, WhereKind, WhereValue,
};
use crate::{
    schema::{ColumnMetadata, EntityMetadata, RelationMetadata},
    Error, Registry, Result,
};

/// Generates the where and parameter methods shared by every builder that
/// filters rows. The builder must hold its `State` in a `state` field.
macro_rules! where_methods {
    ($builder:ident) => {
        impl<'a> $builder<'a> {
            /// Replaces the where clauses with `input`.
            pub fn where_(mut self, input: impl Into<$crate::stmt::WhereInput>) -> Self {
                self.state
                    .push_where($crate::stmt::WhereKind::Simple, input.into());
                self
            }

            pub fn and_where(mut self, input: impl Into<$crate::stmt::WhereInput>) -> Self {
                self.state.push_where($crate::stmt::WhereKind::And, input.into());
                self
            }

            pub fn or_where(mut self, input: impl Into<$crate::stmt::WhereInput>) -> Self {
                self.state.push_where($crate::stmt::WhereKind::Or, input.into());
                self
            }

            /// Replaces the where clauses with a match on primary keys.
            ///
            /// Each id is either a scalar, for single-column keys, or a
            /// record holding every primary property.
            pub fn where_in_ids<I>(mut self, ids: I) -> Self
            where
                I: IntoIterator,
                I::Item: Into<$crate::stmt::Value>,
            {
                let ids = ids.into_iter().map(Into::into).collect();
                self.state
                    .push_where_in_ids($crate::stmt::WhereKind::Simple, ids);
                self
            }

            pub fn and_where_in_ids<I>(mut self, ids: I) -> Self
            where
                I: IntoIterator,
                I::Item: Into<$crate::stmt::Value>,
            {
                let ids = ids.into_iter().map(Into::into).collect();
                self.state.push_where_in_ids($crate::stmt::WhereKind::And, ids);
                self
            }

            pub fn or_where_in_ids<I>(mut self, ids: I) -> Self
            where
                I: IntoIterator,
                I::Item: Into<$crate::stmt::Value>,
            {
                let ids = ids.into_iter().map(Into::into).collect();
                self.state.push_where_in_ids($crate::stmt::WhereKind::Or, ids);
                self
            }

            pub fn set_parameter(
                mut self,
                name: impl Into<String>,
                value: impl Into<$crate::stmt::Value>,
            ) -> Self {
                self.state.set_parameter(name.into(), value.into());
                self
            }

            pub fn set_parameters(mut self, parameters: $crate::stmt::Record) -> Self {
                for (name, value) in parameters {
                    self.state.set_parameter(name, value);
                }
                self
            }

            /// Finishes the builder, returning the first error any step
            /// recorded.
            pub fn build(self) -> $crate::Result<$crate::stmt::QueryExpression> {
                self.state.finish()
            }
        }
    };
}

/// Mutable state shared by the builders.
///
/// Builder methods never fail on their own: the first error is recorded and
/// returned by `build`, and later steps are skipped.
#[derive(Debug)]
pub(crate) struct State<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) expr: QueryExpression,

    /// Suffix of the next generated parameter name
    counter: usize,

    error: Option<Error>,
}

impl<'a> State<'a> {
    pub(crate) fn new(registry: &'a Registry, kind: QueryKind) -> State<'a> {
        State {
            registry,
            expr: QueryExpression::new(kind),
            counter: 0,
            error: None,
        }
    }

    /// Runs a fallible step unless an earlier one failed.
    pub(crate) fn attempt(&mut self, step: impl FnOnce(&mut Self) -> Result<()>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = step(self) {
            self.error = Some(err);
        }
    }

    pub(crate) fn finish(self) -> Result<QueryExpression> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.expr),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<QueryExpression> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.expr.clone()),
        }
    }

    /// Binds the main alias to an entity resolved by name.
    pub(crate) fn set_main_entity(&mut self, entity: &str, alias: Option<&str>) {
        self.attempt(|state| {
            let metadata = state.registry.resolve(entity)?;
            let name = alias.unwrap_or(&metadata.name).to_string();
            state.set_main_alias(Alias::new(name, AliasSource::Entity(metadata.id)))
        });
    }

    pub(crate) fn set_main_alias(&mut self, alias: Alias) -> Result<()> {
        self.check_alias_free(&alias.name)?;
        if let AliasSource::SubQuery(subquery) = &alias.source {
            self.merge_parameters(subquery)?;
        }
        self.expr.main_alias = Some(alias.name.clone());
        self.expr.aliases.insert(0, alias);
        Ok(())
    }

    pub(crate) fn check_alias_free(&self, name: &str) -> Result<()> {
        if self.expr.find_alias(name).is_some() {
            return Err(Error::invalid_statement(format!(
                "alias `{name}` is already in use"
            )));
        }
        Ok(())
    }

    /// Pulls the parameters of a nested query into this one.
    ///
    /// The nested query resolves its own names first, so a generated name
    /// already taken here is re-registered under a fresh one. A caller-chosen
    /// name may only be shared when both sides agree on the value.
    pub(crate) fn merge_parameters(&mut self, other: &QueryExpression) -> Result<()> {
        for (name, value) in &other.parameters {
            if let Some(index) = generated_index(name) {
                self.counter = self.counter.max(index + 1);
            }

            match self.expr.parameters.get(name) {
                None => self.insert_parameter(name.clone(), value.clone())?,
                Some(existing) if existing == value => {}
                Some(_) if generated_index(name).is_some() => {
                    self.create_parameter(value.clone());
                }
                Some(_) => {
                    return Err(Error::invalid_statement(format!(
                        "parameter `{name}` is bound to different values in nested queries"
                    )))
                }
            }
        }
        Ok(())
    }

    pub(crate) fn set_parameter(&mut self, name: String, value: Value) {
        self.attempt(|state| state.insert_parameter(name, value));
    }

    fn insert_parameter(&mut self, name: String, value: Value) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

        if !valid {
            return Err(Error::invalid_statement(format!(
                "parameter name `{name}` may only contain letters, digits, underscores and periods"
            )));
        }

        self.expr.parameters.insert(name, value);
        Ok(())
    }

    /// Registers a value under a generated name, skipping names the caller
    /// already uses.
    pub(crate) fn create_parameter(&mut self, value: Value) -> String {
        loop {
            let name = format!("param_{}", self.counter);
            self.counter += 1;

            if !self.expr.parameters.contains_key(&name) {
                self.expr.parameters.insert(name.clone(), value);
                return name;
            }
        }
    }

    pub(crate) fn push_where(&mut self, kind: WhereKind, input: WhereInput) {
        self.attempt(|state| {
            let condition = state.where_condition(input)?;
            state.push_clause(kind, condition);
            Ok(())
        });
    }

    pub(crate) fn push_where_in_ids(&mut self, kind: WhereKind, ids: Vec<Value>) {
        self.attempt(|state| {
            let input = state.where_in_ids_input(ids)?;
            let condition = state.where_condition(input)?;
            state.push_clause(kind, condition);
            Ok(())
        });
    }

    fn push_clause(&mut self, kind: WhereKind, condition: Condition) {
        if kind == WhereKind::Simple {
            self.expr.wheres.clear();
        }
        self.expr.wheres.push(WhereClause::new(kind, condition));
    }

    pub(crate) fn where_condition(&mut self, input: WhereInput) -> Result<Condition> {
        match input {
            WhereInput::Raw(sql) => Ok(Condition::Raw(sql)),
            WhereInput::Object(object) => self.object_condition(&object),
            WhereInput::Objects(objects) => {
                let mut clauses = vec![];
                for object in &objects {
                    let condition = self.object_condition(object)?;
                    clauses.push(WhereClause::new(WhereKind::Or, condition));
                }

                // A single object renders as if it had been passed alone
                if clauses.len() == 1 {
                    return Ok(clauses.remove(0).condition);
                }

                Ok(Condition::Clauses(clauses))
            }
            WhereInput::Brackets(brackets) => self.brackets_condition(brackets),
        }
    }

    fn brackets_condition(&mut self, brackets: Brackets) -> Result<Condition> {
        let mut clauses = vec![];

        for (kind, input) in brackets.clauses {
            let condition = self.where_condition(input)?;
            if kind == WhereKind::Simple {
                clauses.clear();
            }
            clauses.push(WhereClause::new(kind, condition));
        }

        let condition = Condition::Brackets(clauses);

        if brackets.negated {
            Ok(Condition::Not(Box::new(condition)))
        } else {
            Ok(condition)
        }
    }

    fn object_condition(&mut self, object: &FindWhere) -> Result<Condition> {
        let alias = self.expr.main_alias()?.clone();
        let mut conditions = vec![];

        match alias.entity() {
            Some(entity) => {
                let metadata = self.registry.entity(entity);
                self.expand_object(&alias.name, metadata, "", object, &mut conditions)?;
            }
            None => {
                for (key, value) in object.iter() {
                    let condition = self.predicate(&alias.name, key, None, value)?;
                    conditions.push(condition);
                }
            }
        }

        Ok(Condition::all(conditions))
    }

    /// Walks a where object against the entity's property paths, collecting
    /// `and`-combined predicates.
    fn expand_object(
        &mut self,
        alias: &str,
        metadata: &'a EntityMetadata,
        prefix: &str,
        object: &FindWhere,
        out: &mut Vec<Condition>,
    ) -> Result<()> {
        for (key, value) in object.iter() {
            let path = join_path(prefix, key);

            if let Some(column) = metadata.column_by_property_path(&path) {
                out.push(self.predicate(alias, &path, Some(column), value)?);
                continue;
            }

            if metadata.embedded_by_property_path(&path).is_some() {
                let WhereValue::Object(nested) = value else {
                    return Err(Error::invalid_statement(format!(
                        "embedded property `{path}` of `{}` must be filtered with an object",
                        metadata.name
                    )));
                };
                self.expand_object(alias, metadata, &path, nested, out)?;
                continue;
            }

            if let Some(relation) = metadata.relation_by_property_path(&path) {
                self.relation_predicate(alias, metadata, relation, value, out)?;
                continue;
            }

            return Err(Error::property_not_found(&metadata.name, path));
        }

        Ok(())
    }

    fn relation_predicate(
        &mut self,
        alias: &str,
        metadata: &EntityMetadata,
        relation: &'a RelationMetadata,
        value: &WhereValue,
        out: &mut Vec<Condition>,
    ) -> Result<()> {
        let registry = self.registry;

        if !relation.is_owning_to_one() {
            return Err(Error::invalid_statement(format!(
                "`{}.{}` cannot be used in a where object; only relations holding a foreign key can",
                metadata.name, relation.property_path
            )));
        }

        let join_columns = registry.owning_join_columns(relation);

        let missing_key = || {
            Error::invalid_statement(format!(
                "filtering by `{}.{}` requires every key property of the related entity",
                metadata.name, relation.property_path
            ))
        };

        match value {
            WhereValue::Value(Value::Null) | WhereValue::Operator(FindOperator::IsNull) => {
                for column in join_columns {
                    out.push(Condition::compare(
                        CompareOp::IsNull,
                        Operand::column(alias, &column.property_path),
                        [],
                    ));
                }
            }
            WhereValue::Object(nested) => {
                if nested.iter().count() > join_columns.len() {
                    return Err(Error::invalid_statement(format!(
                        "only key properties of `{}.{}` can be used in a where object",
                        metadata.name, relation.property_path
                    )));
                }

                for &column in &join_columns {
                    let referenced = registry.referenced_column(column).ok_or_else(missing_key)?;
                    let key_value = nested_value(nested, &referenced.property_path)
                        .ok_or_else(missing_key)?;
                    let condition =
                        self.predicate(alias, &column.property_path, Some(column), key_value)?;
                    out.push(condition);
                }
            }
            WhereValue::Value(related @ (Value::Entity(_) | Value::Record(_))) => {
                for &column in &join_columns {
                    let referenced = registry.referenced_column(column).ok_or_else(missing_key)?;
                    let key_value = match related {
                        Value::Entity(entity) => entity.get_path(&referenced.property_path),
                        Value::Record(record) => record_path(record, &referenced.property_path),
                        _ => None,
                    }
                    .ok_or_else(missing_key)?;

                    let condition = self.predicate(
                        alias,
                        &column.property_path,
                        Some(column),
                        &WhereValue::Value(key_value.clone()),
                    )?;
                    out.push(condition);
                }
            }
            _ if join_columns.len() == 1 => {
                let column = join_columns[0];
                out.push(self.predicate(alias, &column.property_path, Some(column), value)?);
            }
            _ => {
                return Err(Error::ambiguous_primary_key(
                    &registry.entity(relation.target).name,
                    join_columns.len(),
                ))
            }
        }

        Ok(())
    }

    fn predicate(
        &mut self,
        alias: &str,
        path: &str,
        column: Option<&ColumnMetadata>,
        value: &WhereValue,
    ) -> Result<Condition> {
        let lhs = Operand::column(alias, path);

        match value {
            WhereValue::Value(value) => {
                self.operator_condition(lhs, column, &FindOperator::Equal(value.clone()))
            }
            WhereValue::Operator(operator) => self.operator_condition(lhs, column, operator),
            WhereValue::Object(_) => Err(Error::invalid_statement(format!(
                "`{alias}.{path}` holds a single value and cannot be filtered with an object"
            ))),
        }
    }

    fn operator_condition(
        &mut self,
        lhs: Operand,
        column: Option<&ColumnMetadata>,
        operator: &FindOperator,
    ) -> Result<Condition> {
        use FindOperator::*;

        let compare = |op, state: &mut Self, value: &Value| -> Result<Condition> {
            let param = state.bind(column, value)?;
            Ok(Condition::compare(op, lhs.clone(), [param]))
        };

        Ok(match operator {
            Equal(Value::Null) | IsNull => Condition::compare(CompareOp::IsNull, lhs, []),
            Equal(value) => compare(CompareOp::Equal, self, value)?,
            Not(inner) => match &**inner {
                Equal(Value::Null) => Condition::Not(Box::new(Condition::compare(
                    CompareOp::IsNull,
                    lhs,
                    [],
                ))),
                Equal(value) => compare(CompareOp::NotEqual, self, value)?,
                inner => Condition::Not(Box::new(self.operator_condition(lhs, column, inner)?)),
            },
            LessThan(value) => compare(CompareOp::LessThan, self, value)?,
            LessThanOrEqual(value) => compare(CompareOp::LessThanOrEqual, self, value)?,
            MoreThan(value) => compare(CompareOp::MoreThan, self, value)?,
            MoreThanOrEqual(value) => compare(CompareOp::MoreThanOrEqual, self, value)?,
            Like(value) => compare(CompareOp::Like, self, value)?,
            ILike(value) => compare(CompareOp::ILike, self, value)?,
            Between(from, to) => {
                let from = self.bind(column, from)?;
                let to = self.bind(column, to)?;
                Condition::compare(CompareOp::Between, lhs, [from, to])
            }
            In(values) => {
                let mut params = vec![];
                for value in values {
                    params.push(self.bind(column, value)?);
                }
                Condition::compare(CompareOp::In, lhs, params)
            }
            Any(values) => {
                let mut items = vec![];
                for value in values {
                    items.push(to_db(column, value)?);
                }
                let param = Operand::param(self.create_parameter(Value::List(items)));
                Condition::compare(CompareOp::Any, lhs, [param])
            }
            ArrayContains(values) | ArrayContainedBy(values) | ArrayOverlap(values) => {
                let op = match operator {
                    ArrayContains(_) => CompareOp::ArrayContains,
                    ArrayContainedBy(_) => CompareOp::ArrayContainedBy,
                    _ => CompareOp::ArrayOverlap,
                };
                let param = Operand::param(self.create_parameter(Value::List(values.clone())));
                Condition::compare(op, lhs, [param])
            }
            JsonContains(document) => {
                let param = Operand::param(self.create_parameter(Value::Json(document.clone())));
                Condition::compare(CompareOp::JsonContains, lhs, [param])
            }
            Raw(raw) => {
                for (name, value) in &raw.parameters {
                    self.insert_parameter(name.clone(), value.clone())?;
                }
                let Operand::Column { alias, path } = &lhs else {
                    return Err(Error::invalid_statement("raw operators apply to columns"));
                };
                Condition::Raw(raw.render(&format!("{alias}.{path}")))
            }
            And(operators) => {
                let mut conditions = vec![];
                for operator in operators {
                    conditions.push(self.operator_condition(lhs.clone(), column, operator)?);
                }
                Condition::And(conditions)
            }
            Or(operators) => {
                let mut conditions = vec![];
                for operator in operators {
                    conditions.push(self.operator_condition(lhs.clone(), column, operator)?);
                }
                Condition::Or(conditions)
            }
        })
    }

    fn bind(&mut self, column: Option<&ColumnMetadata>, value: &Value) -> Result<Operand> {
        let value = to_db(column, value)?;
        Ok(Operand::param(self.create_parameter(value)))
    }

    fn where_in_ids_input(&self, ids: Vec<Value>) -> Result<WhereInput> {
        let metadata = self.registry.entity(self.expr.main_entity()?);
        let primary: Vec<_> = metadata.primary_columns().collect();

        if let [column] = primary[..] {
            if column.transformer.is_none() {
                let mut values = vec![];
                for id in &ids {
                    values.push(id_component(metadata, column, id)?);
                }
                return Ok(FindWhere::new()
                    .field(&column.property_path, FindOperator::In(values))
                    .into());
            }
        }

        let mut brackets = Brackets::new();
        for id in &ids {
            let mut object = FindWhere::new();
            for column in &primary {
                let value = match id {
                    Value::Record(_) | Value::Entity(_) => id_component(metadata, column, id)?,
                    _ if primary.len() == 1 => id.clone(),
                    _ => return Err(Error::ambiguous_primary_key(&metadata.name, primary.len())),
                };
                object = object.field(&column.property_path, value);
            }
            brackets = brackets.or_where(Brackets::new().where_(object));
        }

        Ok(brackets.into())
    }
}

/// Extracts one primary column's value from an id given as a scalar or a
/// record.
fn id_component(metadata: &EntityMetadata, column: &ColumnMetadata, id: &Value) -> Result<Value> {
    let found = match id {
        Value::Record(record) => record_path(record, &column.property_path),
        Value::Entity(entity) => entity.get_path(&column.property_path),
        _ if metadata.primary_columns.len() == 1 => return Ok(id.clone()),
        _ => {
            return Err(Error::ambiguous_primary_key(
                &metadata.name,
                metadata.primary_columns.len(),
            ))
        }
    };

    found.cloned().ok_or_else(|| {
        Error::invalid_statement(format!(
            "id for `{}` is missing primary property `{}`",
            metadata.name, column.property_path
        ))
    })
}

fn to_db(column: Option<&ColumnMetadata>, value: &Value) -> Result<Value> {
    match column.and_then(|column| column.transformer.as_ref()) {
        Some(transformer) => transformer.to_db(value.clone()),
        None => Ok(value.clone()),
    }
}

/// Looks up a dotted path in a where object, descending through nested
/// objects.
fn nested_value<'w>(object: &'w FindWhere, path: &str) -> Option<&'w WhereValue> {
    if let Some(value) = object.get(path) {
        return Some(value);
    }

    let (head, rest) = path.split_once('.')?;
    match object.get(head)? {
        WhereValue::Object(nested) => nested_value(nested, rest),
        _ => None,
    }
}

/// Suffix of a name produced by `create_parameter`.
fn generated_index(name: &str) -> Option<usize> {
    name.strip_prefix("param_")?.parse().ok()
}

pub(crate) fn join_path(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else {
        format!("{prefix}.{property}")
    }
}
