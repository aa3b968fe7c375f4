use super::{ColumnRef, Comma, Formatter, Ident, Params, Period, ToSql};

use quarry_core::{
    driver::Dialect,
    schema::{ColumnId, ColumnMetadata, EntityMetadata, Registry, TablePath},
    stmt::{
        junction_alias, record_path, Alias, AliasSource, Join, JoinDirection, Nulls, Order,
        QueryExpression, QueryKind, Record, Value,
    },
    Error, Result,
};

impl<T: Params> Formatter<'_, T> {
    pub(super) fn statement(&mut self) -> Result<()> {
        self.ctes()?;

        match self.scope.expr.kind {
            QueryKind::Select => self.select(),
            QueryKind::Insert => self.insert(),
            QueryKind::Update => self.update(),
            QueryKind::Delete => self.delete(),
            QueryKind::SoftDelete | QueryKind::Restore => self.soft_delete(),
        }
    }

    fn select(&mut self) -> Result<()> {
        let expr = self.scope.expr;

        self.dst.push_str("SELECT ");

        if expr.distinct {
            self.dst.push_str("DISTINCT ");
        }

        self.select_list()?;

        if expr.aliases.is_empty() {
            return Err(Error::missing_main_alias());
        }

        self.dst.push_str(" FROM ");
        for (index, alias) in expr.aliases.iter().enumerate() {
            if index > 0 {
                self.dst.push_str(", ");
            }
            self.source(alias)?;
        }

        for join in &expr.joins {
            self.join(join)?;
        }

        self.where_expression()?;

        if !expr.group_bys.is_empty() {
            self.dst.push_str(" GROUP BY ");
            for (index, group_by) in expr.group_bys.iter().enumerate() {
                if index > 0 {
                    self.dst.push_str(", ");
                }
                self.raw(group_by)?;
            }
        }

        if !expr.havings.is_empty() {
            self.dst.push_str(" HAVING ");
            self.where_clauses(&expr.havings)?;
        }

        if !expr.order_bys.is_empty() {
            self.dst.push_str(" ORDER BY ");
            for (index, order_by) in expr.order_bys.iter().enumerate() {
                if index > 0 {
                    self.dst.push_str(", ");
                }
                self.raw(&order_by.expr)?;

                match order_by.order {
                    Order::Asc => self.dst.push_str(" ASC"),
                    Order::Desc => self.dst.push_str(" DESC"),
                }

                match order_by.nulls {
                    Some(Nulls::First) => self.dst.push_str(" NULLS FIRST"),
                    Some(Nulls::Last) => self.dst.push_str(" NULLS LAST"),
                    None => {}
                }
            }
        }

        self.limit_offset();
        Ok(())
    }

    /// Renders the selected columns. A selected alias contributes all of its
    /// columns, a selected property contributes its column plus the primary
    /// columns needed to group rows.
    fn select_list(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let registry = self.serializer.registry;
        let mut s = "";

        for alias in all_aliases(expr) {
            let Some(entity) = alias.entity() else {
                if expr.is_alias_selected(&alias.name) {
                    fmt!(self, s, Ident(&alias.name), ".*");
                    s = ", ";
                }
                continue;
            };

            let metadata = registry.entity(entity);
            let whole = expr.is_alias_selected(&alias.name);

            let mut columns: Vec<&ColumnMetadata> = metadata
                .columns
                .iter()
                .filter(|column| {
                    whole || expr.is_property_selected(&alias.name, &column.property_path)
                })
                .collect();

            if columns.is_empty() {
                continue;
            }

            for primary in metadata.primary_columns() {
                if !columns.iter().any(|column| column.id == primary.id) {
                    columns.push(primary);
                }
            }

            for column in columns {
                let column_alias = self
                    .serializer
                    .column_alias(&alias.name, &column.database_name);

                fmt!(
                    self,
                    s,
                    ColumnRef { alias: Some(alias.name.as_str()), column: &column.database_name },
                    " AS ",
                    Ident(&column_alias),
                );
                s = ", ";
            }
        }

        for item in &expr.selects {
            if item.alias.is_none() && is_column_selection(registry, expr, &item.selection) {
                continue;
            }

            self.dst.push_str(s);
            self.raw(&item.selection)?;

            if let Some(alias) = &item.alias {
                fmt!(self, " AS ", Ident(alias));
            }

            s = ", ";
        }

        if s.is_empty() {
            self.dst.push('*');
        }

        Ok(())
    }

    /// Renders a FROM or JOIN source with its alias.
    fn source(&mut self, alias: &Alias) -> Result<()> {
        match &alias.source {
            AliasSource::Entity(id) => {
                let table = &self.serializer.registry.entity(*id).table;
                fmt!(self, table);
            }
            AliasSource::Table(path) => fmt!(self, path),
            AliasSource::SubQuery(query) => {
                self.dst.push('(');
                self.nested(query).statement()?;
                self.dst.push(')');
            }
        }

        fmt!(self, " ", Ident(&alias.name));
        Ok(())
    }

    fn join(&mut self, join: &Join) -> Result<()> {
        let registry = self.serializer.registry;
        let keyword = match join.direction {
            JoinDirection::Inner => " INNER JOIN ",
            JoinDirection::Left => " LEFT JOIN ",
        };
        let alias = join.alias.name.as_str();

        let Some(relation) = join.relation.map(|id| registry.relation(id)) else {
            let condition = join.condition.as_ref().ok_or_else(|| {
                Error::invalid_statement(format!("join `{alias}` requires a condition"))
            })?;

            self.dst.push_str(keyword);
            self.source(&join.alias)?;
            self.dst.push_str(" ON ");
            self.condition(condition)?;
            return self.join_soft_delete(join);
        };

        let parent = join.parent_alias.as_deref().ok_or_else(|| {
            Error::invalid_statement(format!("relation join `{alias}` has no parent alias"))
        })?;

        if relation.is_many_to_many() {
            let junction = registry.junction(relation).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "relation `{}` has no junction table",
                    relation.property_path
                ))
            })?;
            let junction_alias = junction_alias(parent, alias, relation.owning);

            fmt!(self, keyword, &junction.table, " ", Ident(&junction_alias), " ON ");
            self.key_pairs(&relation.join_columns, &junction_alias, parent, true)?;

            self.dst.push_str(keyword);
            self.source(&join.alias)?;
            self.dst.push_str(" ON ");
            self.key_pairs(&relation.inverse_join_columns, &junction_alias, alias, true)?;
        } else if relation.is_owning_to_one() {
            self.dst.push_str(keyword);
            self.source(&join.alias)?;
            self.dst.push_str(" ON ");
            self.key_pairs(&relation.join_columns, parent, alias, false)?;
        } else {
            let inverse = registry.inverse(relation).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "relation `{}` has no inverse side",
                    relation.property_path
                ))
            })?;

            self.dst.push_str(keyword);
            self.source(&join.alias)?;
            self.dst.push_str(" ON ");
            self.key_pairs(&inverse.join_columns, alias, parent, true)?;
        }

        if let Some(condition) = &join.condition {
            self.dst.push_str(" AND (");
            self.condition(condition)?;
            self.dst.push(')');
        }

        self.join_soft_delete(join)
    }

    /// Renders `a=b` for every join column and the column it references,
    /// joined by `AND`. The referenced side comes first unless
    /// `column_first` is set.
    fn key_pairs(
        &mut self,
        columns: &[ColumnId],
        column_alias: &str,
        referenced_alias: &str,
        column_first: bool,
    ) -> Result<()> {
        let registry = self.serializer.registry;

        for (index, id) in columns.iter().enumerate() {
            let column = registry.column(*id);
            let referenced = registry.referenced_column(column).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "join column `{}` does not reference a column",
                    column.database_name
                ))
            })?;

            let own = ColumnRef {
                alias: Some(column_alias),
                column: &column.database_name,
            };
            let other = ColumnRef {
                alias: Some(referenced_alias),
                column: &referenced.database_name,
            };

            if index > 0 {
                self.dst.push_str(" AND ");
            }

            if column_first {
                fmt!(self, own, "=", other);
            } else {
                fmt!(self, other, "=", own);
            }
        }

        Ok(())
    }

    fn join_soft_delete(&mut self, join: &Join) -> Result<()> {
        if self.scope.expr.with_deleted {
            return Ok(());
        }

        let Some(entity) = join.alias.entity() else {
            return Ok(());
        };

        if let Some(column) = self.serializer.registry.entity(entity).delete_date_column() {
            fmt!(
                self,
                " AND ",
                ColumnRef { alias: Some(join.alias.name.as_str()), column: &column.database_name },
                " IS NULL",
            );
        }

        Ok(())
    }

    fn limit_offset(&mut self) {
        let expr = self.scope.expr;

        let limit = match (expr.limit, expr.offset) {
            (Some(limit), _) => Some(limit.to_string()),
            (None, Some(_)) => self.capability().offset_only_limit.map(str::to_string),
            (None, None) => None,
        };

        if let Some(limit) = limit {
            self.dst.push_str(" LIMIT ");
            self.dst.push_str(&limit);
        }

        if let Some(offset) = expr.offset {
            self.dst.push_str(" OFFSET ");
            self.dst.push_str(&offset.to_string());
        }
    }

    fn insert(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let registry = self.serializer.registry;
        let metadata = registry.entity(expr.main_entity()?);

        if expr.values.is_empty() {
            return Err(Error::insert_values_missing());
        }

        let columns: Vec<&ColumnMetadata> = metadata
            .columns
            .iter()
            .filter(|column| !column.is_generated_increment())
            .collect();

        fmt!(self, "INSERT INTO ", &metadata.table);

        if columns.is_empty() {
            if self.capability().dialect == Dialect::Mysql {
                self.dst.push_str("() VALUES ");
                fmt!(self, Comma(expr.values.iter().map(|_| "()")));
            } else {
                self.dst.push_str(" DEFAULT VALUES");
            }
            return Ok(());
        }

        fmt!(
            self,
            "(",
            Comma(columns.iter().map(|column| Ident(&column.database_name))),
            ") VALUES ",
        );

        for (row_index, row) in expr.values.iter().enumerate() {
            if row_index > 0 {
                self.dst.push_str(", ");
            }

            self.dst.push('(');

            for (index, column) in columns.iter().enumerate() {
                if index > 0 {
                    self.dst.push_str(", ");
                }

                if column.is_discriminator {
                    if let Some(value) = &metadata.discriminator_value {
                        self.bind(&Value::from(value.as_str()))?;
                        continue;
                    }
                }

                match column_value(registry, metadata, column, row) {
                    Some(Value::Null) => self.dst.push_str("NULL"),
                    Some(value) => self.bind(&to_db(column, value)?)?,
                    None if self.capability().values_default_keyword => {
                        self.dst.push_str("DEFAULT")
                    }
                    None => self.dst.push_str("NULL"),
                }
            }

            self.dst.push(')');
        }

        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let registry = self.serializer.registry;
        let metadata = registry.entity(expr.main_entity()?);

        let values = expr
            .values
            .first()
            .filter(|values| !values.is_empty())
            .ok_or_else(Error::update_values_missing)?;

        for key in values.keys() {
            check_assignable(metadata, key)?;
        }

        let assignments: Vec<(&ColumnMetadata, Value)> = metadata
            .columns
            .iter()
            .filter_map(|column| {
                column_value(registry, metadata, column, values).map(|value| (column, value))
            })
            .collect();

        if assignments.is_empty() {
            return Err(Error::update_values_missing());
        }

        fmt!(self, "UPDATE ", &metadata.table, " SET ");

        for (index, (column, value)) in assignments.into_iter().enumerate() {
            if index > 0 {
                self.dst.push_str(", ");
            }

            fmt!(self, Ident(&column.database_name), " = ");

            match value {
                Value::Null => self.dst.push_str("NULL"),
                value => self.bind(&to_db(column, value)?)?,
            }
        }

        self.where_expression()
    }

    fn delete(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let metadata = self.serializer.registry.entity(expr.main_entity()?);

        fmt!(self, "DELETE FROM ", &metadata.table);
        self.where_expression()
    }

    fn soft_delete(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let metadata = self.serializer.registry.entity(expr.main_entity()?);

        let column = metadata
            .delete_date_column()
            .ok_or_else(|| Error::missing_delete_date_column(&metadata.name))?;

        let value = match expr.kind {
            QueryKind::Restore => "NULL",
            _ => "CURRENT_TIMESTAMP",
        };

        fmt!(
            self,
            "UPDATE ",
            &metadata.table,
            " SET ",
            Ident(&column.database_name),
            " = ",
            value,
        );

        self.where_expression()
    }
}

impl ToSql for &TablePath {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        fmt!(f, Period(self.segments().map(Ident)));
        Ok(())
    }
}

fn all_aliases(expr: &QueryExpression) -> impl Iterator<Item = &Alias> + '_ {
    expr.aliases
        .iter()
        .chain(expr.joins.iter().map(|join| &join.alias))
}

/// Returns `true` if the selection names an alias or a column of an entity
/// alias; those are rendered as aliased columns.
fn is_column_selection(registry: &Registry, expr: &QueryExpression, selection: &str) -> bool {
    if all_aliases(expr).any(|alias| alias.name == selection) {
        return true;
    }

    let Some((alias, path)) = selection.split_once('.') else {
        return false;
    };

    all_aliases(expr)
        .find(|candidate| candidate.name == alias)
        .and_then(Alias::entity)
        .is_some_and(|entity| registry.entity(entity).column_by_property_path(path).is_some())
}

/// The value a record assigns to a column: the property itself, or for a
/// join column the key of the related entity. A null relation nulls its
/// join columns.
fn column_value(
    registry: &Registry,
    metadata: &EntityMetadata,
    column: &ColumnMetadata,
    record: &Record,
) -> Option<Value> {
    if let Some(value) = record_path(record, &column.property_path) {
        return Some(value.clone());
    }

    let relation = metadata.relations.get(column.relation?)?;

    match record_path(record, &relation.property_path)? {
        Value::Null => Some(Value::Null),
        Value::Entity(related) => {
            let referenced = registry.referenced_column(column)?;
            related.get_path(&referenced.property_path).cloned()
        }
        Value::Record(related) => {
            let referenced = registry.referenced_column(column)?;
            record_path(related, &referenced.property_path).cloned()
        }
        // A bare key is accepted for single column keys
        scalar if relation.join_columns.len() == 1 => Some(scalar.clone()),
        _ => None,
    }
}

fn check_assignable(metadata: &EntityMetadata, property: &str) -> Result<()> {
    if metadata.column_by_property_path(property).is_some()
        || metadata.embedded_by_property_path(property).is_some()
    {
        return Ok(());
    }

    match metadata.relation_by_property_path(property) {
        Some(relation) if relation.is_owning_to_one() => Ok(()),
        Some(_) => Err(Error::invalid_statement(format!(
            "relation `{property}` of `{}` does not hold a foreign key and cannot be updated",
            metadata.name
        ))),
        None => Err(Error::property_not_found(&metadata.name, property)),
    }
}

fn to_db(column: &ColumnMetadata, value: Value) -> Result<Value> {
    match &column.transformer {
        Some(transformer) => transformer.to_db(value),
        None => Ok(value),
    }
}
