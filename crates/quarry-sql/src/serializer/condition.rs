use super::{ColumnRef, Formatter, Params, ToSql};

use quarry_core::{
    driver::Dialect,
    stmt::{CompareOp, Condition, Operand, QueryKind, Value, WhereClause, WhereKind},
    Error, Result,
};

impl<T: Params> Formatter<'_, T> {
    /// Renders a where list: each clause after the first is prefixed with
    /// its connective.
    pub(super) fn where_clauses(&mut self, clauses: &[WhereClause]) -> Result<()> {
        let isolate = self.capability().isolate_where_statements;

        for (index, clause) in clauses.iter().enumerate() {
            if index > 0 {
                match clause.kind {
                    WhereKind::And => self.dst.push_str(" AND "),
                    WhereKind::Or => self.dst.push_str(" OR "),
                    WhereKind::Simple => self.dst.push(' '),
                }
            }

            if isolate {
                self.dst.push('(');
                self.condition(&clause.condition)?;
                self.dst.push(')');
            } else if clauses.len() > 1 {
                self.grouped(&clause.condition)?;
            } else {
                self.condition(&clause.condition)?;
            }
        }

        Ok(())
    }

    /// Renders a condition that sits next to a connective, wrapping `and` /
    /// `or` composites so they keep their precedence.
    fn grouped(&mut self, condition: &Condition) -> Result<()> {
        match condition {
            Condition::And(conditions) | Condition::Or(conditions) if conditions.len() > 1 => {
                self.dst.push('(');
                self.condition(condition)?;
                self.dst.push(')');
            }
            Condition::Clauses(clauses)
                if clauses.len() == 1 && !self.capability().isolate_where_statements =>
            {
                self.grouped(&clauses[0].condition)?;
            }
            _ => self.condition(condition)?,
        }

        Ok(())
    }

    pub(super) fn condition(&mut self, condition: &Condition) -> Result<()> {
        match condition {
            Condition::Raw(sql) => self.raw(sql)?,
            Condition::Clauses(clauses) | Condition::Brackets(clauses) => {
                let wrap = matches!(condition, Condition::Brackets(_)) || clauses.len() > 1;

                if clauses.is_empty() {
                    self.dst.push_str("1=1");
                } else if wrap {
                    self.dst.push('(');
                    self.where_clauses(clauses)?;
                    self.dst.push(')');
                } else {
                    self.where_clauses(clauses)?;
                }
            }
            Condition::Not(inner) => {
                self.dst.push_str("NOT(");
                self.condition(inner)?;
                self.dst.push(')');
            }
            Condition::And(conditions) => self.connect(conditions, " AND ")?,
            Condition::Or(conditions) => self.connect(conditions, " OR ")?,
            Condition::Compare { op, lhs, rhs } => self.compare(*op, lhs, rhs)?,
        }

        Ok(())
    }

    fn connect(&mut self, conditions: &[Condition], connective: &str) -> Result<()> {
        for (index, condition) in conditions.iter().enumerate() {
            if index > 0 {
                self.dst.push_str(connective);
            }
            if conditions.len() > 1 {
                self.grouped(condition)?;
            } else {
                self.condition(condition)?;
            }
        }

        Ok(())
    }

    fn compare(&mut self, op: CompareOp, lhs: &Operand, rhs: &[Operand]) -> Result<()> {
        let arg = |index: usize| {
            rhs.get(index).ok_or_else(|| {
                Error::invalid_statement(format!("{op:?} is missing operand {}", index + 1))
            })
        };

        match op {
            CompareOp::Equal => self.binary(lhs, " = ", arg(0)?)?,
            CompareOp::NotEqual => self.binary(lhs, " != ", arg(0)?)?,
            CompareOp::LessThan => self.binary(lhs, " < ", arg(0)?)?,
            CompareOp::LessThanOrEqual => self.binary(lhs, " <= ", arg(0)?)?,
            CompareOp::MoreThan => self.binary(lhs, " > ", arg(0)?)?,
            CompareOp::MoreThanOrEqual => self.binary(lhs, " >= ", arg(0)?)?,
            CompareOp::Like => self.binary(lhs, " LIKE ", arg(0)?)?,
            CompareOp::ILike if self.capability().ilike => self.binary(lhs, " ILIKE ", arg(0)?)?,
            CompareOp::ILike => {
                fmt!(self, "UPPER(", lhs, ") LIKE UPPER(", arg(0)?, ")");
            }
            CompareOp::Between => {
                fmt!(self, lhs, " BETWEEN ", arg(0)?, " AND ", arg(1)?);
            }
            // An empty IN list can never match
            CompareOp::In if rhs.is_empty() => self.dst.push_str("0=1"),
            CompareOp::In => {
                fmt!(self, lhs, " IN (");
                for (index, operand) in rhs.iter().enumerate() {
                    if index > 0 {
                        self.dst.push_str(", ");
                    }
                    fmt!(self, operand);
                }
                self.dst.push(')');
            }
            CompareOp::Any => {
                fmt!(self, lhs, " = ANY(", arg(0)?, ")");
            }
            CompareOp::IsNull => {
                fmt!(self, lhs, " IS NULL");
            }
            CompareOp::ArrayContains => self.array(lhs, " @> ", arg(0)?)?,
            CompareOp::ArrayContainedBy => self.array(lhs, " <@ ", arg(0)?)?,
            CompareOp::ArrayOverlap => self.array(lhs, " && ", arg(0)?)?,
            CompareOp::JsonContains => match self.capability().dialect {
                Dialect::Postgresql => {
                    fmt!(self, lhs, " ::jsonb @> ", arg(0)?);
                }
                Dialect::Mysql => {
                    fmt!(self, "JSON_CONTAINS(", lhs, ", ", arg(0)?, ")");
                }
                Dialect::Sqlite => {
                    return Err(Error::unsupported_feature(
                        "JSON containment is not supported by sqlite",
                    ))
                }
            },
        }

        Ok(())
    }

    fn binary(&mut self, lhs: &Operand, operator: &str, rhs: &Operand) -> Result<()> {
        fmt!(self, lhs, operator, rhs);
        Ok(())
    }

    fn array(&mut self, lhs: &Operand, operator: &str, rhs: &Operand) -> Result<()> {
        if !self.capability().array_operators {
            return Err(Error::unsupported_feature(format!(
                "array operator `{}` is not supported by {:?}",
                operator.trim(),
                self.capability().dialect
            )));
        }

        self.binary(lhs, operator, rhs)
    }

    /// Renders ` WHERE ...` for the current statement: the caller's clauses,
    /// then the soft-delete and inheritance filters of the main entity.
    pub(super) fn where_expression(&mut self) -> Result<()> {
        let expr = self.scope.expr;
        let mut parts = vec![];

        if !expr.wheres.is_empty() {
            let clauses = self.capture(|f| f.where_clauses(&expr.wheres))?;

            if !clauses.is_empty() && clauses != "1=1" {
                parts.push(clauses);
            }
        }

        let main = expr.main_alias()?;

        if let Some(entity) = main.entity() {
            let registry = self.serializer.registry;
            let metadata = registry.entity(entity);

            if expr.kind == QueryKind::Select && !expr.with_deleted {
                if let Some(column) = metadata.delete_date_column() {
                    let column = ColumnRef {
                        alias: Some(main.name.as_str()),
                        column: &column.database_name,
                    };

                    parts.push(self.capture(|f| {
                        fmt!(f, column, " IS NULL");
                        Ok(())
                    })?);
                }
            }

            // Children only see their own family's rows
            if let (Some(column), Some(_)) = (metadata.discriminator_column(), metadata.parent) {
                let values = registry.discriminator_values(entity);

                let column = ColumnRef {
                    alias: Some(main.name.as_str()),
                    column: &column.database_name,
                };

                parts.push(self.capture(|f| {
                    fmt!(f, column, " IN (");
                    for (index, value) in values.iter().enumerate() {
                        if index > 0 {
                            f.dst.push_str(", ");
                        }
                        f.bind(&Value::from(value.as_str()))?;
                    }
                    f.dst.push(')');
                    Ok(())
                })?);
            }
        }

        match parts.len() {
            0 => {}
            1 => {
                fmt!(self, " WHERE ", &parts[0]);
            }
            _ => {
                self.dst.push_str(" WHERE ( ");
                self.dst.push_str(&parts.join(" ) AND ( "));
                self.dst.push_str(" )");
            }
        }

        Ok(())
    }
}

impl ToSql for &Operand {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        match self {
            Operand::Column { alias, path } => f.column(alias, path),
            Operand::Param(name) => f.named_param(name, false),
            Operand::Raw(sql) => f.raw(sql),
        }
    }
}
