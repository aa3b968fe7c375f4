use super::{Comma, Formatter, Ident, Params, ToSql};

use quarry_core::{
    stmt::{Cte, CteBody, QueryKind},
    Error, Result,
};

impl<T: Params> Formatter<'_, T> {
    /// Renders the `WITH` prefix of the current statement, if it has one.
    pub(super) fn ctes(&mut self) -> Result<()> {
        let expr = self.scope.expr;

        if expr.ctes.is_empty() {
            return Ok(());
        }

        self.dst.push_str("WITH ");

        if self.capability().cte_recursive_hint && expr.ctes.iter().any(|cte| cte.recursive) {
            self.dst.push_str("RECURSIVE ");
        }

        for (index, cte) in expr.ctes.iter().enumerate() {
            if index > 0 {
                self.dst.push_str(", ");
            }
            self.cte(cte)?;
        }

        self.dst.push(' ');
        Ok(())
    }

    fn cte(&mut self, cte: &Cte) -> Result<()> {
        fmt!(self, Ident(&cte.name));

        if !cte.columns.is_empty() {
            fmt!(self, "(", Comma(cte.columns.iter().map(Ident)), ")");
        }

        self.dst.push_str(" AS ");

        if self.capability().cte_materialized_hint {
            match cte.materialized {
                Some(true) => self.dst.push_str("MATERIALIZED "),
                Some(false) => self.dst.push_str("NOT MATERIALIZED "),
                None => {}
            }
        }

        self.dst.push('(');

        match &cte.body {
            CteBody::Raw(sql) => self.raw(sql)?,
            CteBody::Query(query) => {
                if !query.ctes.is_empty() {
                    return Err(Error::unsupported_feature(format!(
                        "common table expression `{}` declares nested common table expressions",
                        cte.name
                    )));
                }

                if query.kind != QueryKind::Select && !self.capability().cte_writable {
                    return Err(Error::unsupported_feature(format!(
                        "{:?} does not support {:?} statements in common table expressions",
                        self.capability().dialect,
                        query.kind
                    )));
                }

                self.nested(query).statement()?;
            }
        }

        self.dst.push(')');
        Ok(())
    }
}
