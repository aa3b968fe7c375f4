use super::{ColumnRef, Formatter, Ident, Params, ToSql};
use crate::lexer::{Lexer, Token};

use quarry_core::{Error, Result};

impl<T: Params> Formatter<'_, T> {
    /// Renders SQL text written by the caller. Known `alias.property` paths
    /// become column references and `:name` parameters are bound. Quoted
    /// sections are copied untouched.
    pub(super) fn raw(&mut self, sql: &str) -> Result<()> {
        for token in Lexer::new(sql) {
            match token {
                Token::Text(text) => self.dst.push_str(text),
                Token::Path(path) => self.raw_path(path)?,
                Token::Param { name, spread } => self.named_param(name, spread)?,
            }
        }

        Ok(())
    }

    fn raw_path(&mut self, path: &str) -> Result<()> {
        if let Some((alias, rest)) = path.split_once('.') {
            let column = self
                .scope
                .table(alias)
                .and_then(|table| table.get(rest))
                .map(str::to_string);

            if let Some(column) = column {
                fmt!(self, ColumnRef { alias: Some(alias), column: &column });
                return Ok(());
            }
        }

        if !self.scope.expr.alias_prefixing {
            let column = self
                .scope
                .main_table()
                .and_then(|table| table.get(path))
                .map(str::to_string);

            if let Some(column) = column {
                fmt!(self, Ident(&column));
                return Ok(());
            }
        }

        self.dst.push_str(path);
        Ok(())
    }

    /// Renders a structured reference to a property of an alias.
    pub(super) fn column(&mut self, alias: &str, path: &str) -> Result<()> {
        let column = match self.scope.aliases.get(alias) {
            Some(Some(table)) => table
                .get(path)
                .map(str::to_string)
                .ok_or_else(|| Error::property_not_found(&table.entity, path))?,
            // Tables without metadata and derived tables take paths verbatim
            Some(None) => path.to_string(),
            None => {
                return Err(Error::invalid_statement(format!(
                    "alias `{alias}` is not part of the query"
                )))
            }
        };

        fmt!(self, ColumnRef { alias: Some(alias), column: &column });
        Ok(())
    }
}
