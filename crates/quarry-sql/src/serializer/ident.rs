use super::{Formatter, Params, ToSql};
use quarry_core::Result;

/// A quoted identifier. Quoting is skipped when the query disabled escaping.
pub(super) struct Ident<S>(pub(super) S);

/// A column reference, prefixed with its alias when the statement uses
/// aliases.
pub(super) struct ColumnRef<'a> {
    pub(super) alias: Option<&'a str>,
    pub(super) column: &'a str,
}

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        let name = self.0.as_ref();

        if !f.scope.escape {
            f.dst.push_str(name);
            return Ok(());
        }

        let quote = f.capability().identifier_quote;

        f.dst.push(quote);
        for c in name.chars() {
            if c == quote {
                f.dst.push(quote);
            }
            f.dst.push(c);
        }
        f.dst.push(quote);

        Ok(())
    }
}

impl ToSql for ColumnRef<'_> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        match self.alias {
            Some(alias) if f.scope.expr.alias_prefixing => {
                fmt!(f, Ident(alias), ".", Ident(self.column))
            }
            _ => fmt!(f, Ident(self.column)),
        }
        Ok(())
    }
}
