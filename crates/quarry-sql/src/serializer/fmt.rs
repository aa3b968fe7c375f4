use super::{Formatter, Params};
use quarry_core::Result;

macro_rules! fmt {
    ($f:expr, $( $fragments:expr ),* $(,)?) => {{
        $(
            $fragments.to_sql($f)?;
        )*
    }};
}

pub(super) trait ToSql {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()>;
}

impl ToSql for &str {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        f.dst.push_str(self);
        Ok(())
    }
}

impl ToSql for &String {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        f.dst.push_str(self);
        Ok(())
    }
}

impl<S: ToSql> ToSql for Option<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) -> Result<()> {
        match self {
            Some(inner) => inner.to_sql(f),
            None => Ok(()),
        }
    }
}
