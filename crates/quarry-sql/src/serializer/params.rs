use super::{Formatter, ToSql};

use quarry_core::{driver::PlaceholderStyle, stmt::Value, Result};

pub trait Params {
    fn push(&mut self, param: &Value) -> Placeholder;
}

/// One-based position of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder(pub usize);

impl Params for Vec<Value> {
    fn push(&mut self, value: &Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) -> Result<()> {
        use std::fmt::Write;

        let _ = match f.capability().placeholder {
            PlaceholderStyle::Question => write!(f.dst, "?"),
            PlaceholderStyle::Dollar => write!(f.dst, "${}", self.0),
            PlaceholderStyle::NumberedQuestion => write!(f.dst, "?{}", self.0),
        };

        Ok(())
    }
}

impl<T: Params> Formatter<'_, T> {
    /// Binds a value that has no name. It always gets a fresh placeholder.
    pub(super) fn bind(&mut self, value: &Value) -> Result<()> {
        let placeholder = self.params.push(value);
        placeholder.to_sql(self)
    }

    /// Binds a named value. Numbered placeholder styles reuse the number a
    /// name received the first time it was bound to the same value.
    pub(super) fn bind_named(&mut self, name: &str, value: &Value) -> Result<()> {
        if self.capability().placeholder == PlaceholderStyle::Question {
            return self.bind(value);
        }

        let bound = self.bound.entry(name.to_string()).or_default();

        let placeholder = match bound.iter().find(|(existing, _)| existing == value) {
            Some((_, index)) => Placeholder(*index),
            None => {
                let placeholder = self.params.push(value);
                bound.push((value.clone(), placeholder.0));
                placeholder
            }
        };

        placeholder.to_sql(self)
    }

    /// Renders a `:name` or `:...name` reference.
    pub(super) fn named_param(&mut self, name: &str, spread: bool) -> Result<()> {
        let Some(value) = self.scope.parameter(name) else {
            return Err(quarry_core::Error::invalid_statement(format!(
                "no value was set for parameter `{name}`"
            )));
        };

        match value {
            Value::List(items) if spread => {
                if items.is_empty() {
                    self.dst.push_str("NULL");
                }

                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.dst.push_str(", ");
                    }
                    self.bind_named(&format!("{name}[{i}]"), item)?;
                }

                Ok(())
            }
            value => self.bind_named(name, value),
        }
    }
}
