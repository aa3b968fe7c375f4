use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

use std::fmt::Debug;

/// Generates table and column names for entities that do not name them
/// explicitly.
pub trait NamingStrategy: Debug + Send + Sync {
    fn table_name(&self, entity_name: &str, explicit: Option<&str>) -> String;

    /// Name of a column given its property, an explicit override and the
    /// prefixes contributed by enclosing embedded objects.
    fn column_name(&self, property: &str, explicit: Option<&str>, prefixes: &[&str]) -> String;

    /// Name of a foreign key column created for a relation.
    fn join_column_name(&self, relation: &str, referenced_column: &str) -> String;

    /// Name of the link table of a many-to-many relation.
    fn join_table_name(&self, first_table: &str, second_table: &str, first_property: &str)
        -> String;

    /// Name of a link table column referencing `column` of `table`.
    fn join_table_column_name(&self, table: &str, property: &str, column: Option<&str>) -> String;
}

/// camelCase column names, snake_case table names.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNamingStrategy;

/// snake_case everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnakeNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn table_name(&self, entity_name: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) => name.to_string(),
            None => entity_name.to_snake_case(),
        }
    }

    fn column_name(&self, property: &str, explicit: Option<&str>, prefixes: &[&str]) -> String {
        let name = explicit.unwrap_or(property);

        if prefixes.is_empty() {
            return name.to_string();
        }

        format!(
            "{}{}",
            prefixes.join("_").to_lower_camel_case(),
            name.to_upper_camel_case()
        )
    }

    fn join_column_name(&self, relation: &str, referenced_column: &str) -> String {
        format!("{relation}_{referenced_column}").to_lower_camel_case()
    }

    fn join_table_name(
        &self,
        first_table: &str,
        second_table: &str,
        first_property: &str,
    ) -> String {
        format!(
            "{first_table}_{}_{second_table}",
            first_property.replace('.', "_")
        )
        .to_snake_case()
    }

    fn join_table_column_name(&self, table: &str, property: &str, column: Option<&str>) -> String {
        format!("{table}_{}", column.unwrap_or(property)).to_lower_camel_case()
    }
}

impl NamingStrategy for SnakeNamingStrategy {
    fn table_name(&self, entity_name: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) => name.to_string(),
            None => entity_name.to_snake_case(),
        }
    }

    fn column_name(&self, property: &str, explicit: Option<&str>, prefixes: &[&str]) -> String {
        if let Some(name) = explicit {
            return name.to_string();
        }

        let mut segments = prefixes.to_vec();
        segments.push(property);
        segments.join("_").to_snake_case()
    }

    fn join_column_name(&self, relation: &str, referenced_column: &str) -> String {
        format!("{relation}_{referenced_column}").to_snake_case()
    }

    fn join_table_name(
        &self,
        first_table: &str,
        second_table: &str,
        first_property: &str,
    ) -> String {
        DefaultNamingStrategy.join_table_name(first_table, second_table, first_property)
    }

    fn join_table_column_name(&self, table: &str, property: &str, column: Option<&str>) -> String {
        format!("{table}_{}", column.unwrap_or(property)).to_snake_case()
    }
}
