use quarry_core::schema::{EntityMetadata, Registry};

use indexmap::IndexMap;

/// Maps the property paths an alias accepts to database column names.
///
/// Later entries win, so an explicit column path overrides the relation path
/// of the same name.
#[derive(Debug, Clone)]
pub(super) struct Replacements {
    /// Entity name, for error messages
    pub(super) entity: String,

    columns: IndexMap<String, String>,
}

impl Replacements {
    pub(super) fn new(registry: &Registry, entity: &EntityMetadata) -> Replacements {
        let mut columns = IndexMap::new();

        for relation in &entity.relations {
            let join_columns = registry.owning_join_columns(relation);

            // `post.author` stands for the first foreign key column
            if let Some(first) = join_columns.first() {
                columns.insert(relation.property_path.clone(), first.database_name.clone());
            }

            // `post.author.id` stands for the foreign key referencing `id`
            for column in join_columns {
                if let Some(referenced) = registry.referenced_column(column) {
                    columns.insert(
                        format!("{}.{}", relation.property_path, referenced.property_path),
                        column.database_name.clone(),
                    );
                }
            }
        }

        for column in &entity.columns {
            columns.insert(column.database_name.clone(), column.database_name.clone());
        }

        for column in &entity.columns {
            columns.insert(column.property_name.clone(), column.database_name.clone());
        }

        for column in &entity.columns {
            columns.insert(column.property_path.clone(), column.database_name.clone());
        }

        Replacements {
            entity: entity.name.clone(),
            columns,
        }
    }

    pub(super) fn get(&self, path: &str) -> Option<&str> {
        self.columns.get(path).map(String::as_str)
    }
}
