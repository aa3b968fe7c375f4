/// A non-relational sub-object whose columns are flattened into the owning
/// table.
#[derive(Debug, Clone)]
pub struct EmbeddedMetadata {
    pub property_name: String,

    /// Dotted path from the entity root
    pub property_path: String,

    /// Prefix segment contributed to column names, if any
    pub prefix: Option<String>,

    /// Enclosing embedded object, by index
    pub parent: Option<usize>,
}
