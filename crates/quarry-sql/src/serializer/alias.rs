use uuid::Uuid;

/// Builds the result column name `<alias>_<column>`.
///
/// With a maximum length, longer names keep a prefix and end in a hash of
/// the full name, so distinct long names stay distinct and the same name
/// always shortens the same way.
pub fn column_alias(alias: &str, column: &str, max_length: Option<usize>) -> String {
    let name = format!("{alias}_{column}");

    match max_length {
        Some(max) if max > 0 && name.chars().count() > max => shorten(&name, max),
        _ => name,
    }
}

fn shorten(name: &str, max: usize) -> String {
    let hash = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string();

    if max < 16 {
        return hash[..max.min(hash.len())].to_string();
    }

    let prefix: String = name.chars().take(max - 9).collect();
    format!("{prefix}_{}", &hash[..8])
}
