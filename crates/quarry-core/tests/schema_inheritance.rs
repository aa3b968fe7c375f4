use pretty_assertions::assert_eq;
use quarry_core::schema::{ColumnDef, ColumnType, EntityDef};
use quarry_core::Registry;

fn zoo() -> Registry {
    Registry::builder()
        .entity(
            EntityDef::new("Animal")
                .discriminator(ColumnDef::new("kind", ColumnType::Text))
                .column(ColumnDef::new("id", ColumnType::Integer).primary())
                .column(ColumnDef::new("name", ColumnType::Text)),
        )
        .entity(
            EntityDef::new("Cat")
                .extends("Animal")
                .column(ColumnDef::new("lives", ColumnType::Integer)),
        )
        .entity(
            EntityDef::new("Lion")
                .extends("Cat")
                .discriminator_value("lion")
                .column(ColumnDef::new("mane", ColumnType::Boolean)),
        )
        .entity(
            EntityDef::new("Dog")
                .extends("Animal")
                .column(ColumnDef::new("lives", ColumnType::Integer)),
        )
        .build()
        .unwrap()
}

fn columns(registry: &Registry, entity: &str) -> Vec<String> {
    registry
        .resolve(entity)
        .unwrap()
        .columns
        .iter()
        .map(|column| column.database_name.clone())
        .collect()
}

#[test]
fn children_share_the_root_table() {
    let registry = zoo();

    for name in ["Animal", "Cat", "Lion", "Dog"] {
        assert_eq!(registry.resolve(name).unwrap().table.name, "animal");
    }
}

#[test]
fn children_inherit_parent_columns() {
    let registry = zoo();

    assert_eq!(columns(&registry, "Lion"), ["kind", "id", "name", "lives", "mane"]);
    assert_eq!(columns(&registry, "Dog"), ["kind", "id", "name", "lives"]);

    // Lion rows are read through Cat as well
    assert_eq!(columns(&registry, "Cat"), ["kind", "id", "name", "lives", "mane"]);
}

#[test]
fn the_root_table_holds_every_column_once() {
    let registry = zoo();

    assert_eq!(
        columns(&registry, "Animal"),
        ["kind", "id", "name", "lives", "mane"]
    );
}

#[test]
fn discriminator_values_cover_descendants() {
    let registry = zoo();
    let values = |name| registry.discriminator_values(registry.resolve(name).unwrap());

    assert_eq!(values("Cat"), ["Cat", "lion"]);
    assert_eq!(values("Lion"), ["lion"]);
    assert_eq!(values("Animal"), ["Animal", "Cat", "lion", "Dog"]);
}

#[test]
fn ancestry() {
    let registry = zoo();
    let id = |name| registry.resolve(name).unwrap().id;

    assert!(registry.inherits_from(id("Lion"), id("Animal")));
    assert!(registry.inherits_from(id("Cat"), id("Cat")));
    assert!(!registry.inherits_from(id("Dog"), id("Cat")));
    assert_eq!(registry.resolve("Lion").unwrap().parent, Some(id("Cat")));
}

#[test]
fn inheritance_cycles_are_rejected() {
    let err = Registry::builder()
        .entity(
            EntityDef::new("A")
                .extends("B")
                .column(ColumnDef::new("id", ColumnType::Integer).primary()),
        )
        .entity(EntityDef::new("B").extends("A"))
        .build()
        .unwrap_err();

    assert!(err.is_invalid_schema());
}
