//! Relation traversal: statement shapes, preloading and the relation cache.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use entwine_core::{
    DefaultTypeMapper, Entity, EntityDefinition, EntityManager, ManagerConfig, MethodShape, Response,
    ScriptedProvider, Tag,
};
use entwine_sql::{AnsiDialect, Statement};
use entwine_types::{Value, ValueKind};

fn entity(kind: &str) -> ValueKind {
    ValueKind::Entity(kind.into())
}

fn definitions(preload: bool) -> Vec<EntityDefinition> {
    let mut pen = EntityDefinition::new("Pen")
        .method(MethodShape::getter("get_width", ValueKind::Double))
        .method(MethodShape::getter("get_deleted", ValueKind::Boolean))
        .method(MethodShape::getter("get_person", entity("Person")))
        .method(MethodShape::setter("set_person", entity("Person")));
    let mut suit = EntityDefinition::new("Suit").method(MethodShape::getter("get_name", ValueKind::String));
    if preload {
        pen = pen.preload(["width"]);
        suit = suit.preload(["name"]);
    }

    vec![
        EntityDefinition::new("Person")
            .method(MethodShape::many("get_pens", "Pen").tag(Tag::OneToMany {
                r#where: Some("deleted = 0".into()),
            }))
            .method(MethodShape::many("get_suits", "Suit").tag(Tag::ManyToMany {
                through: "PersonSuit".into(),
                r#where: None,
            }))
            .method(MethodShape::many("get_friends", "Person").tag(Tag::ManyToMany {
                through: "Friendship".into(),
                r#where: None,
            }))
            .method(MethodShape::many("get_addresses", "Address").tag(Tag::ManyToMany {
                through: "PersonAddress".into(),
                r#where: None,
            })),
        pen,
        suit,
        EntityDefinition::new("PersonSuit")
            .method(MethodShape::getter("get_person", entity("Person")))
            .method(MethodShape::getter("get_suit", entity("Suit"))),
        EntityDefinition::new("Friendship")
            .method(MethodShape::getter("get_person_a", entity("Person")))
            .method(MethodShape::getter("get_person_b", entity("Person"))),
        EntityDefinition::new("Address").polymorphic(),
        EntityDefinition::new("EmailAddress").extends("Address"),
        EntityDefinition::new("PostalAddress").extends("Address"),
        EntityDefinition::new("PersonAddress")
            .method(MethodShape::getter("get_person", entity("Person")))
            .method(MethodShape::getter("get_address", entity("Address"))),
    ]
}

fn manager_with(provider: &ScriptedProvider, preload: bool, config: ManagerConfig) -> EntityManager {
    let manager = EntityManager::builder(Arc::new(provider.clone()))
        .with_config(config)
        .with_type_mapper(Arc::new(DefaultTypeMapper::new().with_mapping("EmailAddress", "email")))
        .build();
    manager.register_all(&definitions(preload)).unwrap();
    manager
}

fn manager(provider: &ScriptedProvider, preload: bool) -> EntityManager {
    manager_with(provider, preload, ManagerConfig::default())
}

fn rows(rows: &[&[(&str, Value)]]) -> Response {
    Response::Rows(
        rows.iter()
            .map(|row| row.iter().map(|(column, value)| (*column, value.clone())).collect())
            .collect(),
    )
}

fn pens(statement: &Statement) -> Response {
    if !statement.is_select() {
        return Response::Affected(1);
    }
    rows(&[
        &[("id", Value::Int(1)), ("width", Value::Float(0.5))],
        &[("id", Value::Int(2)), ("width", Value::Float(0.7))],
    ])
}

fn keys(entities: &[Entity]) -> Vec<Value> {
    entities.iter().map(|e| Value::from(e.key().clone())).collect()
}

#[test]
fn one_to_many_selects_the_target_keys() {
    let provider = ScriptedProvider::new(AnsiDialect, pens);
    let manager = manager(&provider, false);
    let person = manager.peer("Person", 1).unwrap();

    let pens = person.related("get_pens").unwrap();
    assert_eq!(keys(&pens), [Value::Int(1), Value::Int(2)]);
    assert!(pens.iter().all(|pen| pen.entity_type() == "Pen"));

    let statements = provider.statements();
    let select = statements.first().unwrap();
    assert_eq!(select.sql, "SELECT id FROM pen WHERE person_id = ? AND (deleted = 0)");
    assert_eq!(select.params, vec![Value::Int(1)]);
}

#[test]
fn preloaded_fields_need_no_further_selects() {
    let provider = ScriptedProvider::new(AnsiDialect, pens);
    let manager = manager(&provider, true);
    let person = manager.peer("Person", 1).unwrap();

    let pens = person.related("get_pens").unwrap();
    assert_eq!(
        provider.statements().first().unwrap().sql,
        "SELECT id,width FROM pen WHERE person_id = ? AND (deleted = 0)"
    );

    let widths: Vec<Value> = pens.iter().map(|pen| pen.get("get_width").unwrap()).collect();
    assert_eq!(widths, [Value::Float(0.5), Value::Float(0.7)]);
    assert_eq!(provider.selects().len(), 1);
}

#[test]
fn disabling_preload_falls_back_to_the_plain_shape() {
    let provider = ScriptedProvider::new(AnsiDialect, pens);
    let config = ManagerConfig {
        preload_enabled: false,
        ..ManagerConfig::default()
    };
    let manager = manager_with(&provider, true, config);
    manager.peer("Person", 1).unwrap().related("get_pens").unwrap();
    assert_eq!(
        provider.statements().first().unwrap().sql,
        "SELECT id FROM pen WHERE person_id = ? AND (deleted = 0)"
    );
}

#[test]
fn results_are_cached_until_a_mapping_field_is_saved() {
    let provider = ScriptedProvider::new(AnsiDialect, pens);
    let manager = manager(&provider, false);
    let person = manager.peer("Person", 1).unwrap();

    let first = person.related("get_pens").unwrap();
    let second = person.related("get_pens").unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.selects().len(), 1);
    assert_eq!(manager.relation_cache_len(), 1);

    let pen = first.first().unwrap();
    let other = manager.peer("Person", 2).unwrap();
    pen.set("set_person", &other).unwrap();
    pen.save().unwrap();
    assert_eq!(manager.relation_cache_len(), 0);

    person.related("get_pens").unwrap();
    assert_eq!(provider.selects().len(), 2);
}

#[test]
fn disabled_relation_cache_always_queries() {
    let provider = ScriptedProvider::new(AnsiDialect, pens);
    let config = ManagerConfig {
        relation_cache_enabled: false,
        ..ManagerConfig::default()
    };
    let manager = manager_with(&provider, false, config);
    let person = manager.peer("Person", 1).unwrap();

    person.related("get_pens").unwrap();
    person.related("get_pens").unwrap();
    assert_eq!(provider.selects().len(), 2);
    assert_eq!(manager.relation_cache_len(), 0);
}

#[test]
fn many_to_many_reads_the_bridge_table() {
    let provider = ScriptedProvider::new(AnsiDialect, |_| {
        rows(&[
            &[("suit_id", Value::Int(5)), ("id", Value::Int(50))],
            &[("suit_id", Value::Int(6)), ("id", Value::Int(60))],
        ])
    });
    let manager = manager(&provider, false);
    let suits = manager.peer("Person", 1).unwrap().related("get_suits").unwrap();

    assert_eq!(keys(&suits), [Value::Int(5), Value::Int(6)]);
    assert_eq!(
        provider.statements().first().unwrap().sql,
        "SELECT suit_id,id FROM person_suit WHERE person_id = ?"
    );
}

#[test]
fn many_to_many_preload_joins_the_target_table() {
    let provider = ScriptedProvider::new(AnsiDialect, |_| {
        rows(&[&[
            ("suit__id", Value::Int(5)),
            ("name", Value::from("tweed")),
            ("person_suit__id", Value::Int(50)),
        ]])
    });
    let manager = manager(&provider, true);
    let suits = manager.peer("Person", 1).unwrap().related("get_suits").unwrap();

    assert_eq!(
        provider.statements().first().unwrap().sql,
        "SELECT suit.id AS suit__id,suit.name,person_suit.id AS person_suit__id FROM person_suit \
         INNER JOIN suit ON person_suit.suit_id = suit.id WHERE person_suit.person_id = ?"
    );
    let suit = suits.first().unwrap();
    assert_eq!(suit.get("get_name").unwrap(), Value::from("tweed"));
    assert_eq!(provider.selects().len(), 1);
}

#[test]
fn symmetric_relations_union_every_field_pair_and_skip_the_source() {
    let provider = ScriptedProvider::new(AnsiDialect, |_| {
        rows(&[
            &[("____result", Value::Int(1))],
            &[("____result", Value::Int(2))],
            &[("____result", Value::Int(3))],
            &[("____result", Value::Null)],
        ])
    });
    let manager = manager(&provider, false);
    let friends = manager.peer("Person", 1).unwrap().related("get_friends").unwrap();
    assert_eq!(keys(&friends), [Value::Int(2), Value::Int(3)]);

    let statements = provider.statements();
    let select = statements.first().unwrap();
    assert!(select.sql.starts_with("SELECT DISTINCT a.____out AS ____result FROM (SELECT "));
    assert!(select.sql.ends_with(") a"));
    assert_eq!(select.sql.matches(" UNION ").count(), 3);
    assert!(select.sql.contains(
        "SELECT person_b_id AS ____out,person_a_id AS ____in FROM friendship WHERE person_a_id = ?"
    ));
    assert_eq!(select.params, vec![Value::Int(1); 4]);
}

#[test]
fn polymorphic_targets_resolve_through_the_discriminator() {
    let provider = ScriptedProvider::new(AnsiDialect, |_| {
        rows(&[
            &[
                ("address_id", Value::Int(5)),
                ("id", Value::Int(50)),
                ("address_type", Value::from("email")),
            ],
            &[
                ("address_id", Value::Int(6)),
                ("id", Value::Int(60)),
                ("address_type", Value::from("PostalAddress")),
            ],
        ])
    });
    let manager = manager(&provider, false);
    let addresses = manager.peer("Person", 1).unwrap().related("get_addresses").unwrap();

    assert_eq!(
        provider.statements().first().unwrap().sql,
        "SELECT address_id,id,address_type FROM person_address WHERE person_id = ?"
    );
    let types: Vec<&str> = addresses.iter().map(Entity::entity_type).collect();
    assert_eq!(types, ["EmailAddress", "PostalAddress"]);
}

#[test]
fn missing_mappings_are_schema_errors() {
    let provider = ScriptedProvider::new(AnsiDialect, |_| Response::Rows(Vec::new()));
    let manager = manager(&provider, false);
    manager
        .register(
            &EntityDefinition::new("Hat").method(MethodShape::many("get_pens", "Pen").tag(Tag::OneToMany {
                r#where: None,
            })),
        )
        .unwrap();

    let hat = manager.peer("Hat", 1).unwrap();
    assert!(matches!(
        hat.related("get_pens"),
        Err(entwine_core::EntityError::Schema(_))
    ));
    assert!(provider.statements().is_empty());
}
