mod common;

use common::*;
use sqlstage::prelude::*;

fn stored_user() -> User {
    User {
        session_token: None,
        ..sample_user()
    }
}

fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([
        ("id", Value::BigInt(id)),
        ("name", Value::from(name)),
        ("active", Value::Bool(true)),
        ("address_city", Value::from("London")),
        ("address_zip", Value::from("N1")),
    ])
}

fn tag_row(tag: &str) -> Row {
    Row::from_pairs([("users_id", Value::BigInt(1)), ("tags_value", Value::from(tag))])
}

#[test]
fn persisted_user_round_trips() {
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<User>(&executor).unwrap();
    mapper.persist(&executor, &sample_user()).unwrap();

    let users: Vec<User> = mapper.find_all(&executor).unwrap();
    assert_eq!(users, vec![stored_user()]);
}

#[test]
fn columns_read_match_columns_declared() {
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<User>(&executor).unwrap();
    mapper.persist(&executor, &sample_user()).unwrap();
    let _: Vec<User> = mapper.find_all(&executor).unwrap();

    let schema = mapper.generate_schema::<User>().unwrap();
    let (root, root_columns) = parse_create(&schema[0]).unwrap();
    assert_eq!(executor.columns_read(&root), root_columns);

    let (child, child_columns) = parse_create(&schema[1]).unwrap();
    let value_columns: Vec<String> = child_columns
        .into_iter()
        .filter(|column| column != "users_id")
        .collect();
    assert_eq!(executor.columns_read(&child), value_columns);
}

#[test]
fn record_elements_round_trip() {
    let person = Person {
        id: 1,
        contacts: vec![
            Contact {
                label: "home".to_string(),
                address: Address {
                    city: "London".to_string(),
                    zip: "N1".to_string(),
                },
            },
            Contact {
                label: "work".to_string(),
                address: Address {
                    city: "Leeds".to_string(),
                    zip: "LS1".to_string(),
                },
            },
        ],
    };
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<Person>(&executor).unwrap();
    assert_eq!(mapper.persist(&executor, &person).unwrap(), 3);

    let people: Vec<Person> = mapper.find_all(&executor).unwrap();
    assert_eq!(people, vec![person]);
    assert_eq!(
        executor.columns_read("people_contacts"),
        vec!["label_value", "address_city_value", "address_zip_value"]
    );
}

#[test]
fn collection_keeps_child_row_order() {
    let executor = MemoryExecutor::new()
        .with_rows("users", vec![user_row(1, "Ada")])
        .with_rows("users_tags", vec![tag_row("z"), tag_row("a"), tag_row("m")]);

    let users: Vec<User> = Mapper::new().find_all(&executor).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].tags, vec!["z", "a", "m"]);
}

#[test]
fn root_rows_hydrate_in_result_order() {
    let executor = MemoryExecutor::new()
        .with_rows("users", vec![user_row(2, "Grace"), user_row(1, "Ada")])
        .with_rows("users_tags", Vec::new());

    let users: Vec<User> = Mapper::new().find_all(&executor).unwrap();
    let names: Vec<&str> = users.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(names, vec!["Grace", "Ada"]);
}

#[test]
fn failed_child_query_yields_empty_collection_by_default() {
    let executor = MemoryExecutor::new().with_rows("users", vec![user_row(1, "Ada")]);
    executor.fail_table("users_tags");

    let users: Vec<User> = Mapper::new().find_all(&executor).unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].tags.is_empty());
    assert_eq!(users[0].name, "Ada");
}

#[test]
fn failed_child_query_propagates_when_configured() {
    let executor = MemoryExecutor::new().with_rows("users", vec![user_row(1, "Ada")]);
    executor.fail_table("users_tags");

    let config = MapperConfig::default().query_failure(QueryFailurePolicy::Propagate);
    let err = Mapper::new()
        .config(config)
        .find_all::<User>(&executor)
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
}

#[test]
fn hydrate_reads_the_current_cursor_row() {
    let executor = MemoryExecutor::new().with_rows("users_tags", vec![tag_row("a")]);
    let rows = vec![user_row(1, "Ada")];
    let mut cursor = RowCursor::new(&rows);
    assert!(cursor.next().unwrap());

    let user: User = Mapper::new().hydrate(&executor, &cursor).unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.address.city, "London");
    assert_eq!(user.tags, vec!["a"]);
    assert_eq!(user.session_token, None);
    assert_eq!(executor.statements(), vec!["SELECT * FROM users_tags;".to_string()]);
}

#[test]
fn missing_column_is_reported() {
    let executor = MemoryExecutor::new();
    let rows = vec![Row::from_pairs([
        ("id", Value::BigInt(1)),
        ("name", Value::from("Ada")),
    ])];
    let mut cursor = RowCursor::new(&rows);
    assert!(cursor.next().unwrap());

    match Mapper::new().hydrate::<User>(&executor, &cursor) {
        Err(Error::MissingColumn { column }) => assert_eq!(column, "active"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn unregistered_element_type_issues_no_query() {
    let executor = MemoryExecutor::new();
    let rows = vec![Row::from_pairs([("id", Value::BigInt(1))])];
    let mut cursor = RowCursor::new(&rows);
    assert!(cursor.next().unwrap());

    match Mapper::new().hydrate::<Palette>(&executor, &cursor) {
        Err(Error::StageNotFound { type_name }) => assert!(type_name.ends_with("Color")),
        other => panic!("expected StageNotFound, got {other:?}"),
    }
    assert!(executor.statements().is_empty());
}

#[test]
fn all_null_embedded_record_hydrates_to_none() {
    let shipments = vec![
        Shipment {
            id: 1,
            destination: None,
            weight: None,
        },
        Shipment {
            id: 2,
            destination: Some(Address {
                city: "Paris".to_string(),
                zip: "75001".to_string(),
            }),
            weight: Some(2.5),
        },
    ];
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<Shipment>(&executor).unwrap();
    for shipment in &shipments {
        mapper.persist(&executor, shipment).unwrap();
    }

    let loaded: Vec<Shipment> = mapper.find_all(&executor).unwrap();
    assert_eq!(loaded, shipments);
}

#[test]
fn driver_integers_are_coerced_to_field_types() {
    let executor = MemoryExecutor::new().with_rows(
        "users",
        vec![Row::from_pairs([
            ("id", Value::Int(9)),
            ("name", Value::from("Ada")),
            ("active", Value::BigInt(0)),
            ("address_city", Value::from("London")),
            ("address_zip", Value::from("N1")),
        ])],
    );

    let users: Vec<User> = Mapper::new().find_all(&executor).unwrap();
    assert_eq!(users[0].id, 9);
    assert!(!users[0].active);
    assert!(users[0].tags.is_empty());
}

#[test]
fn incompatible_stored_value_is_a_conversion_error() {
    let executor = MemoryExecutor::new().with_rows(
        "users",
        vec![Row::from_pairs([
            ("id", Value::from("one")),
            ("name", Value::from("Ada")),
            ("active", Value::Bool(true)),
            ("address_city", Value::from("London")),
            ("address_zip", Value::from("N1")),
        ])],
    );

    let err = Mapper::new().find_all::<User>(&executor).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
}

#[test]
fn deque_and_set_collections_round_trip() {
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<Library>(&executor).unwrap();
    mapper.persist(&executor, &sample_library()).unwrap();

    let loaded: Vec<Library> = mapper.find_all(&executor).unwrap();
    assert_eq!(loaded, vec![sample_library()]);
    assert_eq!(loaded[0].shelves, ["z", "a"]);
}

#[test]
fn collection_inside_embedded_field_round_trips() {
    let executor = MemoryExecutor::new();
    let mapper = Mapper::new();
    mapper.create_schema::<Author>(&executor).unwrap();
    mapper.persist(&executor, &sample_author()).unwrap();

    let authors: Vec<Author> = mapper.find_all(&executor).unwrap();
    assert_eq!(authors, vec![sample_author()]);
    assert_eq!(
        executor.columns_read("authors_profile_links"),
        vec!["profile_links_value"]
    );
}

#[test]
fn colliding_row_names_fail_before_any_column_is_read() {
    let executor = MemoryExecutor::new().with_rows(
        "clashes",
        vec![Row::from_pairs([
            ("id", Value::BigInt(1)),
            ("address_city", Value::from("Oslo")),
            ("address_zip", Value::from("0150")),
        ])],
    );

    let err = Mapper::new().find_all::<Clash>(&executor).unwrap_err();
    assert!(matches!(err, Error::DuplicateRowName { .. }));
    assert!(executor.statements().is_empty());
    assert!(executor.columns_read("clashes").is_empty());
}

#[test]
fn nullable_collections_fail_before_any_query() {
    let executor = MemoryExecutor::new()
        .with_rows("wishlists", vec![Row::from_pairs([("id", Value::BigInt(1))])])
        .with_rows("lockers", vec![Row::from_pairs([("id", Value::BigInt(1))])]);

    assert!(matches!(
        Mapper::new().find_all::<Wishlist>(&executor),
        Err(Error::StageNotSupported {
            context: "nullable collection",
            ..
        })
    ));
    assert!(matches!(
        Mapper::new().find_all::<Locker>(&executor),
        Err(Error::StageNotSupported {
            context: "nullable record with collections",
            ..
        })
    ));
    assert!(executor.statements().is_empty());
}

#[test]
fn resolution_error_precedes_every_child_query() {
    let executor = MemoryExecutor::new()
        .with_rows("galleries", vec![Row::from_pairs([("id", Value::BigInt(1))])])
        .with_rows("galleries_tags", Vec::new());
    let rows = vec![Row::from_pairs([("id", Value::BigInt(1))])];
    let mut cursor = RowCursor::new(&rows);
    assert!(cursor.next().unwrap());

    match Mapper::new().hydrate::<Gallery>(&executor, &cursor) {
        Err(Error::StageNotFound { type_name }) => assert!(type_name.ends_with("Color")),
        other => panic!("expected StageNotFound, got {other:?}"),
    }
    assert!(Mapper::new().find_all::<Gallery>(&executor).is_err());
    assert!(executor.statements().is_empty());
}
