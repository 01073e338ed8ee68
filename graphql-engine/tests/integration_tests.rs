use std::sync::Arc;
use std::time::Duration;

use graphql_engine::Configuration;
use graphql_engine::Engine;
use graphql_engine::FieldError;
use graphql_engine::ResolverBinding;
use graphql_engine::ResolverRegistry;
use graphql_engine::ResolverRequest;
use graphql_engine::Schema;
use graphql_engine::configuration::Execution;
use graphql_engine::demo::Demo;
use graphql_engine::demo::greetings;
use graphql_engine::demo::notes;
use graphql_engine::demo::notes::NoteStore;
use graphql_engine::error::BindingError;
use graphql_engine::error::LoadError;
use graphql_engine::graphql::Request;
use graphql_engine::graphql::Response;
use graphql_engine::resolver_fn;
use serde_json_bytes::json;
use test_log::test;

fn notes_engine() -> (Engine, Arc<NoteStore>) {
    let store = Arc::new(NoteStore::seeded());
    let engine = notes::engine(store.clone(), Configuration::default()).unwrap();
    (engine, store)
}

async fn execute(engine: &Engine, request: Request) -> String {
    let response: Response = engine.execute(request).await;
    serde_json::to_string(&response).unwrap()
}

#[test]
fn every_object_field_is_bound() {
    for demo in [Demo::Greetings, Demo::Notes] {
        let engine = demo.engine(Configuration::default()).unwrap();
        for object in engine.schema().object_types() {
            for field in object.fields.keys() {
                assert!(
                    engine.registry().lookup(&object.name, field).is_ok(),
                    "{demo}: {}.{field} is not bound",
                    object.name
                );
            }
        }
    }
}

#[test]
fn unbound_schema_fails_to_load() {
    let schema = format!("{}\nextend schema @deprecated", notes::SCHEMA);
    assert!(matches!(
        Engine::load(&schema, ResolverRegistry::new(), Configuration::default()),
        Err(LoadError::Parse(_))
    ));

    let registry = greetings::registry().unwrap();
    let error = Engine::load(notes::SCHEMA, registry, Configuration::default()).unwrap_err();
    assert!(
        matches!(error, LoadError::Binding(BindingError::UnknownField { .. })),
        "{error}"
    );
}

#[test(tokio::test)]
async fn missing_note() {
    let (engine, _) = notes_engine();
    let response = execute(
        &engine,
        Request::builder()
            .query("query Note($noteID: ID!) { note(noteID: $noteID) { noteID data } }")
            .operation_name("Note")
            .variable("noteID", "missing")
            .build(),
    )
    .await;
    assert_eq!(
        response,
        r#"{"data":null,"errors":[{"message":"not found","path":["note"]}]}"#
    );
}

#[test(tokio::test)]
async fn missing_note_with_a_schema_of_its_own() {
    let mut registry = ResolverRegistry::new();
    registry
        .bind(
            ResolverBinding::new(
                "Query",
                "note",
                resolver_fn(|request: ResolverRequest| async move {
                    match request.str_argument("noteID")? {
                        "missing" => Err(FieldError::new("not found")),
                        id => Ok(json!({ "noteID": id })),
                    }
                }),
            )
            .with_arguments(["noteID"])
            .fallible(),
        )
        .unwrap();
    registry.bind_properties("Note", ["noteID"]).unwrap();
    let engine = Engine::builder()
        .schema(
            Schema::parse("type Query { note(noteID: ID!): Note! } type Note { noteID: ID! }")
                .unwrap(),
        )
        .registry(registry)
        .build()
        .unwrap();
    let response = execute(
        &engine,
        Request::builder()
            .query("{ note(noteID: \"missing\") { noteID } }")
            .build(),
    )
    .await;
    assert_eq!(
        response,
        r#"{"data":null,"errors":[{"message":"not found","path":["note"]}]}"#
    );
}

#[test(tokio::test)]
async fn data_follows_selection_order() {
    let (engine, _) = notes_engine();
    let response = execute(
        &engine,
        Request::builder()
            .query("{ note(noteID: \"n-005\") { data noteID } users { emoji userID } }")
            .build(),
    )
    .await;
    assert_eq!(
        response,
        r#"{"data":{"note":{"data":"¡Hola de nuevo mundo!","noteID":"n-005"},"users":[{"emoji":"🇵🇹","userID":"u-001"},{"emoji":"🇪🇸","userID":"u-002"},{"emoji":"🇺🇸","userID":"u-003"}]}}"#
    );
}

#[test(tokio::test)]
async fn read_only_operations_are_idempotent() {
    let (engine, _) = notes_engine();
    let request = Request::builder()
        .query("query Users { users { userID username notes { noteID data } } }")
        .operation_name("Users")
        .build();
    let first = execute(&engine, request.clone()).await;
    let second = execute(&engine, request).await;
    assert_eq!(first, second);
}

#[test(tokio::test)]
async fn variable_substitution() {
    let engine = greetings::engine(Configuration::default()).unwrap();
    let query = "query GreetPerson($person: String!) { greetPerson(person: $person) }";
    let response = execute(
        &engine,
        Request::builder()
            .query(query)
            .operation_name("GreetPerson")
            .variable("person", "Michael")
            .build(),
    )
    .await;
    assert_eq!(response, r#"{"data":{"greetPerson":"Hello, Michael!"}}"#);

    let response = execute(
        &engine,
        Request::builder()
            .query(query)
            .operation_name("GreetPerson")
            .build(),
    )
    .await;
    insta::assert_snapshot!(
        response,
        @r#"{"data":null,"errors":[{"message":"Variable \"$person\" of required type \"String!\" was not provided.","path":["greetPerson"],"extensions":{"code":"BAD_USER_INPUT"}}]}"#
    );
}

#[test(tokio::test)]
async fn enum_coercion() {
    let engine = greetings::engine(Configuration::default()).unwrap();
    let query = "query GreetPersonTimeOfDay($person: String!, $timeOfDay: TimeOfDay!) {
        greetPersonTimeOfDay(person: $person, timeOfDay: $timeOfDay)
    }";
    let request = |time_of_day: &str| {
        Request::builder()
            .query(query)
            .variable("person", "Michael")
            .variable("timeOfDay", time_of_day)
            .build()
    };

    let response = execute(&engine, request("AFTERNOON")).await;
    assert_eq!(
        response,
        r#"{"data":{"greetPersonTimeOfDay":"Good afternoon, Michael!"}}"#
    );

    let response = execute(&engine, request("NOON")).await;
    insta::assert_snapshot!(
        response,
        @r#"{"data":null,"errors":[{"message":"Value \"NOON\" does not exist in \"TimeOfDay\" enum at \"timeOfDay\".","path":["greetPersonTimeOfDay"],"extensions":{"code":"BAD_USER_INPUT"}}]}"#
    );
}

#[test(tokio::test)]
async fn lists_of_objects() {
    let (engine, store) = notes_engine();
    let response = execute(
        &engine,
        Request::builder()
            .query("query Notes($userID: ID!) { notes(userID: $userID) { noteID } }")
            .variable("userID", "u-002")
            .build(),
    )
    .await;
    assert_eq!(
        response,
        r#"{"data":{"notes":[{"noteID":"n-004"},{"noteID":"n-005"},{"noteID":"n-006"}]}}"#
    );
    assert_eq!(store.notes("u-002").len(), 3);

    let response = execute(
        &engine,
        Request::builder()
            .query("{ notes(userID: \"u-999\") { noteID } }")
            .build(),
    )
    .await;
    assert_eq!(response, r#"{"data":{"notes":[]}}"#);
}

#[test(tokio::test)]
async fn created_notes_are_visible() {
    let (engine, store) = notes_engine();
    let create = |data: &str| {
        Request::builder()
            .query(
                "mutation CreateNote($userID: ID!, $note: NoteInput!) {
                    createNote(userID: $userID, note: $note) { noteID data }
                }",
            )
            .operation_name("CreateNote")
            .variable("userID", "u-003")
            .variable("note", json!({ "data": data }))
            .build()
    };
    let first = engine.execute(create("We created a note!")).await;
    let second = engine.execute(create("And another one")).await;
    assert_eq!(
        first.data,
        Some(json!({ "createNote": { "noteID": "n-010", "data": "We created a note!" } }))
    );
    assert_eq!(
        second.data,
        Some(json!({ "createNote": { "noteID": "n-011", "data": "And another one" } }))
    );

    let response = execute(
        &engine,
        Request::builder()
            .query("{ user(userID: \"u-003\") { notes { noteID } } }")
            .build(),
    )
    .await;
    assert_eq!(
        response,
        r#"{"data":{"user":{"notes":[{"noteID":"n-007"},{"noteID":"n-008"},{"noteID":"n-009"},{"noteID":"n-010"},{"noteID":"n-011"}]}}}"#
    );
    assert_eq!(store.note("n-011").unwrap().data, "And another one");
}

#[test(tokio::test)]
async fn concurrent_mutations() {
    let (engine, store) = notes_engine();
    let requests = (0..10).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .execute(
                    Request::builder()
                        .query(
                            "mutation ($data: String!) {
                                createNote(userID: \"u-001\", note: { data: $data }) { noteID }
                            }",
                        )
                        .variable("data", format!("note {i}"))
                        .build(),
                )
                .await
        })
    });
    let mut ids = Vec::new();
    for response in futures::future::join_all(requests).await {
        let response = response.unwrap();
        assert!(response.is_ok(), "{:?}", response.errors);
        let data = serde_json::to_value(&response.data).unwrap();
        ids.push(data["createNote"]["noteID"].as_str().unwrap().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    assert_eq!(store.notes("u-001").len(), 13);
}

#[test(tokio::test(start_paused = true))]
async fn timeouts_from_configuration() {
    let mut registry = ResolverRegistry::new();
    registry
        .bind(ResolverBinding::new(
            "Query",
            "greet",
            resolver_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!("Hello, world!"))
            }),
        ))
        .unwrap();
    let configuration: Configuration = "execution:\n  resolver_timeout: 1s\n".parse().unwrap();
    assert_eq!(
        configuration,
        Configuration::new(
            Execution::builder()
                .resolver_timeout(Duration::from_secs(1))
                .build()
        )
    );
    let engine = Engine::load("type Query { greet: String }", registry, configuration).unwrap();
    let response = execute(&engine, Request::builder().query("{ greet }").build()).await;
    insta::assert_snapshot!(
        response,
        @r#"{"data":{"greet":null},"errors":[{"message":"Resolver for Query.greet timed out after 1s.","path":["greet"],"extensions":{"code":"RESOLVER_TIMEOUT"}}]}"#
    );
}
