//! Demonstration schemas with their resolvers and canned operations.

pub mod greetings;
pub mod notes;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json_bytes::json;

use crate::configuration::Configuration;
use crate::error::LoadError;
use crate::execution::Engine;
use crate::graphql::Request;

/// The demonstration schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demo {
    Greetings,
    Notes,
}

impl Demo {
    /// An engine for this demo. The notes demo gets a freshly seeded store.
    pub fn engine(self, configuration: Configuration) -> Result<Engine, LoadError> {
        match self {
            Demo::Greetings => greetings::engine(configuration),
            Demo::Notes => notes::engine(Arc::new(notes::NoteStore::seeded()), configuration),
        }
    }

    /// The canned requests of this demo, in the order they run.
    pub fn operations(self) -> Vec<Request> {
        match self {
            Demo::Greetings => vec![
                Request::builder()
                    .query("query Greet { greet }")
                    .operation_name("Greet")
                    .build(),
                Request::builder()
                    .query("query GreetPerson($person: String!) { greetPerson(person: $person) }")
                    .operation_name("GreetPerson")
                    .variable("person", "Michael")
                    .build(),
                Request::builder()
                    .query(
                        "query GreetPersonTimeOfDay($person: String!, $timeOfDay: TimeOfDay!) {
                            greetPersonTimeOfDay(person: $person, timeOfDay: $timeOfDay)
                        }",
                    )
                    .operation_name("GreetPersonTimeOfDay")
                    .variable("person", "Michael")
                    .variable("timeOfDay", "AFTERNOON")
                    .build(),
            ],
            Demo::Notes => vec![
                Request::builder()
                    .query("query Users { users { userID username } }")
                    .operation_name("Users")
                    .build(),
                Request::builder()
                    .query("query User($userID: ID!) { user(userID: $userID) { userID username } }")
                    .operation_name("User")
                    .variable("userID", "u-001")
                    .build(),
                Request::builder()
                    .query("query Notes($userID: ID!) { notes(userID: $userID) { noteID data } }")
                    .operation_name("Notes")
                    .variable("userID", "u-001")
                    .build(),
                Request::builder()
                    .query("query Note($noteID: ID!) { note(noteID: $noteID) { noteID data } }")
                    .operation_name("Note")
                    .variable("noteID", "n-001")
                    .build(),
                Request::builder()
                    .query("query Note($noteID: ID!) { note(noteID: $noteID) { noteID data } }")
                    .operation_name("Note")
                    .variable("noteID", "missing")
                    .build(),
                Request::builder()
                    .query(
                        "mutation CreateNote($userID: ID!, $note: NoteInput!) {
                            createNote(userID: $userID, note: $note) { noteID data }
                        }",
                    )
                    .operation_name("CreateNote")
                    .variable("userID", "u-003")
                    .variable("note", json!({ "data": "We created a note!" }))
                    .build(),
                Request::builder()
                    .query("query Users { users { userID username notes { noteID data } } }")
                    .operation_name("Users")
                    .build(),
            ],
        }
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demo::Greetings => f.write_str("greetings"),
            Demo::Notes => f.write_str("notes"),
        }
    }
}

impl FromStr for Demo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greetings" => Ok(Demo::Greetings),
            "notes" => Ok(Demo::Notes),
            _ => Err(format!("unknown demo '{s}', expected 'greetings' or 'notes'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn names() {
        for demo in [Demo::Greetings, Demo::Notes] {
            assert_eq!(demo.to_string().parse::<Demo>().unwrap(), demo);
        }
        assert!("weather".parse::<Demo>().is_err());
    }

    #[test(tokio::test)]
    async fn greetings_operations() {
        let engine = Demo::Greetings.engine(Configuration::default()).unwrap();
        let mut outputs = Vec::new();
        for request in Demo::Greetings.operations() {
            outputs.push(serde_json::to_string(&engine.execute(request).await).unwrap());
        }
        insta::assert_snapshot!(outputs.join("\n"), @r#"
        {"data":{"greet":"Hello, world!"}}
        {"data":{"greetPerson":"Hello, Michael!"}}
        {"data":{"greetPersonTimeOfDay":"Good afternoon, Michael!"}}
        "#);
    }

    #[test(tokio::test)]
    async fn notes_operations() {
        let engine = Demo::Notes.engine(Configuration::default()).unwrap();
        let mut outputs = Vec::new();
        for request in Demo::Notes.operations() {
            outputs.push(serde_json::to_string(&engine.execute(request).await).unwrap());
        }
        insta::assert_snapshot!(outputs.join("\n"), @r#"
        {"data":{"users":[{"userID":"u-001","username":"CR7"},{"userID":"u-002","username":"Sergio_Ramos"},{"userID":"u-003","username":"michaelmiranda_"}]}}
        {"data":{"user":{"userID":"u-001","username":"CR7"}}}
        {"data":{"notes":[{"noteID":"n-001","data":"Olá Mundo!"},{"noteID":"n-002","data":"Olá novamente, mundo!"},{"noteID":"n-003","data":"Olá, escuridão!"}]}}
        {"data":{"note":{"noteID":"n-001","data":"Olá Mundo!"}}}
        {"data":null,"errors":[{"message":"not found","path":["note"]}]}
        {"data":{"createNote":{"noteID":"n-010","data":"We created a note!"}}}
        {"data":{"users":[{"userID":"u-001","username":"CR7","notes":[{"noteID":"n-001","data":"Olá Mundo!"},{"noteID":"n-002","data":"Olá novamente, mundo!"},{"noteID":"n-003","data":"Olá, escuridão!"}]},{"userID":"u-002","username":"Sergio_Ramos","notes":[{"noteID":"n-004","data":"!Hola Mundo!"},{"noteID":"n-005","data":"¡Hola de nuevo mundo!"},{"noteID":"n-006","data":"¡Hola oscuridad!"}]},{"userID":"u-003","username":"michaelmiranda_","notes":[{"noteID":"n-007","data":"Hello, world!"},{"noteID":"n-008","data":"Hello again, world!"},{"noteID":"n-009","data":"Hello, darkness!"},{"noteID":"n-010","data":"We created a note!"}]}]}}
        "#);
    }
}
