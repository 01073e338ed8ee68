//! Notes: users owning notes, kept in an in-memory store shared by the resolvers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::configuration::Configuration;
use crate::error::BindingError;
use crate::error::LoadError;
use crate::execution::Engine;
use crate::json_ext::Value;
use crate::registry::FieldError;
use crate::registry::ResolverBinding;
use crate::registry::ResolverRegistry;
use crate::registry::ResolverRequest;
use crate::registry::resolver_fn;

pub const SCHEMA: &str = include_str!("notes.graphql");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    #[serde(rename = "noteID")]
    pub note_id: String,
    pub data: String,
}

#[derive(Debug, Default)]
struct Store {
    users: Vec<(User, Vec<Note>)>,
    next_note: usize,
}

impl Store {
    fn user(&self, user_id: &str) -> Option<&(User, Vec<Note>)> {
        self.users.iter().find(|(user, _)| user.user_id == user_id)
    }
}

/// In-memory users and notes.
///
/// Reads share the lock. Creating a note holds it exclusively, and the created note is read back
/// before the lock is released.
#[derive(Debug, Default)]
pub struct NoteStore {
    inner: RwLock<Store>,
}

impl NoteStore {
    /// A store holding three users with three notes each.
    pub fn seeded() -> Self {
        let seed = [
            (
                "u-001",
                "CR7",
                "🇵🇹",
                ["Olá Mundo!", "Olá novamente, mundo!", "Olá, escuridão!"],
            ),
            (
                "u-002",
                "Sergio_Ramos",
                "🇪🇸",
                ["!Hola Mundo!", "¡Hola de nuevo mundo!", "¡Hola oscuridad!"],
            ),
            (
                "u-003",
                "michaelmiranda_",
                "🇺🇸",
                ["Hello, world!", "Hello again, world!", "Hello, darkness!"],
            ),
        ];
        let mut store = Store {
            users: Vec::new(),
            next_note: 1,
        };
        for (user_id, username, emoji, notes) in seed {
            let user = User {
                user_id: user_id.to_string(),
                username: username.to_string(),
                emoji: emoji.to_string(),
            };
            let notes = notes
                .into_iter()
                .map(|data| {
                    let note = Note {
                        note_id: format!("n-{:03}", store.next_note),
                        data: data.to_string(),
                    };
                    store.next_note += 1;
                    note
                })
                .collect();
            store.users.push((user, notes));
        }
        Self {
            inner: RwLock::new(store),
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.inner
            .read()
            .users
            .iter()
            .map(|(user, _)| user.clone())
            .collect()
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.inner.read().user(user_id).map(|(user, _)| user.clone())
    }

    /// Notes of a user, empty when the user does not exist.
    pub fn notes(&self, user_id: &str) -> Vec<Note> {
        self.inner
            .read()
            .user(user_id)
            .map(|(_, notes)| notes.clone())
            .unwrap_or_default()
    }

    pub fn note(&self, note_id: &str) -> Option<Note> {
        self.inner
            .read()
            .users
            .iter()
            .flat_map(|(_, notes)| notes)
            .find(|note| note.note_id == note_id)
            .cloned()
    }

    /// Append a note to a user's notes, returning `None` if the user does not exist.
    pub fn create_note(&self, user_id: &str, data: &str) -> Option<Note> {
        let mut store = self.inner.write();
        let note_id = format!("n-{:03}", store.next_note);
        let (_, notes) = store
            .users
            .iter_mut()
            .find(|(user, _)| user.user_id == user_id)?;
        notes.push(Note {
            note_id: note_id.clone(),
            data: data.to_string(),
        });
        store.next_note += 1;
        store
            .user(user_id)
            .and_then(|(_, notes)| notes.iter().find(|note| note.note_id == note_id))
            .cloned()
    }
}

fn to_value(value: impl Serialize) -> Result<Value, FieldError> {
    serde_json_bytes::to_value(value).map_err(|error| FieldError::new(error.to_string()))
}

fn not_found() -> FieldError {
    FieldError::new("not found")
}

/// Resolvers of the notes schema, reading and writing `store`.
pub fn registry(store: Arc<NoteStore>) -> Result<ResolverRegistry, BindingError> {
    let mut registry = ResolverRegistry::new();

    let reader = store.clone();
    registry.bind(ResolverBinding::new(
        "Query",
        "users",
        resolver_fn(move |_| {
            let users = reader.users();
            async move { to_value(users) }
        }),
    ))?;

    let reader = store.clone();
    registry.bind(
        ResolverBinding::new(
            "Query",
            "user",
            resolver_fn(move |request: ResolverRequest| {
                let user = request
                    .str_argument("userID")
                    .and_then(|user_id| reader.user(user_id).ok_or_else(not_found));
                async move { to_value(user?) }
            }),
        )
        .with_arguments(["userID"])
        .fallible(),
    )?;

    let reader = store.clone();
    registry.bind(
        ResolverBinding::new(
            "Query",
            "notes",
            resolver_fn(move |request: ResolverRequest| {
                let notes = request
                    .str_argument("userID")
                    .map(|user_id| reader.notes(user_id));
                async move { to_value(notes?) }
            }),
        )
        .with_arguments(["userID"]),
    )?;

    let reader = store.clone();
    registry.bind(
        ResolverBinding::new(
            "Query",
            "note",
            resolver_fn(move |request: ResolverRequest| {
                let note = request
                    .str_argument("noteID")
                    .and_then(|note_id| reader.note(note_id).ok_or_else(not_found));
                async move { to_value(note?) }
            }),
        )
        .with_arguments(["noteID"])
        .fallible(),
    )?;

    let writer = store.clone();
    registry.bind(
        ResolverBinding::new(
            "Mutation",
            "createNote",
            resolver_fn(move |request: ResolverRequest| {
                let note = request.str_argument("userID").and_then(|user_id| {
                    let data = request
                        .argument("note")
                        .and_then(|note| note.as_object())
                        .and_then(|note| note.get("data"))
                        .and_then(|data| data.as_str())
                        .ok_or_else(|| FieldError::new("missing argument 'note'"))?;
                    writer
                        .create_note(user_id, data)
                        .ok_or_else(|| FieldError::new(format!("unknown user '{user_id}'")))
                });
                async move { to_value(note?) }
            }),
        )
        .with_arguments(["userID", "note"])
        .fallible(),
    )?;

    let reader = store;
    registry.bind(ResolverBinding::new(
        "User",
        "notes",
        resolver_fn(move |request: ResolverRequest| {
            let notes = request
                .parent_property("userID")
                .and_then(|user_id| user_id.as_str())
                .map(|user_id| reader.notes(user_id))
                .unwrap_or_default();
            async move { to_value(notes) }
        }),
    ))?;

    registry.bind_properties("User", ["userID", "username", "emoji"])?;
    registry.bind_properties("Note", ["noteID", "data"])?;
    Ok(registry)
}

pub fn engine(store: Arc<NoteStore>, configuration: Configuration) -> Result<Engine, LoadError> {
    Engine::load(SCHEMA, registry(store)?, configuration)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json_bytes::json;
    use test_log::test;

    use super::*;
    use crate::graphql::Request;

    #[test]
    fn seeded_store() {
        let store = NoteStore::seeded();
        let users = store.users();
        assert_eq!(
            users.iter().map(|user| user.username.as_str()).collect::<Vec<_>>(),
            ["CR7", "Sergio_Ramos", "michaelmiranda_"]
        );
        assert_eq!(store.notes("u-002")[0].data, "!Hola Mundo!");
        assert_eq!(store.note("n-009").unwrap().data, "Hello, darkness!");
        assert!(store.note("n-010").is_none());
        assert!(store.notes("u-999").is_empty());
        assert!(store.user("u-999").is_none());
    }

    #[test]
    fn create_note_allocates_ids() {
        let store = NoteStore::seeded();
        let note = store.create_note("u-003", "We created a note!").unwrap();
        assert_eq!(
            note,
            Note {
                note_id: "n-010".to_string(),
                data: "We created a note!".to_string(),
            }
        );
        assert_eq!(store.create_note("u-001", "again").unwrap().note_id, "n-011");
        assert!(store.create_note("u-999", "nobody").is_none());
        assert_eq!(store.create_note("u-001", "next").unwrap().note_id, "n-012");
        assert_eq!(store.notes("u-003").len(), 4);
    }

    #[test]
    fn concurrent_creates() {
        let store = Arc::new(NoteStore::seeded());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || store.create_note("u-001", &format!("note {i}")).unwrap())
            })
            .collect();
        let mut ids: Vec<String> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().note_id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.notes("u-001").len(), 11);
    }

    #[test]
    fn user_json() {
        let store = NoteStore::seeded();
        assert_eq!(
            to_value(store.user("u-001").unwrap()).unwrap(),
            json!({ "userID": "u-001", "username": "CR7", "emoji": "🇵🇹" })
        );
        assert_eq!(
            to_value(store.note("n-004").unwrap()).unwrap(),
            json!({ "noteID": "n-004", "data": "!Hola Mundo!" })
        );
    }

    #[test(tokio::test)]
    async fn user_with_notes() {
        let engine = engine(Arc::new(NoteStore::seeded()), Configuration::default()).unwrap();
        let response = engine
            .execute(
                Request::builder()
                    .query("{ user(userID: \"u-003\") { username notes { noteID data } } }")
                    .build(),
            )
            .await;
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"data":{"user":{"username":"michaelmiranda_","notes":[{"noteID":"n-007","data":"Hello, world!"},{"noteID":"n-008","data":"Hello again, world!"},{"noteID":"n-009","data":"Hello, darkness!"}]}}}"#
        );
    }

    #[test(tokio::test)]
    async fn create_note_mutation() {
        let store = Arc::new(NoteStore::seeded());
        let engine = engine(store.clone(), Configuration::default()).unwrap();
        let response = engine
            .execute(
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
            )
            .await;
        assert_eq!(
            response.data,
            Some(json!({ "createNote": { "noteID": "n-010", "data": "We created a note!" } }))
        );
        assert_eq!(store.notes("u-003").len(), 4);

        let response = engine
            .execute(
                Request::builder()
                    .query("mutation { createNote(userID: \"u-999\", note: { data: \"x\" }) { noteID } }")
                    .build(),
            )
            .await;
        assert_eq!(response.data, None);
        insta::assert_snapshot!(
            serde_json::to_string(&response.errors).unwrap(),
            @r#"[{"message":"unknown user 'u-999'","path":["createNote"]}]"#
        );
    }
}
