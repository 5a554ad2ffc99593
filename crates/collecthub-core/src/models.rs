//! Collection documents as exposed over the API.
//!
//! Every model reads `_id` (store form) or `id` (API form) and writes `id`.
//! Fields missing from a request body default to empty values.

use crate::{store::Document, CollectHubError, RecordId, Result, UserId, ID_FIELD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// A user-owned collection type with the standard CRUD surface.
pub trait CollectionModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Backing collection name; also the URL segment.
    const COLLECTION: &'static str;
    /// Singular noun used in response messages.
    const NOUN: &'static str;

    /// Fields to `$set` on update: every non-empty field of `self`.
    fn update_fields(&self) -> Document;

    /// Store representation, without any API-side `id`.
    fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(map)
            }
            other => Err(CollectHubError::Storage(format!(
                "{} did not serialize to an object: {}",
                Self::NOUN,
                other
            ))),
        }
    }

    fn from_document(document: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(document))?)
    }
}

fn set_text(fields: &mut Document, name: &str, value: &str) {
    if !value.is_empty() {
        fields.insert(name.to_string(), Value::String(value.to_string()));
    }
}

fn set_user(fields: &mut Document, user_id: &Option<UserId>) {
    if let Some(user_id) = user_id {
        fields.insert("user_id".to_string(), Value::String(user_id.to_hex()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub book_name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Book {
    const COLLECTION: &'static str = "books";
    const NOUN: &'static str = "book";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "book_name", &self.book_name);
        set_text(&mut fields, "author", &self.author);
        set_text(&mut fields, "reason", &self.reason);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: String,
    /// e.g. "movie" or "series"
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Movie {
    const COLLECTION: &'static str = "movies";
    const NOUN: &'static str = "movie";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "title", &self.title);
        set_text(&mut fields, "type", &self.kind);
        set_text(&mut fields, "reason", &self.reason);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Pet {
    const COLLECTION: &'static str = "pets";
    const NOUN: &'static str = "pet";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "name", &self.name);
        set_text(&mut fields, "reason", &self.reason);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Quote {
    const COLLECTION: &'static str = "quotes";
    const NOUN: &'static str = "quote";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "quote", &self.quote);
        set_text(&mut fields, "author", &self.author);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Recipe {
    const COLLECTION: &'static str = "recipes";
    const NOUN: &'static str = "recipe";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "name", &self.name);
        set_text(&mut fields, "ingredients", &self.ingredients);
        set_text(&mut fields, "reason", &self.reason);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

/// A visited place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Travel {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub place_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_visited: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CollectionModel for Travel {
    const COLLECTION: &'static str = "travels";
    const NOUN: &'static str = "travel";

    fn update_fields(&self) -> Document {
        let mut fields = Document::new();
        set_text(&mut fields, "place_name", &self.place_name);
        if let Some(date) = &self.date_visited {
            fields.insert(
                "date_visited".to_string(),
                Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
        set_text(&mut fields, "reason", &self.reason);
        set_user(&mut fields, &self.user_id);
        fields
    }
}

/// Stored account. `password` holds the password hash once persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    /// Store form, keyed by `_id` so the store keeps the generated id.
    pub fn to_document(&self) -> Result<Document> {
        let mut map = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(CollectHubError::Storage("user did not serialize to an object".into())),
        };
        if let Some(id) = map.remove("id") {
            map.insert(ID_FIELD.to_string(), id);
        }
        Ok(map)
    }

    pub fn from_document(document: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(document))?)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of a user, never carrying the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
