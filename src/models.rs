use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Well-Known Role and Authority Names ---

/// Default role granted to every account created without an explicit role set.
pub const ROLE_USER: &str = "ROLE_USER";
/// Administrative role. Required for account deletion and the /admin routes.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
/// Blanket authority allowing its holder to see every User record in listings.
/// Granted automatically to holders of `ROLE_ADMIN`.
pub const ALL_USER_READ: &str = "ALL_USER_READ";

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// A named permission grouping assigned to Users. The `id` is assigned by the
/// Role Store at first save; until then it is `None`. Role names are unique
/// across the store, and two Roles compare equal when their names match,
/// regardless of identifier state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Role {
    pub id: Option<Uuid>,
    pub name: String,
}

impl Role {
    /// A Role reference that has not been persisted yet.
    pub fn named(name: impl Into<String>) -> Self {
        Role {
            id: None,
            name: name.into(),
        }
    }
}

// Equality is by name only: each User carries its own snapshot of the Roles it
// holds, and snapshots taken at different times may differ in identifier state.
impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Role {}

/// User
///
/// The canonical account record stored in the `users` table.
///
/// The `password` field holds the protected (salted, one-way hashed)
/// credential and is never serialized into API responses. The `roles` column
/// is a JSONB snapshot list owned by the record itself.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    /// Store-assigned identifier, immutable after creation.
    pub id: Uuid,
    pub username: String,
    /// Protected credential. Write-only at the API boundary.
    #[serde(skip_serializing, default)]
    #[schema(write_only)]
    pub password: String,
    #[sqlx(json)]
    pub roles: Vec<Role>,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Article
///
/// A plain content record from the `articles` table. Articles carry no access
/// policy; they exist as ordinary CRUD records alongside the account system.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Input payload for account creation (POST /register, POST /admin/users).
/// `roles` lists requested role names; unknown names are dropped during
/// resolution and an empty list selects the default role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /users/{id}. Only the provided fields are
/// changed; the stored credential is carried over untouched (updates never
/// re-hash) and a provided role list is stored exactly as given (updates never
/// re-resolve roles).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

/// CreateArticleRequest
///
/// Input payload for submitting a new article (POST /articles).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    pub author: String,
}

/// UpdateArticleRequest
///
/// Partial update payload for modifying an existing article (PUT /articles/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
