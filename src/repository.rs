use crate::error::ServiceError;
use crate::models::{Article, Role, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract over the User, Role, and Article stores. Handlers and
/// the account service interact with persistence exclusively through this
/// trait, so the Postgres implementation and the in-memory test double are
/// interchangeable behind `Arc<dyn Repository>`.
///
/// Lookup methods signal "not found" with `Ok(None)`, never with an error;
/// errors are reserved for backend failures and uniqueness conflicts.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User Store ---
    /// All User records, ordered by creation time.
    async fn find_users(&self) -> Result<Vec<User>, ServiceError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError>;
    /// Inserts a new record. The store assigns the identifier; any id carried
    /// by the candidate is ignored. A duplicate username yields
    /// `ServiceError::Conflict`.
    async fn create_user(&self, user: User) -> Result<User, ServiceError>;
    /// Full-record update keyed on `user.id`. Returns `None` when no record
    /// with that id exists.
    async fn update_user(&self, user: User) -> Result<Option<User>, ServiceError>;
    /// Removes the record and returns the removed snapshot, or `None` when absent.
    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, ServiceError>;

    // --- Role Store ---
    async fn find_roles(&self) -> Result<Vec<Role>, ServiceError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError>;
    /// Inserts a new Role, assigning its identifier. A duplicate name yields
    /// `ServiceError::Conflict`; the caller recovers by re-reading.
    async fn save_role(&self, role: Role) -> Result<Role, ServiceError>;

    // --- Article Store ---
    async fn find_articles(&self) -> Result<Vec<Article>, ServiceError>;
    async fn find_article_by_id(&self, id: Uuid) -> Result<Option<Article>, ServiceError>;
    async fn create_article(&self, article: Article) -> Result<Article, ServiceError>;
    async fn update_article(&self, article: Article) -> Result<Option<Article>, ServiceError>;
    async fn delete_article(&self, id: Uuid) -> Result<Option<Article>, ServiceError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Error Mapping Helpers ---

fn storage(e: sqlx::Error) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

/// Translates a unique-constraint violation into `Conflict`, leaving every
/// other database failure as an opaque storage error.
fn conflict_or_storage(e: sqlx::Error, conflict_message: String) -> ServiceError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ServiceError::Conflict(conflict_message)
        }
        _ => storage(e),
    }
}

// --- The Postgres Implementation ---

/// PostgresRepository
///
/// Production implementation backed by a PostgreSQL pool. Uses the runtime
/// query API throughout; uniqueness on `users.username` and `roles.name` is
/// enforced by the schema, which is what resolves the concurrent-creation
/// races (the losing writer observes a conflict and re-reads).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, password, roles, active, created, updated";
const ARTICLE_COLUMNS: &str = "id, title, content, author, created, updated";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_users(&self) -> Result<Vec<User>, ServiceError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }

    async fn create_user(&self, user: User) -> Result<User, ServiceError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, password, roles, active, created, updated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(sqlx::types::Json(&user.roles))
        .bind(user.active)
        .bind(user.created)
        .bind(user.updated)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_storage(e, format!("username '{}' already exists", user.username))
        })
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET username = $2, password = $3, roles = $4, active = $5, updated = $6 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(sqlx::types::Json(&user.roles))
        .bind(user.active)
        .bind(user.updated)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_storage(e, format!("username '{}' already exists", user.username))
        })
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }

    async fn find_roles(&self) -> Result<Vec<Role>, ServiceError> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)
    }

    async fn save_role(&self, role: Role) -> Result<Role, ServiceError> {
        sqlx::query_as::<_, Role>("INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(Uuid::new_v4())
            .bind(&role.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_storage(e, format!("role '{}' already exists", role.name)))
    }

    async fn find_articles(&self) -> Result<Vec<Article>, ServiceError> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)
    }

    async fn find_article_by_id(&self, id: Uuid) -> Result<Option<Article>, ServiceError> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }

    async fn create_article(&self, article: Article) -> Result<Article, ServiceError> {
        sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles (id, title, content, author, created, updated) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.author)
        .bind(article.created)
        .bind(article.updated)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)
    }

    async fn update_article(&self, article: Article) -> Result<Option<Article>, ServiceError> {
        sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET title = $2, content = $3, updated = $4 \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.updated)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }

    async fn delete_article(&self, id: Uuid) -> Result<Option<Article>, ServiceError> {
        sqlx::query_as::<_, Article>(&format!(
            "DELETE FROM articles WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }
}

// --- The In-Memory Implementation (For Tests and Local Experiments) ---

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    roles: HashMap<String, Role>,
    articles: HashMap<Uuid, Article>,
}

/// MemoryRepository
///
/// An in-memory implementation of `Repository` used by the test suites and
/// usable for local experimentation without a database. A single mutex
/// guards all three stores, which also gives it the same uniqueness-under-
/// concurrency behavior as the schema constraints: of two racing creations
/// for one username, exactly one insert wins and the other observes a
/// conflict.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_users(&self) -> Result<Vec<User>, ServiceError> {
        let inner = self.lock();
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, mut user: User) -> Result<User, ServiceError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(ServiceError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        user.id = Uuid::new_v4();
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, ServiceError> {
        let mut inner = self.lock();
        if inner
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(ServiceError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        match inner.users.get_mut(&user.id) {
            Some(stored) => {
                // `created` and the identifier are immutable; everything else
                // is replaced wholesale.
                let mut replacement = user.clone();
                replacement.created = stored.created;
                *stored = replacement.clone();
                Ok(Some(replacement))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.lock().users.remove(&id))
    }

    async fn find_roles(&self) -> Result<Vec<Role>, ServiceError> {
        let inner = self.lock();
        let mut roles: Vec<Role> = inner.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError> {
        Ok(self.lock().roles.get(name).cloned())
    }

    async fn save_role(&self, mut role: Role) -> Result<Role, ServiceError> {
        let mut inner = self.lock();
        if inner.roles.contains_key(&role.name) {
            return Err(ServiceError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        role.id = Some(Uuid::new_v4());
        inner.roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }

    async fn find_articles(&self) -> Result<Vec<Article>, ServiceError> {
        let inner = self.lock();
        let mut articles: Vec<Article> = inner.articles.values().cloned().collect();
        articles.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(articles)
    }

    async fn find_article_by_id(&self, id: Uuid) -> Result<Option<Article>, ServiceError> {
        Ok(self.lock().articles.get(&id).cloned())
    }

    async fn create_article(&self, mut article: Article) -> Result<Article, ServiceError> {
        let mut inner = self.lock();
        article.id = Uuid::new_v4();
        inner.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update_article(&self, article: Article) -> Result<Option<Article>, ServiceError> {
        let mut inner = self.lock();
        match inner.articles.get_mut(&article.id) {
            Some(stored) => {
                let mut replacement = article.clone();
                replacement.created = stored.created;
                *stored = replacement.clone();
                Ok(Some(replacement))
            }
            None => Ok(None),
        }
    }

    async fn delete_article(&self, id: Uuid) -> Result<Option<Article>, ServiceError> {
        Ok(self.lock().articles.remove(&id))
    }
}
