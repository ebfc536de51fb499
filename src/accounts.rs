use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::CallerContext,
    credential::ProtectorState,
    error::ServiceError,
    models::{ALL_USER_READ, CreateUserRequest, ROLE_ADMIN, ROLE_USER, Role, User},
    repository::RepositoryState,
};

/// AccountService
///
/// Orchestrates the account lifecycle: creation (role resolution, credential
/// protection, timestamp stamping), update, lookup, deletion, and listing.
/// Each operation is a single request/response cycle with no suspended state;
/// the service holds only the store handle and the injected credential
/// protector.
pub struct AccountService {
    repo: RepositoryState,
    protector: ProtectorState,
}

/// AccountsState
///
/// The concrete type used to share the account service across the
/// application state.
pub type AccountsState = Arc<AccountService>;

impl AccountService {
    pub fn new(repo: RepositoryState, protector: ProtectorState) -> Self {
        Self { repo, protector }
    }

    // --- Role Resolution ---

    /// resolve_roles
    ///
    /// Normalizes a list of requested role names against the Role Store.
    ///
    /// An empty request selects the default role, creating it in the store if
    /// it does not exist yet. Otherwise each name is looked up in request
    /// order; names that do not resolve are dropped with a warning, and
    /// duplicates are kept as requested. A request naming only unknown roles
    /// therefore resolves to an empty set (see DESIGN.md for the rationale).
    pub async fn resolve_roles(&self, requested: &[String]) -> Result<Vec<Role>, ServiceError> {
        if requested.is_empty() {
            return Ok(vec![self.ensure_role(ROLE_USER).await?]);
        }

        let mut resolved = Vec::with_capacity(requested.len());
        for name in requested {
            match self.repo.find_role_by_name(name).await? {
                Some(role) => resolved.push(role),
                None => {
                    tracing::warn!(role = %name, "requested role does not exist, dropping it");
                }
            }
        }
        Ok(resolved)
    }

    /// ensure_role
    ///
    /// Returns the named Role, creating it if absent. Two concurrent callers
    /// may both observe "absent" and both insert; the store's uniqueness
    /// constraint lets exactly one insert win and the loser recovers here by
    /// re-reading the surviving record.
    pub async fn ensure_role(&self, name: &str) -> Result<Role, ServiceError> {
        if let Some(role) = self.repo.find_role_by_name(name).await? {
            return Ok(role);
        }

        match self.repo.save_role(Role::named(name)).await {
            Err(ServiceError::Conflict(_)) => self
                .repo
                .find_role_by_name(name)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("role '{name}' not found"))),
            other => other,
        }
    }

    // --- Account Lifecycle ---

    /// create_user
    ///
    /// Validates the candidate, stamps `created`/`updated`, resolves the
    /// requested roles, protects the credential, activates the account, and
    /// performs exactly one store write. Returns the stored record carrying
    /// the store-assigned identifier. A username collision surfaces as a
    /// `Conflict`; this operation does not recover it.
    pub async fn create_user(&self, candidate: CreateUserRequest) -> Result<User, ServiceError> {
        if candidate.username.trim().is_empty() {
            return Err(ServiceError::Validation {
                field: "username",
                message: "must not be blank",
            });
        }
        if candidate.password.is_empty() {
            return Err(ServiceError::Validation {
                field: "password",
                message: "must not be empty",
            });
        }

        let now = Utc::now();
        let roles = self.resolve_roles(&candidate.roles).await?;
        let password = self.protector.protect(&candidate.password)?;

        let stored = self
            .repo
            .create_user(User {
                id: Uuid::nil(), // replaced by the store
                username: candidate.username,
                password,
                roles,
                active: true,
                created: now,
                updated: now,
            })
            .await?;

        tracing::info!(id = %stored.id, username = %stored.username, "user account created");
        Ok(stored)
    }

    /// create_user_if_absent
    ///
    /// Idempotent creation keyed on username: an existing record is returned
    /// unchanged without any store write. The check-then-create race with a
    /// concurrent identical request is recovered by re-reading when the store
    /// reports the conflict, so both callers end up with the same record.
    pub async fn create_user_if_absent(
        &self,
        candidate: CreateUserRequest,
    ) -> Result<User, ServiceError> {
        if let Some(existing) = self.repo.find_user_by_username(&candidate.username).await? {
            return Ok(existing);
        }

        let username = candidate.username.clone();
        match self.create_user(candidate).await {
            Err(ServiceError::Conflict(_)) => self
                .repo
                .find_user_by_username(&username)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("user '{username}' not found after conflict"))
                }),
            other => other,
        }
    }

    /// update_user
    ///
    /// Persists the update as-is after refreshing the `updated` timestamp:
    /// the credential field is stored verbatim (no re-hash) and the role list
    /// is stored as given (no re-resolution). The update must reference an
    /// existing identifier.
    pub async fn update_user(&self, mut update: User) -> Result<User, ServiceError> {
        let id = update.id;
        update.updated = Utc::now();
        self.repo
            .update_user(update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user with id {id} not found")))
    }

    // --- Lookup ---

    /// user_by_id
    ///
    /// `Ok(None)` when no identifier was supplied at all; `Err(NotFound)`
    /// when an identifier was supplied but no record carries it. The two
    /// cases are deliberately distinct.
    pub async fn user_by_id(&self, id: Option<Uuid>) -> Result<Option<User>, ServiceError> {
        let Some(id) = id else {
            return Ok(None);
        };
        self.repo
            .find_user_by_id(id)
            .await?
            .map(Some)
            .ok_or_else(|| ServiceError::NotFound(format!("user with id {id} not found")))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User, ServiceError> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("credentials subject '{username}' not found"))
            })
    }

    // --- Deletion (Policy-Gated) ---

    /// delete_user
    ///
    /// Removes an account and returns the removed snapshot. The caller must
    /// hold the `ROLE_ADMIN` authority; the check runs before the store is
    /// touched, so an unauthorized call leaves the store unchanged.
    pub async fn delete_user(
        &self,
        id: Uuid,
        caller: &CallerContext,
    ) -> Result<User, ServiceError> {
        if !caller.has_authority(ROLE_ADMIN) {
            return Err(ServiceError::Authorization(format!(
                "deleting accounts requires the {ROLE_ADMIN} authority"
            )));
        }

        let removed = self
            .repo
            .delete_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user with id {id} not found")))?;

        tracing::info!(id = %removed.id, username = %removed.username, "user account deleted");
        Ok(removed)
    }

    // --- Listing ---

    /// list_users
    ///
    /// All User records, passed through the visibility filter for the given
    /// caller. The filter runs on every call because the authority context
    /// differs per caller.
    pub async fn list_users(&self, caller: &CallerContext) -> Result<Vec<User>, ServiceError> {
        let users = self.repo.find_users().await?;
        Ok(filter_visible(users, caller))
    }

    /// All Roles known to the Role Store.
    pub async fn roles(&self) -> Result<Vec<Role>, ServiceError> {
        self.repo.find_roles().await
    }
}

// --- Pure Policy Functions ---

/// filter_visible
///
/// Row-level visibility rule for User listings: a record is retained iff it
/// belongs to the caller or the caller holds the blanket `ALL_USER_READ`
/// authority. Pure and order-preserving; applied in-process after the query,
/// never as a database predicate.
pub fn filter_visible(users: Vec<User>, caller: &CallerContext) -> Vec<User> {
    if caller.has_authority(ALL_USER_READ) {
        return users;
    }
    users
        .into_iter()
        .filter(|user| user.id == caller.user_id)
        .collect()
}

/// authorities_for_roles
///
/// Expands a role snapshot list into the caller's granted authorities: every
/// role name is itself an authority, and `ROLE_ADMIN` additionally grants the
/// blanket `ALL_USER_READ`.
pub fn authorities_for_roles(roles: &[Role]) -> Vec<String> {
    let mut authorities: Vec<String> = roles.iter().map(|role| role.name.clone()).collect();
    if roles.iter().any(|role| role.name == ROLE_ADMIN) {
        authorities.push(ALL_USER_READ.to_string());
    }
    authorities
}
