use crate::{
    AppState,
    auth::CallerContext,
    error::ServiceError,
    models::{
        Article, CreateArticleRequest, CreateUserRequest, Role, UpdateArticleRequest,
        UpdateUserRequest, User,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// --- Account Handlers ---

/// register_user
///
/// [Public Route] Self-service registration. Requested role names in the
/// payload are ignored on this route; every self-registered account receives
/// the default role. Administrators create accounts with explicit roles
/// through the /admin route instead.
#[utoipa::path(
    post,
    path = "/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Missing username or password"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let candidate = CreateUserRequest {
        roles: Vec::new(),
        ..payload
    };
    let user = state.accounts.create_user(candidate).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// create_user
///
/// [Admin Route] Account creation with an explicit requested role set.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_user(
    caller: CallerContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    if !caller.is_admin() {
        return Err(ServiceError::Authorization(
            "creating accounts with explicit roles requires an administrator".to_string(),
        ));
    }
    let user = state.accounts.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_me
///
/// [Authenticated Route] The caller's own stored account record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Caller account", body = User))
)]
pub async fn get_me(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<User>, ServiceError> {
    match state.accounts.user_by_id(Some(caller.user_id)).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ServiceError::NotFound(
            "caller account not found".to_string(),
        )),
    }
}

/// list_users
///
/// [Authenticated Route] Lists User records visible to the caller: their own
/// record, or every record when they hold the blanket read authority. The
/// visibility filter runs on each call against the caller's context.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Visible accounts", body = [User]))
)]
pub async fn list_users(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ServiceError> {
    let users = state.accounts.list_users(&caller).await?;
    Ok(Json(users))
}

/// get_user
///
/// [Authenticated Route] Single account lookup by identifier.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "No such account")
    )
)]
pub async fn get_user(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ServiceError> {
    match state.accounts.user_by_id(Some(id)).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ServiceError::NotFound(format!(
            "user with id {id} not found"
        ))),
    }
}

/// get_user_by_username
///
/// [Authenticated Route] Single account lookup by unique username.
#[utoipa::path(
    get,
    path = "/users/by-username/{username}",
    params(("username" = String, Path, description = "Unique username")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "No such account")
    )
)]
pub async fn get_user_by_username(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ServiceError> {
    let user = state.accounts.user_by_username(&username).await?;
    Ok(Json(user))
}

/// update_user
///
/// [Authenticated Route] Applies a partial update to an existing account.
/// The stored credential is carried over untouched and a provided role list
/// is persisted exactly as given; only the `updated` timestamp is refreshed.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "No such account")
    )
)]
pub async fn update_user(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ServiceError> {
    let Some(mut user) = state.accounts.user_by_id(Some(id)).await? else {
        return Err(ServiceError::NotFound(format!(
            "user with id {id} not found"
        )));
    };

    if let Some(username) = payload.username {
        user.username = username;
    }
    if let Some(active) = payload.active {
        user.active = active;
    }
    if let Some(roles) = payload.roles {
        user.roles = roles;
    }

    let updated = state.accounts.update_user(user).await?;
    Ok(Json(updated))
}

/// delete_user
///
/// [Admin Route] Removes an account and returns the removed snapshot. The
/// administrative authority check runs inside the account service, before
/// the store is touched.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Removed snapshot", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "No such account")
    )
)]
pub async fn delete_user(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ServiceError> {
    let removed = state.accounts.delete_user(id, &caller).await?;
    Ok(Json(removed))
}

/// list_roles
///
/// [Admin Route] All Roles known to the Role Store.
#[utoipa::path(
    get,
    path = "/admin/roles",
    responses(
        (status = 200, description = "All roles", body = [Role]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_roles(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<Role>>, ServiceError> {
    if !caller.is_admin() {
        return Err(ServiceError::Authorization(
            "listing roles requires an administrator".to_string(),
        ));
    }
    let roles = state.accounts.roles().await?;
    Ok(Json(roles))
}

// --- Article Handlers (Plain CRUD, No Policy) ---

/// get_articles
///
/// [Public Route] Lists all articles, newest first.
#[utoipa::path(
    get,
    path = "/articles",
    responses((status = 200, description = "All articles", body = [Article]))
)]
pub async fn get_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, ServiceError> {
    let articles = state.repo.find_articles().await?;
    Ok(Json(articles))
}

/// get_article
///
/// [Public Route] Single article lookup.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "No such article")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>, ServiceError> {
    match state.repo.find_article_by_id(id).await? {
        Some(article) => Ok(Json(article)),
        None => Err(ServiceError::NotFound(format!(
            "article with id {id} not found"
        ))),
    }
}

/// create_article
///
/// [Authenticated Route] Submits a new article. Timestamps are stamped here;
/// the store assigns the identifier.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses((status = 201, description = "Created", body = Article))
)]
pub async fn create_article(
    _caller: CallerContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), ServiceError> {
    let now = Utc::now();
    let article = state
        .repo
        .create_article(Article {
            id: Uuid::nil(), // replaced by the store
            title: payload.title,
            content: payload.content,
            author: payload.author,
            created: now,
            updated: now,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_article
///
/// [Authenticated Route] Partial update of an existing article.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 404, description = "No such article")
    )
)]
pub async fn update_article(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<Article>, ServiceError> {
    let Some(mut article) = state.repo.find_article_by_id(id).await? else {
        return Err(ServiceError::NotFound(format!(
            "article with id {id} not found"
        )));
    };

    if let Some(title) = payload.title {
        article.title = title;
    }
    if let Some(content) = payload.content {
        article.content = content;
    }
    article.updated = Utc::now();

    match state.repo.update_article(article).await? {
        Some(updated) => Ok(Json(updated)),
        None => Err(ServiceError::NotFound(format!(
            "article with id {id} not found"
        ))),
    }
}

/// delete_article
///
/// [Authenticated Route] Removes an article.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such article")
    )
)]
pub async fn delete_article(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    match state.repo.delete_article(id).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ServiceError::NotFound(format!(
            "article with id {id} not found"
        ))),
    }
}
