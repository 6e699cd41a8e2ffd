use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use models::{user::UserPayload, User};

use crate::errors::JsonApiError;
use crate::routes::AppState;

/// 创建用户
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<User>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), JsonApiError> {
    let Json(user) = payload?;
    let created = state.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// 列出全部用户（按 email 排序，无数据时返回空数组）
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, JsonApiError> {
    Ok(Json(state.users.list_users().await?))
}

/// 获取指定用户
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>, JsonApiError> {
    Ok(Json(state.users.get_user(&email).await?))
}

/// 整体替换指定用户；路径中的 email 优先于请求体
pub async fn update_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<User>, JsonApiError> {
    let Json(payload) = payload?;
    let updated = state.users.update_user(payload.into_user(email)).await?;
    Ok(Json(updated))
}

/// 删除指定用户
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    state.users.delete_user(&email).await?;
    Ok(StatusCode::NO_CONTENT)
}
