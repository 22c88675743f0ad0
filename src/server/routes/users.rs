use super::InternalError;
use crate::data_gateway::{Filter, Record, RecordStore};
use crate::server::state::ServerState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Columns never exposed over the API.
fn sanitize(mut user: Record) -> Record {
    user.remove("password");
    user.remove("verification_token");
    user
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

pub async fn create_user(
    State(state): State<ServerState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Record>), InternalError> {
    let mut values = Record::new();
    values.insert("id".to_string(), Uuid::new_v4().to_string().into());
    values.insert("email".to_string(), request.email.into());
    values.insert("name".to_string(), request.name.into());
    values.insert("created_at".to_string(), Utc::now().timestamp().into());

    let created = state.gateway.create("users", values)?;
    Ok((StatusCode::CREATED, Json(sanitize(created))))
}

pub async fn list_users(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Record>>, InternalError> {
    let users = state.gateway.find_many("users", &Filter::new())?;
    Ok(Json(users.into_iter().map(sanitize).collect()))
}

pub async fn count_users(
    State(state): State<ServerState>,
) -> Result<Json<serde_json::Value>, InternalError> {
    let count = state.gateway.count("users", &Filter::new())?;
    Ok(Json(json!({ "count": count })))
}
