use super::InternalError;
use crate::data_gateway::{Filter, Record, RecordStore};
use crate::job_queue::{
    EmailVerificationPayload, ForgotPasswordPayload, JOB_TYPE_EMAIL_VERIFICATION,
    JOB_TYPE_FORGOT_PASSWORD,
};
use crate::server::state::ServerState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Registers a user within the ambient tenant and enqueues the verification
/// email. The email itself is sent later by the job dispatcher.
pub async fn register(
    State(state): State<ServerState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, InternalError> {
    let existing = state
        .gateway
        .find_first("users", &Filter::new().eq("email", request.email.as_str()))?;
    if let Some(existing) = existing {
        let verified = existing
            .get("email_verified_at")
            .map(|v| v.as_integer().is_some())
            .unwrap_or(false);
        let message = if verified {
            "Email is already taken and verified"
        } else {
            "Email is already registered but not yet verified"
        };
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message })),
        )
            .into_response());
    }

    let verification_token = Uuid::new_v4().to_string();
    let mut values = Record::new();
    values.insert("id".to_string(), Uuid::new_v4().to_string().into());
    values.insert("email".to_string(), request.email.as_str().into());
    values.insert("name".to_string(), request.name.as_str().into());
    values.insert("password".to_string(), request.password.into());
    values.insert(
        "verification_token".to_string(),
        verification_token.as_str().into(),
    );
    values.insert("created_at".to_string(), Utc::now().timestamp().into());
    let mut created = state.gateway.create("users", values)?;

    let payload = EmailVerificationPayload {
        email: request.email,
        name: request.name,
        token: verification_token,
        password: None,
    };
    state.job_store.enqueue(
        JOB_TYPE_EMAIL_VERIFICATION,
        &serde_json::to_value(&payload)?,
    )?;

    created.remove("password");
    created.remove("verification_token");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Always answers 202 with the same body, whether or not the email matches a
/// user, so the endpoint cannot be used to probe for registered addresses.
pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Response, InternalError> {
    let user = state
        .gateway
        .find_first("users", &Filter::new().eq("email", request.email.as_str()))?;

    if let Some(user) = user {
        let name = user
            .get("name")
            .and_then(|v| v.as_text())
            .unwrap_or_default()
            .to_string();
        // The reset token must be on the row before the email goes out,
        // otherwise the mailed link can never be redeemed.
        let token = Uuid::new_v4().to_string();
        let mut values = Record::new();
        values.insert("verification_token".to_string(), token.as_str().into());
        state.gateway.update(
            "users",
            &Filter::new().eq("email", request.email.as_str()),
            values,
        )?;

        let payload = ForgotPasswordPayload {
            email: request.email,
            name,
            token,
        };
        state
            .job_store
            .enqueue(JOB_TYPE_FORGOT_PASSWORD, &serde_json::to_value(&payload)?)?;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the address is registered, a reset email is on its way" })),
    )
        .into_response())
}
