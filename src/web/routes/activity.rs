use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::RosterError;
use crate::models::{ErrorResponse, MessageResponse};
use crate::services::roster_service;
use crate::web::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    // A missing parameter is the same bad input as an empty one.
    fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

// Malformed query strings (e.g. a repeated `email`) still answer with the
// `{detail, error}` payload.
fn email_query(query: Result<Query<EmailQuery>, QueryRejection>) -> Result<EmailQuery, ApiError> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(rejection) => Err(roster_error_response(RosterError::Validation(format!(
            "Invalid query string: {}",
            rejection.body_text()
        )))),
    }
}

pub async fn signup_handler(
    State(store): State<AppState>,
    Path(activity_name): Path<String>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let query = email_query(query)?;
    let email = query.email();
    store
        .signup(&activity_name, email)
        .await
        .map_err(roster_error_response)?;

    Ok(Json(MessageResponse {
        message: roster_service::signup_message(&activity_name, email),
    }))
}

pub async fn unregister_handler(
    State(store): State<AppState>,
    Path(activity_name): Path<String>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let query = email_query(query)?;
    let email = query.email();
    store
        .unregister(&activity_name, email)
        .await
        .map_err(roster_error_response)?;

    Ok(Json(MessageResponse {
        message: roster_service::unregister_message(&activity_name, email),
    }))
}

pub fn status_for(err: &RosterError) -> StatusCode {
    match err {
        RosterError::NotFound => StatusCode::NOT_FOUND,
        RosterError::DuplicateRegistration
        | RosterError::CapacityExceeded
        | RosterError::NotRegistered
        | RosterError::Conflict(_) => StatusCode::CONFLICT,
        RosterError::Validation(_) => StatusCode::BAD_REQUEST,
        RosterError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn roster_error_response(err: RosterError) -> ApiError {
    (
        status_for(&err),
        Json(ErrorResponse {
            detail: err.to_string(),
            error: Some(err.code().to_string()),
        }),
    )
}
