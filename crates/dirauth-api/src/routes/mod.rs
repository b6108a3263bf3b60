//! HTTP handlers for the authentication gateway

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dirauth_core::types::{AuthOutcome, Credential, IdentityRecord};
use dirauth_core::Error;
use tracing::{debug, error, warn};

use crate::metrics::AuthResult;
use crate::server::AppState;
use std::any::Any;

/// Error response: fixed public message, details only in the logs
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_server_error() {
            error!(code = err.code(), "{}", err);
        } else {
            debug!(code = err.code(), "{}", err);
        }

        (
            status,
            Json(IdentityRecord::status(false, err.public_message())),
        )
            .into_response()
    }
}

/// Turns a panic inside a handler into the generic server error response
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    ApiError(Error::InternalError(format!("handler panicked: {}", detail))).into_response()
}

/// GET / and unknown routes
pub async fn not_found() -> Response {
    ApiError(Error::NotFound).into_response()
}

/// GET /api
pub async fn service_info() -> Json<IdentityRecord> {
    Json(IdentityRecord::status(true, "LDAP Auth Service."))
}

/// POST /api/auth
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<Credential>, JsonRejection>,
) -> Result<Json<IdentityRecord>, ApiError> {
    let result = match payload {
        Ok(Json(credential)) => match credential.validate() {
            Ok(()) => {
                state
                    .authenticator
                    .authenticate(&credential.username, &credential.password)
                    .await
            }
            Err(e) => Err(e),
        },
        Err(rejection) => Err(Error::InvalidRequest(rejection.body_text())),
    };

    match result {
        Ok(outcome) => {
            state.metrics.record_auth(match outcome {
                AuthOutcome::Verified(_) => AuthResult::Verified,
                AuthOutcome::ProfileIncomplete { .. } => AuthResult::ProfileIncomplete,
            });
            Ok(Json(outcome.into_record()))
        }
        Err(err) => {
            if let Error::InvalidRequest(ref reason) = err {
                warn!("Request Data invalid: {}", reason);
            }
            state.metrics.record_auth(AuthResult::from_error(&err));
            Err(err.into())
        }
    }
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<IdentityRecord>>, ApiError> {
    match state.query.list_users().await {
        Ok(users) => {
            state.metrics.record_listing(Some(users.len()));
            Ok(Json(users))
        }
        Err(err) => {
            state.metrics.record_listing(None);
            Err(err.into())
        }
    }
}
