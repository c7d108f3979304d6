use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::db::StoreError;
use crate::users::password::PasswordError;

/// Error returned by handlers and middleware. Every variant renders as a JSON
/// envelope: `{"errors": {field: message}}` for validation failures and
/// `{"error": message}` for everything else.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed validation")]
    Validation(BTreeMap<String, String>),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("resource not found")]
    NotFound,
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error("edit conflict")]
    EditConflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid authentication token")]
    InvalidAuthToken,
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("inactive account")]
    InactiveAccount,
    #[error("permission denied")]
    NotPermitted,
    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl AppError {
    pub fn field(key: &str, message: &str) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(key.to_string(), message.to_string());
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::EditConflict => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidAuthToken
            | AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::InactiveAccount | AppError::NotPermitted => StatusCode::FORBIDDEN,
            AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(_) => "failed validation".into(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound => "the requested resource could not be found".into(),
            AppError::MethodNotAllowed(method) => {
                format!("the {method} method is not supported for this resource")
            }
            AppError::EditConflict => {
                "unable to update the record due to an edit conflict, please try again".into()
            }
            AppError::InvalidCredentials => "invalid authentication credentials".into(),
            AppError::InvalidAuthToken => "invalid or missing authentication token".into(),
            AppError::AuthenticationRequired => {
                "you must be authenticated to access this resource".into()
            }
            AppError::InactiveAccount => {
                "your user account must be activated to access this resource".into()
            }
            AppError::NotPermitted => {
                "your user account doesn't have the necessary permissions to access this resource"
                    .into()
            }
            AppError::Server(_) => {
                "the server encountered a problem and could not process your request".into()
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound => AppError::NotFound,
            StoreError::EditConflict => AppError::EditConflict,
            StoreError::DuplicateEmail => {
                AppError::field("email", "a user with this email address already exists")
            }
            StoreError::TokenNotFound => AppError::InvalidAuthToken,
            other => AppError::Server(anyhow::Error::new(other)),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Server(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({ "errors": errors }),
            AppError::Server(e) => {
                error!(error = ?e, "server error");
                json!({ "error": self.message() })
            }
            _ => json!({ "error": self.message() }),
        };

        let mut res = (status, Json(body)).into_response();
        if matches!(self, AppError::InvalidAuthToken) {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn store_errors_are_classified() {
        assert!(matches!(AppError::from(StoreError::RecordNotFound), AppError::NotFound));
        assert!(matches!(AppError::from(StoreError::EditConflict), AppError::EditConflict));
        assert!(matches!(
            AppError::from(StoreError::TokenNotFound),
            AppError::InvalidAuthToken
        ));
        assert!(matches!(
            AppError::from(StoreError::Timeout(std::time::Duration::from_secs(3))),
            AppError::Server(_)
        ));
        match AppError::from(StoreError::DuplicateEmail) {
            AppError::Validation(errors) => assert!(errors.contains_key("email")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EditConflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::MethodNotAllowed(Method::PUT).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(AppError::NotPermitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InactiveAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AuthenticationRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::field("name", "must be provided").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn validation_envelope_lists_fields() {
        let res = AppError::field("name", "must be provided").into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(res).await;
        assert_eq!(body["errors"]["name"], "must be provided");
    }

    #[tokio::test]
    async fn server_error_hides_details() {
        let res = AppError::Server(anyhow::anyhow!("connection refused to 10.0.0.5")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        let msg = body["error"].as_str().unwrap();
        assert!(!msg.contains("10.0.0.5"));
    }

    #[test]
    fn invalid_token_sets_www_authenticate() {
        let res = AppError::InvalidAuthToken.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
