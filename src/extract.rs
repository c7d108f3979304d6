use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Request bodies larger than this are rejected before deserialization.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// `Json<T>` whose rejections render through the app's error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::BadRequest(describe(rejection))),
        }
    }
}

fn describe(rejection: JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonSyntaxError(_) => "body contains badly-formed JSON".into(),
        JsonRejection::MissingJsonContentType(_) => {
            "body must be sent with Content-Type: application/json".into()
        }
        other => other.body_text(),
    }
}
