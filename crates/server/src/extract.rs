use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use horizon_core::errors::FieldError;
use horizon_core::requests::{
    ApplicationContentRequest, BrainstormRequest, ChatRequest, CreateProjectRequest,
    KnowledgeSearchRequest, PartnerSearchRequest, UpdateProjectRequest,
};

use crate::error::AppError;

/// Request bodies that carry checks serde cannot express.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

macro_rules! validate_via_inherent {
    ($($request:ty),+ $(,)?) => {
        $(impl Validate for $request {
            fn validate(&self) -> Vec<FieldError> {
                <$request>::validate(self)
            }
        })+
    };
}

validate_via_inherent!(
    ApplicationContentRequest,
    BrainstormRequest,
    ChatRequest,
    CreateProjectRequest,
    KnowledgeSearchRequest,
    PartnerSearchRequest,
    UpdateProjectRequest,
);

/// JSON body that has been decoded and validated. Any failure is a 422 with
/// field-level details, so malformed input never reaches a tool.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| AppError::Validation(vec![rejection_detail(&rejection)]))?;

        let errors = value.validate();
        if errors.is_empty() {
            Ok(Self(value))
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn rejection_detail(rejection: &JsonRejection) -> FieldError {
    let message = rejection.body_text();
    let field = missing_field(&message).unwrap_or("body");
    FieldError::new(field, message.clone())
}

/// serde reports absent fields as "missing field `name`".
fn missing_field(message: &str) -> Option<&str> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    rest.find('`').map(|end| &rest[..end])
}
