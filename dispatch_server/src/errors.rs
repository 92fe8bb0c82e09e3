use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use dispatch_engine::{queue::QueueError, traits::CrmError, DispatchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) | Self::BackendError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Dispatch(e) => match e {
                DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
                DispatchError::Resolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::Queue(QueueError::Provider(_)) => StatusCode::BAD_GATEWAY,
                DispatchError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
                DispatchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                DispatchError::Crm(CrmError::TransferNotFound(_)) => StatusCode::NOT_FOUND,
                DispatchError::Crm(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            // Itemize the broken rules so the operator console can show them all at once.
            Self::Dispatch(DispatchError::Validation(failures)) => serde_json::json!({
                "success": false,
                "error": "Order failed validation",
                "failures": failures.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
            }),
            other => serde_json::json!({ "success": false, "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}
