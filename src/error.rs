//! Error types for model fitting/prediction and for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the outlier detectors and the ensemble.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("{model} has not been fitted")]
    NotFitted { model: String },

    #[error("{model} cannot be fitted on an empty dataset")]
    EmptyTrainingSet { model: String },

    #[error("{model} needs at least {required} training rows, got {actual}")]
    TooFewRows {
        model: String,
        required: usize,
        actual: usize,
    },

    #[error("{model} expects {expected} features, got {actual}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid parameter for {model}: {reason}")]
    InvalidParameter { model: String, reason: String },
}

/// Errors surfaced by the prediction API.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("Internal server error: {context}")]
    Internal { context: String },
}

impl AppError {
    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Detector(DetectorError::DimensionMismatch { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Detector(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Detector(_) => "model_error",
            AppError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let not_fitted = AppError::from(DetectorError::NotFitted {
            model: "lof".to_string(),
        });
        assert_eq!(not_fitted.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(not_fitted.error_type(), "model_error");

        let mismatch = AppError::from(DetectorError::DimensionMismatch {
            model: "iforest".to_string(),
            expected: 44,
            actual: 40,
        });
        assert_eq!(mismatch.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(mismatch.to_string(), "iforest expects 44 features, got 40");
    }
}
