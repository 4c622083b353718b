use crate::models::ModelKind;
use thiserror::Error;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{operation} is not supported by the {model} model")]
    UnsupportedOperation {
        model: ModelKind,
        operation: &'static str,
    },

    #[error("size mismatch on {what}: got {got}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Builds a configuration error and logs it before handing it back.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        log::error!("{message}");
        ModelError::Configuration(message)
    }

    /// Builds an unsupported-operation error and logs it before handing it back.
    pub fn unsupported(model: ModelKind, operation: &'static str) -> Self {
        log::error!("Model not supported: {model} cannot run {operation}");
        ModelError::UnsupportedOperation { model, operation }
    }

    pub fn shape_mismatch(what: &'static str, got: usize, expected: usize) -> Self {
        log::error!("Shape mismatch on {what}: got {got}, expected {expected}");
        ModelError::ShapeMismatch {
            what,
            got,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ModelError::unsupported(ModelKind::Tree, "train_icarl");
        assert_eq!(
            err.to_string(),
            "train_icarl is not supported by the tree model"
        );

        let err = ModelError::shape_mismatch("y_outlier", 3, 4);
        assert_eq!(err.to_string(), "size mismatch on y_outlier: got 3, expected 4");
    }

    #[test]
    fn configuration_keeps_message() {
        let err = ModelError::configuration("Task not supported: ranking");
        assert!(matches!(err, ModelError::Configuration(ref m) if m == "Task not supported: ranking"));
    }
}
