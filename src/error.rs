// src/error.rs

use std::fmt;

/// Failures raised by the scene runtime.
///
/// None of these are retryable. A resource error is fatal for the scene
/// instance that raised it.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Invalid parameter declaration, value or generator input.
    Configuration(String),
    /// The rendering backend could not allocate or compile something.
    Resource(String),
    /// Operation invoked in a lifecycle state that does not allow it.
    State(String),
}

impl SceneError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SceneError::Configuration(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        SceneError::Resource(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        SceneError::State(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SceneError::Configuration(_))
    }
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            SceneError::Resource(msg) => write!(f, "resource error: {}", msg),
            SceneError::State(msg) => write!(f, "state error: {}", msg),
        }
    }
}

impl std::error::Error for SceneError {}
