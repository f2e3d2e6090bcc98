use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Could not access {path}: {source}")]
    FileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not process markup in {path}: {message}")]
    MarkupError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown env: '{0}'")]
    UnknownEnvironment(String),

    #[error("Unknown platform: '{0}'")]
    UnknownPlatform(String),

    #[error("Invalid version '{version}': {reason}")]
    VersionError { version: String, reason: String },

    #[error("{} of {total} task(s) failed", errors.len())]
    TasksFailed {
        total: usize,
        errors: Vec<(String, BuildError)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    FileSystem,
    Configuration,
    Markup,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a command that failed with this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl BuildError {
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::FileError {
            path: path.into(),
            source,
        }
    }

    pub fn markup(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        BuildError::MarkupError {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        BuildError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::IoError(_) | BuildError::FileError { .. } => ErrorCategory::FileSystem,
            BuildError::SerializationError(_)
            | BuildError::ConfigError { .. }
            | BuildError::MissingConfigError { .. }
            | BuildError::InvalidConfigValueError { .. }
            | BuildError::VersionError { .. } => ErrorCategory::Configuration,
            BuildError::MarkupError { .. } => ErrorCategory::Markup,
            BuildError::UnknownEnvironment(_) | BuildError::UnknownPlatform(_) => {
                ErrorCategory::Input
            }
            BuildError::TasksFailed { errors, .. } => errors
                .first()
                .map(|(_, e)| e.category())
                .unwrap_or(ErrorCategory::FileSystem),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BuildError::UnknownEnvironment(_) | BuildError::UnknownPlatform(_) => {
                ErrorSeverity::Medium
            }
            BuildError::IoError(_) => ErrorSeverity::Critical,
            BuildError::TasksFailed { errors, .. } => errors
                .iter()
                .map(|(_, e)| e.severity())
                .max()
                .unwrap_or(ErrorSeverity::High),
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BuildError::IoError(_) => {
                "Check disk space and permissions in the project directory".to_string()
            }
            BuildError::FileError { path, .. } => {
                format!("Make sure '{}' exists and is accessible", path)
            }
            BuildError::SerializationError(_) => {
                "Check that the JSON files under _build/ are valid".to_string()
            }
            BuildError::MarkupError { path, .. } => {
                format!("Check that '{}' is well-formed", path)
            }
            BuildError::ConfigError { .. } | BuildError::MissingConfigError { .. } => {
                "Run `hybrid-build-kit setup` or review the files under _build/".to_string()
            }
            BuildError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            BuildError::UnknownEnvironment(_) => {
                "Use one of: browser, dev, testing, staging, production".to_string()
            }
            BuildError::UnknownPlatform(_) => "Use one of: android, ios, pwa".to_string(),
            BuildError::VersionError { .. } => {
                "Use a major.minor.patch version that fits the configured digit widths"
                    .to_string()
            }
            BuildError::TasksFailed { errors, .. } => errors
                .first()
                .map(|(_, e)| e.recovery_suggestion())
                .unwrap_or_default(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BuildError::TasksFailed { total, errors } => {
                let mut message = format!("{} of {} task(s) failed:", errors.len(), total);
                for (task, error) in errors {
                    message.push_str(&format!("\n  - {}: {}", task, error));
                }
                message
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
