use std::fmt::{self, Display};

use warp::http::StatusCode;

use crate::constants::describe_constraint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryErrorKind {
    UniqueViolation(Option<String>),
    ForeignKeyViolation(Option<String>),
    CheckViolation(Option<String>),
    RowNotFound,
    Other,
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    kind: QueryErrorKind,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            kind: QueryErrorKind::Other,
        }
    }

    /// A foreign key failure while inserting means the referenced row is gone.
    pub fn or_missing_reference(self, field: &str, message: &str) -> ApiError {
        match self.kind {
            QueryErrorKind::ForeignKeyViolation(_) => ApiError::validation(field, message),
            _ => self.into(),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let constraint = e.constraint().map(str::to_owned);
                let kind = if e.is_unique_violation() {
                    QueryErrorKind::UniqueViolation(constraint)
                } else if e.is_foreign_key_violation() {
                    QueryErrorKind::ForeignKeyViolation(constraint)
                } else if e.is_check_violation() {
                    QueryErrorKind::CheckViolation(constraint)
                } else {
                    QueryErrorKind::Other
                };

                Self {
                    info: format!("{e}"),
                    kind,
                }
            }
            sqlx::Error::RowNotFound => Self {
                info: String::from("RowNotFound"),
                kind: QueryErrorKind::RowNotFound,
            },
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(String::from("Unknown error")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cache error: {}", self.info)
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[derive(Debug)]
pub struct ConfigError {
    key: String,
}

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable {} must be set", self.key)
    }
}

impl std::error::Error for ConfigError {}

/// Failures surfaced to the caller of any SDK operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    Validation { field: String, message: String },
    EmptyCart,
    Unauthorized,
    Forbidden(String),
    Storage(String),
}

impl ApiError {
    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn conflict(info: &str) -> Self {
        Self::Conflict(info.to_string())
    }

    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn forbidden(info: &str) -> Self {
        Self::Forbidden(info.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation { .. } | ApiError::EmptyCart => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(info) => write!(f, "Not found: {info}"),
            ApiError::Conflict(info) => write!(f, "Conflict: {info}"),
            ApiError::Validation { field, message } => write!(f, "{field}: {message}"),
            ApiError::EmptyCart => write!(f, "The shopping cart is empty"),
            ApiError::Unauthorized => write!(f, "Authentication credentials were not provided"),
            ApiError::Forbidden(info) => write!(f, "Forbidden: {info}"),
            ApiError::Storage(info) => write!(f, "Storage error: {info}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl warp::reject::Reject for ApiError {}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        let described = |constraint: &Option<String>| {
            constraint
                .as_deref()
                .and_then(describe_constraint)
        };

        match &value.kind {
            QueryErrorKind::UniqueViolation(constraint) => match described(constraint) {
                Some((_, message)) => ApiError::conflict(message),
                None => ApiError::conflict("the row already exists"),
            },
            QueryErrorKind::CheckViolation(constraint) => match described(constraint) {
                Some((field, message)) => ApiError::validation(field, message),
                None => ApiError::validation("payload", &value.info),
            },
            QueryErrorKind::ForeignKeyViolation(constraint) => match described(constraint) {
                Some((_, message)) => ApiError::conflict(message),
                None => ApiError::not_found("the referenced row does not exist"),
            },
            QueryErrorKind::RowNotFound => ApiError::not_found("no rows returned"),
            QueryErrorKind::Other => {
                log::error!("Query failed: {}", value.info);
                ApiError::Storage(value.info)
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

impl From<TypeError> for ApiError {
    fn from(value: TypeError) -> Self {
        ApiError::validation("payload", &value.info)
    }
}

impl From<CacheError> for ApiError {
    fn from(value: CacheError) -> Self {
        ApiError::Storage(value.info)
    }
}

impl From<ConfigError> for ApiError {
    fn from(value: ConfigError) -> Self {
        ApiError::Storage(value.to_string())
    }
}

impl From<ApiError> for potion::Error {
    fn from(value: ApiError) -> Self {
        let code = match value {
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Validation { .. } | ApiError::EmptyCart => 400,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::Storage(_) => 500,
        };

        potion::Error {
            code,
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}
