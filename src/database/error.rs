use std::fmt::{self, Display};

use potion::Error;

use super::schema::Uuid;

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::AnyDriverError(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        log::error!("Query failed: {}", value.info);
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

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

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Rejections a caller can cause. None of them are retried; each maps onto one HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoodgramError {
    DuplicateIngredient { id: Uuid, name: String },
    InvalidCookingTime(i32),
    InvalidAmount { id: Uuid, amount: i32 },
    MissingField(&'static str),
    TooManyIngredients { count: usize, max: usize },
    SelfSubscription,
    DuplicateSubscription,
    AlreadyInFavorites,
    AlreadyInShoppingCart,
    NotFound(String),
    Unauthorized,
    Forbidden,
    InvalidCredentials,
    SamePassword,
    InvalidUsername(String),
    UserExists,
    InvalidQuery(String),
}

impl FoodgramError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(what.to_owned())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            _ => 400,
        }
    }
}

impl Display for FoodgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIngredient { name, .. } => write!(
                f,
                "Ingredient <{name}> was added more than once, which is not allowed"
            ),
            Self::InvalidCookingTime(_) => write!(f, "Cooking time must be at least 1 minute"),
            Self::InvalidAmount { id, amount } => {
                write!(f, "Amount of ingredient {id} must be at least 1 (got {amount})")
            }
            Self::MissingField(field) => write!(f, "Field '{field}' is required"),
            Self::TooManyIngredients { count, max } => {
                write!(f, "A recipe may list at most {max} ingredients (got {count})")
            }
            Self::SelfSubscription => write!(f, "You cannot subscribe to yourself"),
            Self::DuplicateSubscription => {
                write!(f, "You are already subscribed to this user")
            }
            Self::AlreadyInFavorites => write!(f, "Recipe is already in favorites"),
            Self::AlreadyInShoppingCart => write!(f, "Recipe is already in the shopping cart"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::Unauthorized => write!(f, "Authentication credentials were not provided"),
            Self::Forbidden => write!(f, "You don't have permission to perform this action"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::SamePassword => {
                write!(f, "New password must differ from the current one")
            }
            Self::InvalidUsername(username) => {
                write!(f, "Username '{username}' contains invalid characters")
            }
            Self::UserExists => write!(f, "A user with this username or email already exists"),
            Self::InvalidQuery(info) => write!(f, "Invalid query parameter: {info}"),
        }
    }
}

impl std::error::Error for FoodgramError {}

impl From<FoodgramError> for Error {
    fn from(value: FoodgramError) -> Self {
        Error {
            code: value.status_code().into(),
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}
