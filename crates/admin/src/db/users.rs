//! User repository for database operations.
//!
//! Covers both roles: the customer listing and block flag for the admin
//! views, and the per-request account lookup the auth extractors make.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use larder_core::listing::{ListRequest, Page};
use larder_core::{CustomerState, Email, Role, UserId};

use super::RepositoryError;
use super::listing::{like_pattern, limit_offset, row_total};
use crate::models::{CustomerDetail, User};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    phone: Option<String>,
    role: Role,
    is_blocked: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            phone: row.phone,
            role: row.role,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.phone, u.role, u.is_blocked, u.created_at";

/// Customer listing predicate. `$1` is an `ILIKE` pattern, `$2` the blocked flag.
const CUSTOMER_FILTER: &str = r"
    u.role = 'customer'
    AND ($1::text IS NULL
         OR u.username ILIKE $1 ESCAPE '\'
         OR u.email ILIKE $1 ESCAPE '\'
         OR u.phone ILIKE $1 ESCAPE '\')
    AND ($2::boolean IS NULL OR u.is_blocked = $2)
";

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: Role,
    pub is_blocked: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    #[instrument(skip(self, request), fields(page = request.page(), search = ?request.search()))]
    pub async fn list_customers(
        &self,
        request: &ListRequest<CustomerState>,
    ) -> Result<Page<User>, RepositoryError> {
        let search = request.search().map(like_pattern);
        let blocked = request.status().as_option().map(|s| s.is_blocked());

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users u WHERE {CUSTOMER_FILTER}"
        ))
        .bind(search.as_deref())
        .bind(blocked)
        .fetch_one(self.pool)
        .await?;

        let window = request.window(row_total(count)?);
        let (limit, offset) = limit_offset(&window)?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE {CUSTOMER_FILTER} \
             ORDER BY u.created_at DESC, u.id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(search.as_deref())
        .bind(blocked)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<User>, _>>()?;
        Ok(Page::new(users, &window))
    }

    /// Get a user of any role by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a customer with their order count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no customer has this ID.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn customer_detail(&self, id: UserId) -> Result<CustomerDetail, RepositoryError> {
        let user = self
            .get_by_id(id)
            .await?
            .filter(|u| u.role == Role::Customer)
            .ok_or(RepositoryError::NotFound)?;

        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(CustomerDetail {
            status: user.state(),
            user,
            order_count,
        })
    }

    /// Set a customer's blocked flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no customer has this ID.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn set_blocked(&self, id: UserId, is_blocked: bool) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users u SET is_blocked = $2
            WHERE u.id = $1 AND u.role = 'customer'
            RETURNING u.id, u.username, u.email, u.phone, u.role, u.is_blocked, u.created_at
            ",
        )
        .bind(id)
        .bind(is_blocked)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(user_id = %id, is_blocked, "Customer block flag updated");
        row.try_into()
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users AS u (username, email, phone, role, is_blocked)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING u.id, u.username, u.email, u.phone, u.role, u.is_blocked, u.created_at
            ",
        )
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(user.phone.as_deref())
        .bind(user.role)
        .bind(user.is_blocked)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_unique(e, format!("email {} is already registered", user.email))
        })?;

        row.try_into()
    }
}
