/// User model
///
/// Users own readings. The email address is the natural key: creating a
/// second user with an existing email is rejected, and the database carries
/// a unique index on it as well.
///
/// # Password handling
///
/// Create and update payloads carry the plaintext password. It is hashed
/// with Argon2id by [`Entity::prepare_create`] / [`Entity::prepare_update`]
/// before reaching storage, and the stored hash is never serialized.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use agnes_shared::models::user::{CreateUser, User};
/// use agnes_shared::services::EntityService;
/// use agnes_shared::store::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let users = EntityService::<User>::new(Arc::new(PgStore::new(pool)));
/// let user = users
///     .save(CreateUser {
///         username: "jdoe".to_string(),
///         email: "jdoe@example.com".to_string(),
///         password: "s3cret".to_string(),
///     })
///     .await?;
/// println!("created user {}", user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::entity::{Entity, FieldValue, FilterSpec};
use crate::password::hash_password;
use crate::services::ServiceError;
use crate::validation::not_blank;

/// User record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password: String,

    #[serde(serialize_with = "super::timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(
        custom(function = "not_blank"),
        length(min = 3, max = 50, message = "Username must be 3-50 characters")
    )]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// Input for updating a user. Only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(
        custom(function = "not_blank"),
        length(min = 3, max = 50, message = "Username must be 3-50 characters")
    )]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub password: Option<String>,
}

impl Entity for User {
    type Create = CreateUser;
    type Update = UpdateUser;

    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["username", "email", "password"];
    const SORTABLE: &'static [&'static str] = &["id", "username", "email"];
    const FILTERS: &'static [FilterSpec] =
        &[FilterSpec::contains("username"), FilterSpec::contains("email")];
    const UNIQUE: Option<&'static str> = Some("email");
    const EXTRA_UNIQUE: &'static [&'static str] = &["username"];

    fn id(&self) -> i32 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(self.id.into()),
            "username" => Some(self.username.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "password" => Some(self.password.as_str().into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }

    fn build(id: i32, data: &CreateUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: data.username.clone(),
            email: data.email.clone(),
            password: data.password.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, data: &UpdateUser, now: DateTime<Utc>) {
        if let Some(username) = &data.username {
            self.username = username.clone();
        }
        if let Some(email) = &data.email {
            self.email = email.clone();
        }
        if let Some(password) = &data.password {
            self.password = password.clone();
        }
        self.updated_at = now;
    }

    fn create_values(data: &CreateUser) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("username", data.username.as_str().into()),
            ("email", data.email.as_str().into()),
            ("password", data.password.as_str().into()),
        ]
    }

    fn update_values(data: &UpdateUser) -> Vec<(&'static str, FieldValue)> {
        let mut values = Vec::new();
        if let Some(username) = &data.username {
            values.push(("username", username.as_str().into()));
        }
        if let Some(email) = &data.email {
            values.push(("email", email.as_str().into()));
        }
        if let Some(password) = &data.password {
            values.push(("password", password.as_str().into()));
        }
        values
    }

    fn prepare_create(mut data: CreateUser) -> Result<CreateUser, ServiceError> {
        data.password = hash_password(&data.password)?;
        Ok(data)
    }

    fn prepare_update(mut data: UpdateUser) -> Result<UpdateUser, ServiceError> {
        if let Some(password) = data.password.take() {
            data.password = Some(hash_password(&password)?);
        }
        Ok(data)
    }
}
