use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

// --- Core Application Schemas (Mapped to Database) ---

/// Anime
///
/// The sole catalog record, stored in the `anime` table.
/// `id` is assigned by the database on insert and is `None` only for records
/// that have not been saved yet.
///
/// The same shape is used as the request body for create/update, where `id` is
/// ignored in favour of the store-assigned or path-supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Validate, Default)]
#[ts(export)]
pub struct Anime {
    #[schema(example = 1)]
    pub id: Option<i32>,

    /// Missing and `null` names decode as the empty string so they reach validation.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "The name of this anime can not be empty"))]
    #[schema(example = "Naruto")]
    pub name: String,
}

impl Anime {
    /// An unsaved record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// User
///
/// Credentials record from the `users` table, used only to resolve HTTP Basic
/// identities. `password` is an argon2 PHC string and is never serialized.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    // Comma-separated role names, e.g. "ADMIN,USER".
    pub roles: String,
}

impl User {
    /// Parses the stored role list. Unknown names are skipped.
    pub fn roles(&self) -> Vec<Role> {
        self.roles
            .split(',')
            .filter_map(|raw| raw.trim().parse().ok())
            .collect()
    }
}

/// NewUser
///
/// Input for creating a credentials record. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Role
///
/// Authorities attached to an authenticated identity. `USER` gates catalog
/// listing, `ADMIN` gates every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Renders a role list the way it is stored in `users.roles`.
    pub fn join(roles: &[Role]) -> String {
        roles
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Accepts `USER`/`ADMIN` case-insensitively, with or without a `ROLE_` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("ROLE_").unwrap_or(&upper) {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
