use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    error::AppError,
    models::{NewUser, Role},
    repository::RepositoryState,
};

/// AuthUser Extractor Result
///
/// The resolved identity of a request that passed HTTP Basic authentication.
/// Route guards inspect `roles` to decide between the handler and a 403.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

/// Basic credentials as sent by the client.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Decodes an `Authorization: Basic <base64(user:pass)>` header value.
/// Returns `None` for any other scheme or a malformed payload.
pub fn parse_basic_auth(header_value: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler or middleware argument:
/// 1. Reads and decodes the `Authorization: Basic` header.
/// 2. Looks the username up in the user store.
/// 3. Verifies the password against the stored argon2 hash.
///
/// Rejection: `AppError::Unauthorized` (401 + `WWW-Authenticate`) for a missing
/// header, unknown username or wrong password.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);

        let credentials = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic_auth)
            .ok_or(AppError::Unauthorized)?;

        let Some(user) = repo.find_user_by_username(&credentials.username).await? else {
            tracing::debug!(username = %credentials.username, "unknown username");
            return Err(AppError::Unauthorized);
        };

        let stored_hash = user.password.clone();
        let password = credentials.password;
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?;

        match verified {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(username = %user.username, "bad password");
                return Err(AppError::Unauthorized);
            }
            Err(e) => {
                // A stored hash that does not parse can never authenticate.
                tracing::warn!(username = %user.username, error = %e, "unusable password hash");
                return Err(AppError::Unauthorized);
            }
        }

        tracing::Span::current().record("user", user.username.as_str());
        Ok(AuthUser {
            roles: user.roles(),
            username: user.username,
        })
    }
}

// --- Route Guards ---

/// auth_middleware
///
/// Admits any authenticated identity. Authentication itself happens in the
/// `AuthUser` extractor, which rejects with 401 before `next` is reached.
pub async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// viewer_guard
///
/// Catalog listing: the caller must hold USER or ADMIN.
pub async fn viewer_guard(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_any(&auth_user, &[Role::User, Role::Admin])?;
    Ok(next.run(request).await)
}

/// admin_guard
///
/// Every catalog write: the caller must hold ADMIN.
pub async fn admin_guard(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_any(&auth_user, &[Role::Admin])?;
    Ok(next.run(request).await)
}

fn require_any(auth_user: &AuthUser, roles: &[Role]) -> Result<(), AppError> {
    if auth_user.has_any_role(roles) {
        Ok(())
    } else {
        tracing::info!(username = %auth_user.username, ?roles, "access denied");
        Err(AppError::Forbidden)
    }
}

// --- Passwords ---

/// Hashes a plaintext password with Argon2id and a random salt, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored PHC string.
/// `Ok(false)` means the password is wrong; `Err` means the hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// ensure_user
///
/// Creates the account unless the username already exists. Used at startup to
/// seed the accounts listed in `BOOTSTRAP_USERS`. Returns whether a user was created.
pub async fn ensure_user(
    repo: &RepositoryState,
    username: &str,
    password: &str,
    roles: &[Role],
) -> Result<bool, AppError> {
    if repo.find_user_by_username(username).await?.is_some() {
        return Ok(false);
    }

    let password_hash =
        hash_password(password).map_err(|e| AppError::Internal(format!("hashing failed: {e}")))?;
    repo.create_user(NewUser {
        username: username.to_string(),
        password_hash,
        roles: roles.to_vec(),
    })
    .await?;

    tracing::info!(username, roles = %Role::join(roles), "bootstrap user created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use std::sync::Arc;

    #[test]
    fn parses_basic_header() {
        // "admin:s3cr:et" - only the first colon separates user from password.
        let value = format!("Basic {}", STANDARD.encode("admin:s3cr:et"));
        assert_eq!(
            parse_basic_auth(&value),
            Some(BasicCredentials {
                username: "admin".into(),
                password: "s3cr:et".into()
            })
        );
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_basic_auth("Bearer abc.def"), None);
        assert_eq!(parse_basic_auth("Basic !!!not-base64"), None);
        let no_colon = format!("Basic {}", STANDARD.encode("justuser"));
        assert_eq!(parse_basic_auth(&no_colon), None);
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("userpass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("userpass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("userpass", "not-a-phc-string").is_err());
    }

    #[test]
    fn role_checks() {
        let admin = AuthUser {
            username: "admin".into(),
            roles: vec![Role::Admin],
        };
        assert!(require_any(&admin, &[Role::Admin]).is_ok());
        assert!(require_any(&admin, &[Role::User, Role::Admin]).is_ok());

        let nobody = AuthUser {
            username: "nobody".into(),
            roles: vec![],
        };
        assert!(matches!(require_any(&nobody, &[Role::User, Role::Admin]), Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());
        assert!(ensure_user(&repo, "admin", "pw", &[Role::Admin, Role::User]).await.unwrap());
        assert!(!ensure_user(&repo, "admin", "other", &[]).await.unwrap());

        let stored = repo.find_user_by_username("admin").await.unwrap().unwrap();
        assert_eq!(stored.roles, "ADMIN,USER");
        assert!(verify_password("pw", &stored.password).unwrap());
    }
}
