pub mod password;
pub mod token;

use chrono::Utc;
use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::sync::Arc;

use crate::models::{ new_id, Role, User, UserProfile };
use crate::store::{ Store, StoreError, UserStore };
pub use password::PasswordHasher;
pub use token::{ ttl_from_hours, Claims, TokenError, TokenService };

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Email address already in use")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidPassword,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Who a verified token speaks for.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn from_claims(claims: &Claims) -> Result<Self, TokenError> {
        let email = claims.extra
            .get("email")
            .and_then(Value::as_str)
            .ok_or(TokenError::Malformed)?;
        let role = claims.extra
            .get("role")
            .and_then(Value::as_str)
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or(TokenError::Malformed)?;
        Ok(Self { user_id: claims.sub.clone(), email: email.to_string(), role })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: UserProfile,
}

/// Credential store operations plus token issuance for authenticated users.
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>, hasher: PasswordHasher) -> Self {
        Self { store, tokens, hasher }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthSession, AuthError> {
        if !self.tokens.is_configured() {
            return Err(TokenError::MissingSecret.into());
        }
        let email = normalize_email(required(req.email.as_deref(), "email")?);
        let password = required(req.password.as_deref(), "password")?;
        let name = required(req.name.as_deref(), "name")?.trim().to_string();

        if !looks_like_email(&email) {
            return Err(AuthError::Validation("Invalid email address".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(
                AuthError::Validation(
                    format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH)
                )
            );
        }
        let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => raw.parse::<Role>().map_err(AuthError::Validation)?,
            None => Role::Patient,
        };

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            email,
            password_hash: self.hasher.hash(password),
            role,
            name,
            phone: non_empty(req.phone),
            specialization: match role {
                Role::Doctor => non_empty(req.specialization),
                Role::Patient => None,
            },
            created_at: now,
            updated_at: now,
        };

        match self.store.create_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(AuthError::DuplicateEmail);
            }
            Err(e) => {
                return Err(e.into());
            }
        }
        info!("Registered {} account {}", user.role, user.id);

        let access_token = self.issue_for(&user)?;
        Ok(AuthSession { access_token, user: user.profile() })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession, AuthError> {
        let email = normalize_email(required(req.email.as_deref(), "email")?);
        let password = required(req.password.as_deref(), "password")?;

        let user = self.store.find_user_by_email(&email).await?.ok_or(AuthError::UserNotFound)?;
        if !self.hasher.verify(password, &user.password_hash) {
            warn!("Failed login for account {}", user.id);
            return Err(AuthError::InvalidPassword);
        }

        let access_token = self.issue_for(&user)?;
        Ok(AuthSession { access_token, user: user.profile() })
    }

    pub fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.tokens.verify(token)?;
        Ok(Identity::from_claims(&claims)?)
    }

    pub async fn profile(&self, identity: &Identity) -> Result<UserProfile, AuthError> {
        self.store
            .find_user_by_id(&identity.user_id).await?
            .map(|u| u.profile())
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn change_password(
        &self,
        identity: &Identity,
        req: ChangePasswordRequest
    ) -> Result<(), AuthError> {
        let current = required(req.current_password.as_deref(), "current_password")?;
        let new_password = required(req.new_password.as_deref(), "new_password")?;
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(
                AuthError::Validation(
                    format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH)
                )
            );
        }

        let mut user = self.store
            .find_user_by_id(&identity.user_id).await?
            .ok_or(AuthError::UserNotFound)?;
        if !self.hasher.verify(current, &user.password_hash) {
            return Err(AuthError::InvalidPassword);
        }

        user.password_hash = self.hasher.hash(new_password);
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        info!("Password rotated for account {}", user.id);
        Ok(())
    }

    fn issue_for(&self, user: &User) -> Result<String, TokenError> {
        let mut claims = Map::new();
        claims.insert("email".into(), Value::String(user.email.clone()));
        claims.insert("role".into(), Value::String(user.role.as_str().into()));
        self.tokens.issue(&user.id, claims)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AuthError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::Validation(format!("Missing required field: {}", field)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn looks_like_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
