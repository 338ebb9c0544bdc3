mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::{ Appointment, AppointmentQuery, ChatMessage, ChatSession, EmergencyRequest, User };

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} was modified concurrently")]
    Conflict(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is already registered.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError>;

    async fn list_appointments(
        &self,
        query: &AppointmentQuery
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EmergencyStore: Send + Sync {
    async fn insert_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError>;

    async fn get_emergency(&self, id: &str) -> Result<Option<EmergencyRequest>, StoreError>;

    /// All requests when `patient_id` is `None`.
    async fn list_emergencies(
        &self,
        patient_id: Option<&str>
    ) -> Result<Vec<EmergencyRequest>, StoreError>;

    async fn update_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Stores the session and, if it is active, makes it the user's active one.
    async fn insert_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    async fn find_active_session(&self, user_id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// Compare-and-set on `session.version`. Returns the new version, or
    /// [`StoreError::Conflict`] if the stored version moved on. A completed
    /// session gives up the user's active slot; an active one takes it back
    /// when the slot is free.
    async fn update_session(&self, session: &ChatSession) -> Result<u64, StoreError>;

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Newest first.
    async fn recent_messages(
        &self,
        user_id: &str,
        limit: usize
    ) -> Result<Vec<ChatMessage>, StoreError>;
}

pub trait Store: UserStore + AppointmentStore + EmergencyStore + ChatStore {}

impl<T> Store for T where T: UserStore + AppointmentStore + EmergencyStore + ChatStore {}

pub fn create_store(args: &Args) -> Result<Arc<dyn Store>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "redis" => {
            let store = RedisStore::new(&args.store_host, &args.store_prefix)?;
            Ok(Arc::new(store))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_store(args: &Args) -> Result<Arc<dyn Store>, Box<dyn Error + Send + Sync>> {
    if args.store_type.eq_ignore_ascii_case("memory") {
        info!("Documents will be kept in memory and lost on restart");
    } else {
        info!("Documents will be stored in: {} at {}", args.store_type, args.store_host);
    }
    create_store(args)
}
