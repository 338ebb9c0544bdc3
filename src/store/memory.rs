use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{
    Appointment,
    AppointmentQuery,
    ChatMessage,
    ChatSession,
    EmergencyRequest,
    SessionStatus,
    User,
};
use super::{ AppointmentStore, ChatStore, EmergencyStore, StoreError, UserStore };

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    user_ids_by_email: HashMap<String, String>,
    appointments: HashMap<String, Appointment>,
    emergencies: HashMap<String, EmergencyRequest>,
    sessions: HashMap<String, ChatSession>,
    active_sessions: HashMap<String, String>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// Process-local store. Used when no document store is configured and by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.user_ids_by_email.contains_key(&user.email) {
            return Err(StoreError::Duplicate(format!("user {}", user.email)));
        }
        inner.user_ids_by_email.insert(user.email.clone(), user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(
            inner.user_ids_by_email
                .get(email)
                .and_then(|id| inner.users.get(id))
                .cloned()
        )
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("user {}", user.id))),
        }
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
        Ok(self.inner.read().await.appointments.get(id).cloned())
    }

    async fn list_appointments(
        &self,
        query: &AppointmentQuery
    ) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<Appointment> = inner.appointments
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.appointments.get_mut(&appointment.id) {
            Some(stored) => {
                *stored = appointment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("appointment {}", appointment.id))),
        }
    }
}

#[async_trait]
impl EmergencyStore for MemoryStore {
    async fn insert_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.emergencies.insert(emergency.id.clone(), emergency.clone());
        Ok(())
    }

    async fn get_emergency(&self, id: &str) -> Result<Option<EmergencyRequest>, StoreError> {
        Ok(self.inner.read().await.emergencies.get(id).cloned())
    }

    async fn list_emergencies(
        &self,
        patient_id: Option<&str>
    ) -> Result<Vec<EmergencyRequest>, StoreError> {
        let inner = self.inner.read().await;
        Ok(
            inner.emergencies
                .values()
                .filter(|e| patient_id.map_or(true, |p| e.patient_id == p))
                .cloned()
                .collect()
        )
    }

    async fn update_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.emergencies.get_mut(&emergency.id) {
            Some(stored) => {
                *stored = emergency.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("emergency request {}", emergency.id))),
        }
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if session.status == SessionStatus::Active {
            inner.active_sessions.insert(session.user_id.clone(), session.id.clone());
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_active_session(&self, user_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let inner = self.inner.read().await;
        Ok(
            inner.active_sessions
                .get(user_id)
                .and_then(|id| inner.sessions.get(id))
                .filter(|s| s.status == SessionStatus::Active)
                .cloned()
        )
    }

    async fn update_session(&self, session: &ChatSession) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::NotFound(format!("chat session {}", session.id)))?;
        if stored.version != session.version {
            return Err(StoreError::Conflict(format!("chat session {}", session.id)));
        }

        let mut updated = session.clone();
        updated.version = session.version + 1;
        *stored = updated;

        match session.status {
            SessionStatus::Completed => {
                if inner.active_sessions.get(&session.user_id) == Some(&session.id) {
                    inner.active_sessions.remove(&session.user_id);
                }
            }
            SessionStatus::Active => {
                inner.active_sessions
                    .entry(session.user_id.clone())
                    .or_insert_with(|| session.id.clone());
            }
        }
        Ok(session.version + 1)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.messages.entry(message.user_id.clone()).or_default().push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_id: &str,
        limit: usize
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        Ok(
            inner.messages
                .get(user_id)
                .map(|log| log.iter().rev().take(limit).cloned().collect())
                .unwrap_or_default()
        )
    }
}
