pub mod flow;

use chrono::Utc;
use log::{ debug, error, info };
use serde::Serialize;
use std::sync::Arc;

use crate::models::{ Appointment, ChatMessage, ChatSession, SessionStatus, Step };
use crate::store::{ AppointmentStore, ChatStore, Store, StoreError };
use flow::Outcome;

/// Messages returned by [`ChatService::history`].
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No active chat session; start a new session first")]
    NoActiveSession,
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    pub status: SessionStatus,
    pub current_step: Step,
    pub reply: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}

impl ChatReply {
    fn new(session: &ChatSession, reply: ChatMessage, appointment: Option<Appointment>) -> Self {
        Self {
            session_id: session.id.clone(),
            status: session.status,
            current_step: session.current_step,
            reply,
            appointment,
        }
    }
}

pub struct ChatService {
    store: Arc<dyn Store>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Opens a fresh session at `welcome`, closing any session still active.
    pub async fn start(&self, user_id: &str) -> Result<ChatReply, ChatError> {
        if let Some(mut previous) = self.store.find_active_session(user_id).await? {
            previous.status = SessionStatus::Completed;
            previous.updated_at = Utc::now();
            self.store.update_session(&previous).await?;
            debug!("Closed chat session {} for {}", previous.id, user_id);
        }

        let session = ChatSession::start(user_id);
        self.store.insert_session(&session).await?;
        info!("Started chat session {} for {}", session.id, user_id);

        let welcome = ChatMessage::new(user_id, Some(&session.id), flow::WELCOME, true);
        self.store.append_message(&welcome).await?;
        Ok(ChatReply::new(&session, welcome, None))
    }

    /// Advances the user's active session by one message.
    ///
    /// The session is written first so that a concurrent message for the
    /// same session loses with [`StoreError::Conflict`] before anything else
    /// is persisted. If the booked appointment cannot be stored, the session
    /// is put back the way it was before this message.
    pub async fn send(&self, user_id: &str, text: &str) -> Result<ChatReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let mut session = self.store
            .find_active_session(user_id).await?
            .ok_or(ChatError::NoActiveSession)?;
        let previous = session.clone();

        let now = Utc::now();
        let mut appointment = None;
        let reply_text = match flow::apply(&mut session, text) {
            Outcome::Reply(reply) => reply,
            Outcome::Submit =>
                match flow::validate(&session, now) {
                    Ok(form) => {
                        let booked = form.into_appointment(user_id, now);
                        let message = flow::completion_message(&booked);
                        session.status = SessionStatus::Completed;
                        appointment = Some(booked);
                        message
                    }
                    Err(errors) => {
                        debug!(
                            "Chat session {} failed validation on {} field(s)",
                            session.id,
                            errors.len()
                        );
                        flow::rewind(&mut session, &errors);
                        flow::rejection_message(&errors)
                    }
                }
        };

        session.updated_at = now;
        session.version = self.store.update_session(&session).await?;

        if let Some(booked) = &appointment {
            if let Err(err) = self.store.insert_appointment(booked).await {
                self.reopen(previous, session.version).await;
                return Err(err.into());
            }
            info!("Chat session {} booked appointment {}", session.id, booked.id);
        }

        let inbound = ChatMessage::new(user_id, Some(&session.id), text, false);
        self.store.append_message(&inbound).await?;
        let reply = ChatMessage::new(user_id, Some(&session.id), &reply_text, true);
        self.store.append_message(&reply).await?;

        Ok(ChatReply::new(&session, reply, appointment))
    }

    async fn reopen(&self, mut previous: ChatSession, version: u64) {
        previous.version = version;
        previous.updated_at = Utc::now();
        if let Err(err) = self.store.update_session(&previous).await {
            error!("Failed to reopen chat session {}: {}", previous.id, err);
        }
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.store.recent_messages(user_id, HISTORY_LIMIT).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        parse_appointment_time,
        AppointmentQuery,
        AppointmentStatus,
        EmergencyRequest,
        User,
    };
    use crate::store::{ EmergencyStore, MemoryStore, UserStore };

    fn service() -> (Arc<MemoryStore>, ChatService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ChatService::new(store))
    }

    async fn say_all(chat: &ChatService, user_id: &str, lines: &[&str]) -> ChatReply {
        let mut last = None;
        for line in lines {
            last = Some(chat.send(user_id, line).await.unwrap());
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn booking_flow_persists_the_appointment() {
        let (store, chat) = service();
        chat.start("u1").await.unwrap();
        let done = say_all(
            &chat,
            "u1",
            &["2", "Jane", "30", "jane@x.com", "9998887777", "1 Main St", "2099-01-01 10:00"]
        ).await;

        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.current_step, Step::Complete);
        assert!(done.reply.message.starts_with("Great! I've booked your appointment"));

        let stored = store.list_appointments(&AppointmentQuery::for_patient("u1")).await.unwrap();
        assert_eq!(stored.len(), 1);
        let appointment = &stored[0];
        assert_eq!(appointment.patient_name, "Jane");
        assert_eq!(appointment.patient_age, Some(30));
        assert_eq!(appointment.patient_email.as_deref(), Some("jane@x.com"));
        assert_eq!(appointment.patient_contact.as_deref(), Some("9998887777"));
        assert_eq!(appointment.patient_address.as_deref(), Some("1 Main St"));
        assert_eq!(Some(appointment.appointment_time), parse_appointment_time("2099-01-01 10:00"));
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(done.appointment.as_ref(), Some(appointment));

        assert!(store.find_active_session("u1").await.unwrap().is_none());
        assert!(matches!(chat.send("u1", "hello").await, Err(ChatError::NoActiveSession)));
    }

    #[tokio::test]
    async fn invalid_age_is_reported_in_chat_and_can_be_corrected() {
        let (store, chat) = service();
        chat.start("u1").await.unwrap();
        let rejected = say_all(
            &chat,
            "u1",
            &["2", "Jane", "-5", "jane@x.com", "9998887777", "1 Main St", "2099-01-01 10:00"]
        ).await;

        assert_eq!(rejected.status, SessionStatus::Active);
        assert_eq!(rejected.current_step, Step::Age);
        assert!(rejected.appointment.is_none());
        assert!(rejected.reply.message.contains("valid age"));
        assert!(store.list_appointments(&AppointmentQuery::default()).await.unwrap().is_empty());

        let fixed = chat.send("u1", "30").await.unwrap();
        assert_eq!(fixed.status, SessionStatus::Completed);
        assert_eq!(fixed.appointment.map(|a| a.patient_age), Some(Some(30)));
    }

    #[tokio::test]
    async fn sending_without_a_session_is_rejected() {
        let (_, chat) = service();
        assert!(matches!(chat.send("u1", "2").await, Err(ChatError::NoActiveSession)));
    }

    #[tokio::test]
    async fn option_one_completes_with_consultation_details() {
        let (store, chat) = service();
        chat.start("u1").await.unwrap();
        let reply = chat.send("u1", "1").await.unwrap();
        assert_eq!(reply.status, SessionStatus::Completed);
        assert!(reply.reply.message.contains("https://zoom.us/j/123456789"));
        assert!(store.find_active_session("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restarting_replaces_the_active_session() {
        let (store, chat) = service();
        let first = chat.start("u1").await.unwrap();
        chat.send("u1", "2").await.unwrap();
        let second = chat.start("u1").await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        let active = store.find_active_session("u1").await.unwrap().unwrap();
        assert_eq!(active.id, second.session_id);
        assert_eq!(active.current_step, Step::Welcome);
    }

    #[tokio::test]
    async fn stale_session_write_is_a_conflict() {
        let (store, chat) = service();
        chat.start("u1").await.unwrap();
        let stale = store.find_active_session("u1").await.unwrap().unwrap();
        chat.send("u1", "2").await.unwrap();

        let result = store.update_session(&stale).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_capped() {
        let (_, chat) = service();
        chat.start("u1").await.unwrap();
        for i in 0..30 {
            chat.send("u1", &format!("hello {}", i)).await.unwrap();
        }

        let history = chat.history("u1").await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(history[0].is_bot);
        assert_eq!(history[1].message, "hello 29");
        assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    struct RejectingAppointments(MemoryStore);

    #[async_trait::async_trait]
    impl UserStore for RejectingAppointments {
        async fn create_user(&self, user: &User) -> Result<(), StoreError> {
            self.0.create_user(user).await
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user_by_email(email).await
        }

        async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user_by_id(id).await
        }

        async fn update_user(&self, user: &User) -> Result<(), StoreError> {
            self.0.update_user(user).await
        }
    }

    #[async_trait::async_trait]
    impl AppointmentStore for RejectingAppointments {
        async fn insert_appointment(&self, _: &Appointment) -> Result<(), StoreError> {
            Err(StoreError::Backend("appointments unavailable".into()))
        }

        async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
            self.0.get_appointment(id).await
        }

        async fn list_appointments(
            &self,
            query: &AppointmentQuery
        ) -> Result<Vec<Appointment>, StoreError> {
            self.0.list_appointments(query).await
        }

        async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
            self.0.update_appointment(appointment).await
        }
    }

    #[async_trait::async_trait]
    impl EmergencyStore for RejectingAppointments {
        async fn insert_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
            self.0.insert_emergency(emergency).await
        }

        async fn get_emergency(&self, id: &str) -> Result<Option<EmergencyRequest>, StoreError> {
            self.0.get_emergency(id).await
        }

        async fn list_emergencies(
            &self,
            patient_id: Option<&str>
        ) -> Result<Vec<EmergencyRequest>, StoreError> {
            self.0.list_emergencies(patient_id).await
        }

        async fn update_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
            self.0.update_emergency(emergency).await
        }
    }

    #[async_trait::async_trait]
    impl ChatStore for RejectingAppointments {
        async fn insert_session(&self, session: &ChatSession) -> Result<(), StoreError> {
            self.0.insert_session(session).await
        }

        async fn find_active_session(
            &self,
            user_id: &str
        ) -> Result<Option<ChatSession>, StoreError> {
            self.0.find_active_session(user_id).await
        }

        async fn update_session(&self, session: &ChatSession) -> Result<u64, StoreError> {
            self.0.update_session(session).await
        }

        async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
            self.0.append_message(message).await
        }

        async fn recent_messages(
            &self,
            user_id: &str,
            limit: usize
        ) -> Result<Vec<ChatMessage>, StoreError> {
            self.0.recent_messages(user_id, limit).await
        }
    }

    #[tokio::test]
    async fn failed_booking_insert_keeps_the_session_open() {
        let store = Arc::new(RejectingAppointments(MemoryStore::new()));
        let chat = ChatService::new(store.clone());
        chat.start("u1").await.unwrap();
        say_all(&chat, "u1", &["2", "Jane", "30", "jane@x.com", "9998887777", "1 Main St"]).await;

        let result = chat.send("u1", "2099-01-01 10:00").await;
        assert!(matches!(result, Err(ChatError::Store(StoreError::Backend(_)))));

        let session = store.find_active_session("u1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_step, Step::Time);
        assert_eq!(session.answer(Step::Time), None);
        assert_eq!(session.answer(Step::Address), Some("1 Main St"));
        assert!(store.list_appointments(&AppointmentQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inbound_message_is_stored_as_sent() {
        let (store, chat) = service();
        chat.start("u1").await.unwrap();
        chat.send("u1", "  2 ").await.unwrap();

        let history = store.recent_messages("u1", 2).await.unwrap();
        assert_eq!(history[1].message, "  2 ");
        assert!(!history[1].is_bot);
        let session = store.find_active_session("u1").await.unwrap().unwrap();
        assert_eq!(session.current_step, Step::Name);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (_, chat) = service();
        chat.start("u1").await.unwrap();
        assert!(matches!(chat.send("u1", "   ").await, Err(ChatError::EmptyMessage)));
    }
}
