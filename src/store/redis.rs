use async_trait::async_trait;
use ::redis::{ AsyncCommands, Client, Script };
use serde::de::DeserializeOwned;
use serde::Serialize;
use log::error;

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

/// Claims the email in KEYS[1] and writes the user document into KEYS[2] in
/// one step. Returns 0 when the email is already taken, 1 on success.
const CREATE_USER_LUA: &str = r"
if redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2]) == 0 then return 0 end
redis.call('HSET', KEYS[2], ARGV[2], ARGV[3])
return 1
";

/// Writes the session only if the stored `version` still equals ARGV[2].
/// Returns -1 when the session is missing, 0 on a version mismatch, 1 on success.
const UPDATE_SESSION_LUA: &str = r"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if not current then return -1 end
local doc = cjson.decode(current)
if tonumber(doc['version'] or 0) ~= tonumber(ARGV[2]) then return 0 end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
if ARGV[5] == 'completed' then
  if redis.call('HGET', KEYS[2], ARGV[4]) == ARGV[1] then
    redis.call('HDEL', KEYS[2], ARGV[4])
  end
else
  redis.call('HSETNX', KEYS[2], ARGV[4], ARGV[1])
end
return 1
";

/// Documents live as JSON values in one hash per collection; chat messages
/// go into a per-user list with the newest entry at the head.
pub struct RedisStore {
    client: Client,
    key_prefix: String,
    create_user_script: Script,
    update_session_script: Script,
}

impl RedisStore {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
            create_user_script: Script::new(CREATE_USER_LUA),
            update_session_script: Script::new(UPDATE_SESSION_LUA),
        })
    }

    async fn get_connection(&self) -> Result<::redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    async fn put<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        doc: &T
    ) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(doc)?;
        let _: i64 = conn.hset(self.key(collection), id, json).await?;
        Ok(())
    }

    async fn replace<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        doc: &T
    ) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let key = self.key(collection);
        let exists: bool = conn.hexists(&key, id).await?;
        if !exists {
            return Err(StoreError::NotFound(format!("{} {}", collection, id)));
        }
        let json = serde_json::to_string(doc)?;
        let _: i64 = conn.hset(&key, id, json).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str
    ) -> Result<Option<T>, StoreError> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.hget(self.key(collection), id).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Skips entries that no longer decode instead of failing the whole listing.
    async fn all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let mut conn = self.get_connection().await?;
        let entries: Vec<String> = conn.hvals(self.key(collection)).await?;
        let mut docs = Vec::with_capacity(entries.len());
        for entry in &entries {
            match serde_json::from_str::<T>(entry) {
                Ok(doc) => docs.push(doc),
                Err(e) => error!("Error parsing {} entry: {}", collection, e),
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl UserStore for RedisStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(user)?;
        let created: i64 = self.create_user_script
            .key(self.key("users:email"))
            .key(self.key("users"))
            .arg(&user.email)
            .arg(&user.id)
            .arg(json)
            .invoke_async(&mut conn).await?;
        if created == 0 {
            return Err(StoreError::Duplicate(format!("user {}", user.email)));
        }
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.get_connection().await?;
        let id: Option<String> = conn.hget(self.key("users:email"), email).await?;
        match id {
            Some(id) => self.get("users", &id).await,
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get("users", id).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.replace("users", &user.id, user).await
    }
}

#[async_trait]
impl AppointmentStore for RedisStore {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.put("appointments", &appointment.id, appointment).await
    }

    async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
        self.get("appointments", id).await
    }

    async fn list_appointments(
        &self,
        query: &AppointmentQuery
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut found: Vec<Appointment> = self
            .all::<Appointment>("appointments").await?
            .into_iter()
            .filter(|a| query.matches(a))
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.replace("appointments", &appointment.id, appointment).await
    }
}

#[async_trait]
impl EmergencyStore for RedisStore {
    async fn insert_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
        self.put("emergencies", &emergency.id, emergency).await
    }

    async fn get_emergency(&self, id: &str) -> Result<Option<EmergencyRequest>, StoreError> {
        self.get("emergencies", id).await
    }

    async fn list_emergencies(
        &self,
        patient_id: Option<&str>
    ) -> Result<Vec<EmergencyRequest>, StoreError> {
        Ok(
            self
                .all::<EmergencyRequest>("emergencies").await?
                .into_iter()
                .filter(|e| patient_id.map_or(true, |p| e.patient_id == p))
                .collect()
        )
    }

    async fn update_emergency(&self, emergency: &EmergencyRequest) -> Result<(), StoreError> {
        self.replace("emergencies", &emergency.id, emergency).await
    }
}

#[async_trait]
impl ChatStore for RedisStore {
    async fn insert_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        self.put("sessions", &session.id, session).await?;
        if session.status == SessionStatus::Active {
            let mut conn = self.get_connection().await?;
            let _: i64 = conn.hset(self.key("sessions:active"), &session.user_id, &session.id).await?;
        }
        Ok(())
    }

    async fn find_active_session(&self, user_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let mut conn = self.get_connection().await?;
        let id: Option<String> = conn.hget(self.key("sessions:active"), user_id).await?;
        let Some(id) = id else {
            return Ok(None);
        };
        let session: Option<ChatSession> = self.get("sessions", &id).await?;
        Ok(session.filter(|s| s.status == SessionStatus::Active))
    }

    async fn update_session(&self, session: &ChatSession) -> Result<u64, StoreError> {
        let mut conn = self.get_connection().await?;
        let mut updated = session.clone();
        updated.version = session.version + 1;
        let json = serde_json::to_string(&updated)?;
        let status = match session.status {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        };

        let outcome: i64 = self.update_session_script
            .key(self.key("sessions"))
            .key(self.key("sessions:active"))
            .arg(&session.id)
            .arg(session.version)
            .arg(json)
            .arg(&session.user_id)
            .arg(status)
            .invoke_async(&mut conn).await?;

        match outcome {
            1 => Ok(updated.version),
            0 => Err(StoreError::Conflict(format!("chat session {}", session.id))),
            _ => Err(StoreError::NotFound(format!("chat session {}", session.id))),
        }
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let key = self.key(&format!("messages:{}", message.user_id));
        let json = serde_json::to_string(message)?;
        let _: i64 = conn.lpush(&key, json).await?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_id: &str,
        limit: usize
    ) -> Result<Vec<ChatMessage>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.get_connection().await?;
        let key = self.key(&format!("messages:{}", user_id));
        let entries: Vec<String> = conn.lrange(&key, 0, (limit as isize) - 1).await?;
        let mut messages = Vec::with_capacity(entries.len());
        for entry in &entries {
            match serde_json::from_str::<ChatMessage>(entry) {
                Ok(msg) => messages.push(msg),
                Err(e) => error!("Error parsing chat message entry: {}", e),
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::Patient,
            name: "Test".into(),
            phone: None,
            specialization: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only runs against a live server named by `HEALTHDESK_TEST_REDIS_URL`.
    fn live_store() -> Option<RedisStore> {
        let url = std::env::var("HEALTHDESK_TEST_REDIS_URL").ok()?;
        let prefix = format!("healthdesk-test:{}:", uuid::Uuid::new_v4());
        Some(RedisStore::new(&url, &prefix).unwrap())
    }

    #[tokio::test]
    async fn create_user_claims_email_and_document_together() {
        let Some(store) = live_store() else {
            return;
        };
        let jane = user("u1", "jane@x.com");
        store.create_user(&jane).await.unwrap();

        let found = store.find_user_by_email("jane@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, jane.id);

        let again = user("u2", "jane@x.com");
        let err = store.create_user(&again).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.find_user_by_id(&again.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reopened_session_takes_back_the_active_slot() {
        let Some(store) = live_store() else {
            return;
        };
        let mut session = ChatSession::start("u1");
        store.insert_session(&session).await.unwrap();
        session.status = SessionStatus::Completed;
        session.version = store.update_session(&session).await.unwrap();
        assert!(store.find_active_session("u1").await.unwrap().is_none());

        session.status = SessionStatus::Active;
        store.update_session(&session).await.unwrap();
        let active = store.find_active_session("u1").await.unwrap().unwrap();
        assert_eq!(active.id, session.id);
    }
}
