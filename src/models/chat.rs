use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use std::collections::BTreeMap;

use super::new_id;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

/// Stage of the booking conversation. Booking steps run in declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Welcome,
    Name,
    Age,
    Email,
    Contact,
    Address,
    Time,
    Complete,
}

impl Step {
    pub const ORDER: [Step; 8] = [
        Step::Welcome,
        Step::Name,
        Step::Age,
        Step::Email,
        Step::Contact,
        Step::Address,
        Step::Time,
        Step::Complete,
    ];

    /// Steps whose answers make up an appointment.
    pub const FORM: [Step; 6] = [
        Step::Name,
        Step::Age,
        Step::Email,
        Step::Contact,
        Step::Address,
        Step::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::Name => "name",
            Step::Age => "age",
            Step::Email => "email",
            Step::Contact => "contact",
            Step::Address => "address",
            Step::Time => "time",
            Step::Complete => "complete",
        }
    }

    /// `Complete` is terminal and maps to itself.
    pub fn next(&self) -> Step {
        let pos = Step::ORDER.iter().position(|s| s == self).unwrap_or(Step::ORDER.len() - 1);
        Step::ORDER.get(pos + 1).copied().unwrap_or(Step::Complete)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub current_step: Step,
    /// Raw answers keyed by step name.
    pub appointment_data: BTreeMap<String, String>,
    /// Bumped by the store on every successful update.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn start(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            status: SessionStatus::Active,
            current_step: Step::Welcome,
            appointment_data: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn answer(&self, step: Step) -> Option<&str> {
        self.appointment_data.get(step.as_str()).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: &str, session_id: Option<&str>, message: &str, is_bot: bool) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            session_id: session_id.map(str::to_string),
            message: message.to_string(),
            is_bot,
            timestamp: Utc::now(),
        }
    }
}
