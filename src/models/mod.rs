pub mod appointment;
pub mod chat;
pub mod emergency;
pub mod user;

use uuid::Uuid;

pub use appointment::{
    local_day_bounds,
    parse_appointment_time,
    Appointment,
    AppointmentQuery,
    AppointmentStatus,
};
pub use chat::{ ChatMessage, ChatSession, SessionStatus, Step };
pub use emergency::{ EmergencyRequest, EmergencyStatus, Priority };
pub use user::{ Role, User, UserProfile };

/// Document ids are dash-less v4 UUIDs.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
