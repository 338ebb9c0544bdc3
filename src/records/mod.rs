//! Role-scoped appointment and emergency records.
//!
//! Patients only ever see their own documents. Doctors see appointments
//! assigned to them plus unassigned ones, and every emergency request.

pub mod appointments;
pub mod emergency;

pub use appointments::{
    AppointmentService,
    AppointmentStats,
    CreateAppointmentRequest,
    ScheduleQuery,
    StatusUpdateRequest,
    UpdateAppointmentRequest,
};
pub use emergency::{ CreateEmergencyRequest, EmergencyService, UpdateEmergencyRequest };

use crate::auth::Identity;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn ensure_doctor(identity: &Identity, action: &str) -> Result<(), RecordError> {
    if identity.is_doctor() {
        Ok(())
    } else {
        Err(RecordError::Forbidden(format!("Only doctors can {}", action)))
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
