use chrono::{ DateTime, Local, NaiveDate, Utc };
use log::info;
use serde::{ Deserialize, Serialize };
use std::sync::Arc;

use crate::auth::{ looks_like_email, Identity };
use crate::models::{
    local_day_bounds,
    new_id,
    parse_appointment_time,
    Appointment,
    AppointmentQuery,
    AppointmentStatus,
    Role,
};
use crate::store::{ AppointmentStore, Store, UserStore };
use super::{ ensure_doctor, trimmed, RecordError };

const MAX_AGE: i64 = 120;

#[derive(Debug, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<i64>,
    pub patient_email: Option<String>,
    pub patient_contact: Option<String>,
    pub patient_address: Option<String>,
    /// Either this, or `date` plus `time`.
    pub appointment_time: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<i64>,
    pub patient_email: Option<String>,
    pub patient_contact: Option<String>,
    pub patient_address: Option<String>,
    pub appointment_time: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    /// A status name, or `all`.
    pub status: Option<String>,
    /// `YYYY-MM-DD`, server-local calendar day.
    pub date: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct AppointmentStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub today: usize,
}

pub struct AppointmentService {
    store: Arc<dyn Store>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        req: CreateAppointmentRequest
    ) -> Result<Appointment, RecordError> {
        if identity.is_doctor() {
            return Err(RecordError::Forbidden("Only patients can book appointments".into()));
        }
        let now = Utc::now();
        let appointment_time = resolve_time(req.appointment_time, req.date, req.time)?.ok_or_else(||
            RecordError::Validation("Missing required field: appointment_time".into())
        )?;
        ensure_not_past(appointment_time, now)?;
        let patient_age = req.patient_age.map(checked_age).transpose()?;
        let patient_email = trimmed(req.patient_email);
        ensure_email(patient_email.as_deref())?;

        let doctor_id = trimmed(req.doctor_id);
        if let Some(doctor_id) = &doctor_id {
            self.ensure_doctor_exists(doctor_id).await?;
        }

        let patient = self.store
            .find_user_by_id(&identity.user_id).await?
            .ok_or_else(|| RecordError::NotFound("User not found".into()))?;

        let appointment = Appointment {
            id: new_id(),
            patient_id: patient.id.clone(),
            doctor_id,
            patient_name: trimmed(req.patient_name).unwrap_or(patient.name),
            patient_age,
            patient_email: patient_email.or(Some(patient.email)),
            patient_contact: trimmed(req.patient_contact).or(patient.phone),
            patient_address: trimmed(req.patient_address),
            appointment_time,
            status: AppointmentStatus::Pending,
            reason: trimmed(req.reason),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_appointment(&appointment).await?;
        info!("Appointment {} booked by {}", appointment.id, identity.user_id);
        Ok(appointment)
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<Appointment>, RecordError> {
        Ok(self.store.list_appointments(&scope(identity)).await?)
    }

    pub async fn get(&self, identity: &Identity, id: &str) -> Result<Appointment, RecordError> {
        let appointment = self.find(id).await?;
        if !visible_to(identity, &appointment) {
            return Err(RecordError::Forbidden("You cannot view this appointment".into()));
        }
        Ok(appointment)
    }

    /// Owner patient or any doctor. Reassigning the doctor is doctor-only and
    /// patients may only change the status to `cancelled`.
    pub async fn update(
        &self,
        identity: &Identity,
        id: &str,
        req: UpdateAppointmentRequest
    ) -> Result<Appointment, RecordError> {
        let mut appointment = self.find(id).await?;
        if !identity.is_doctor() && appointment.patient_id != identity.user_id {
            return Err(RecordError::Forbidden("You cannot modify this appointment".into()));
        }
        let now = Utc::now();

        if let Some(time) = resolve_time(req.appointment_time, req.date, req.time)? {
            ensure_not_past(time, now)?;
            appointment.appointment_time = time;
        }
        if let Some(age) = req.patient_age {
            appointment.patient_age = Some(checked_age(age)?);
        }
        if let Some(email) = trimmed(req.patient_email) {
            ensure_email(Some(&email))?;
            appointment.patient_email = Some(email);
        }
        if let Some(name) = trimmed(req.patient_name) {
            appointment.patient_name = name;
        }
        if let Some(contact) = trimmed(req.patient_contact) {
            appointment.patient_contact = Some(contact);
        }
        if let Some(address) = trimmed(req.patient_address) {
            appointment.patient_address = Some(address);
        }
        if let Some(reason) = trimmed(req.reason) {
            appointment.reason = Some(reason);
        }
        if let Some(doctor_id) = trimmed(req.doctor_id) {
            ensure_doctor(identity, "reassign appointments")?;
            self.ensure_doctor_exists(&doctor_id).await?;
            appointment.doctor_id = Some(doctor_id);
        }
        if let Some(raw) = req.status {
            let status = parse_status(&raw)?;
            if !identity.is_doctor() && status != AppointmentStatus::Cancelled {
                return Err(RecordError::Forbidden("Patients can only cancel appointments".into()));
            }
            appointment.status = status;
        }

        appointment.updated_at = now;
        self.store.update_appointment(&appointment).await?;
        info!("Appointment {} updated by {}", appointment.id, identity.user_id);
        Ok(appointment)
    }

    /// Doctor-only. An unassigned appointment becomes the acting doctor's.
    pub async fn update_status(
        &self,
        identity: &Identity,
        id: &str,
        req: StatusUpdateRequest
    ) -> Result<Appointment, RecordError> {
        ensure_doctor(identity, "update appointment status")?;
        let status = parse_status(
            req.status
                .as_deref()
                .ok_or_else(|| RecordError::Validation("Missing required field: status".into()))?
        )?;

        let mut appointment = self.find(id).await?;
        match &appointment.doctor_id {
            Some(doctor_id) if doctor_id != &identity.user_id => {
                return Err(
                    RecordError::Forbidden("Appointment is assigned to another doctor".into())
                );
            }
            Some(_) => {}
            None => {
                appointment.doctor_id = Some(identity.user_id.clone());
            }
        }

        appointment.status = status;
        appointment.updated_at = Utc::now();
        self.store.update_appointment(&appointment).await?;
        info!("Appointment {} marked {} by {}", appointment.id, status, identity.user_id);
        Ok(appointment)
    }

    pub async fn stats(&self, identity: &Identity) -> Result<AppointmentStats, RecordError> {
        ensure_doctor(identity, "view appointment statistics")?;
        let appointments = self.store.list_appointments(
            &AppointmentQuery::for_doctor(&identity.user_id)
        ).await?;
        let today = local_day_bounds(Local::now().date_naive());

        let count = |status| appointments.iter().filter(|a| a.status == status).count();
        Ok(AppointmentStats {
            total: appointments.len(),
            pending: count(AppointmentStatus::Pending),
            confirmed: count(AppointmentStatus::Confirmed),
            today: today.map_or(0, |(start, end)| {
                appointments
                    .iter()
                    .filter(|a| a.appointment_time >= start && a.appointment_time < end)
                    .count()
            }),
        })
    }

    /// Doctor's view filtered by status and local day, earliest first.
    pub async fn schedule(
        &self,
        identity: &Identity,
        query: ScheduleQuery
    ) -> Result<Vec<Appointment>, RecordError> {
        ensure_doctor(identity, "view the doctor schedule")?;
        let mut filter = AppointmentQuery::for_doctor(&identity.user_id);

        match query.status.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(s) if s.eq_ignore_ascii_case("all") => {}
            Some(s) => {
                filter.status = Some(parse_status(s)?);
            }
        }
        if let Some(raw) = query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_|
                RecordError::Validation("Invalid date format, expected YYYY-MM-DD".into())
            )?;
            let (from, until) = local_day_bounds(day).ok_or_else(||
                RecordError::Validation("Invalid date".into())
            )?;
            filter.from = Some(from);
            filter.until = Some(until);
        }

        let mut appointments = self.store.list_appointments(&filter).await?;
        appointments.sort_by(|a, b| a.appointment_time.cmp(&b.appointment_time));
        Ok(appointments)
    }

    async fn find(&self, id: &str) -> Result<Appointment, RecordError> {
        self.store
            .get_appointment(id).await?
            .ok_or_else(|| RecordError::NotFound("Appointment not found".into()))
    }

    async fn ensure_doctor_exists(&self, doctor_id: &str) -> Result<(), RecordError> {
        match self.store.find_user_by_id(doctor_id).await? {
            Some(user) if user.role == Role::Doctor => Ok(()),
            _ => Err(RecordError::Validation(format!("Unknown doctor: {}", doctor_id))),
        }
    }
}

fn scope(identity: &Identity) -> AppointmentQuery {
    match identity.role {
        Role::Doctor => AppointmentQuery::for_doctor(&identity.user_id),
        Role::Patient => AppointmentQuery::for_patient(&identity.user_id),
    }
}

fn visible_to(identity: &Identity, appointment: &Appointment) -> bool {
    scope(identity).matches(appointment)
}

fn resolve_time(
    appointment_time: Option<String>,
    date: Option<String>,
    time: Option<String>
) -> Result<Option<DateTime<Utc>>, RecordError> {
    let raw = match (trimmed(appointment_time), trimmed(date), trimmed(time)) {
        (Some(full), _, _) => full,
        (None, Some(date), Some(time)) => format!("{} {}", date, time),
        (None, None, None) => {
            return Ok(None);
        }
        _ => {
            return Err(RecordError::Validation("Both date and time are required".into()));
        }
    };
    parse_appointment_time(&raw)
        .map(Some)
        .ok_or_else(|| {
            RecordError::Validation(
                "Invalid appointment time, expected YYYY-MM-DD HH:MM or RFC 3339".into()
            )
        })
}

fn ensure_not_past(time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), RecordError> {
    if time < now {
        return Err(RecordError::Validation("Appointment time cannot be in the past".into()));
    }
    Ok(())
}

fn checked_age(age: i64) -> Result<u32, RecordError> {
    if (1..=MAX_AGE).contains(&age) {
        Ok(age as u32)
    } else {
        Err(RecordError::Validation("Age must be between 1 and 120".into()))
    }
}

fn ensure_email(email: Option<&str>) -> Result<(), RecordError> {
    match email {
        Some(e) if !looks_like_email(e) => {
            Err(RecordError::Validation("Invalid email address".into()))
        }
        _ => Ok(()),
    }
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, RecordError> {
    raw.parse::<AppointmentStatus>().map_err(|_| RecordError::Validation("Invalid status".into()))
}
