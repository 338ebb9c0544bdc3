use chrono::{ DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("Invalid status: '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    /// Id of the patient account that owns the booking.
    pub patient_id: String,
    pub doctor_id: Option<String>,
    pub patient_name: String,
    pub patient_age: Option<u32>,
    pub patient_email: Option<String>,
    pub patient_contact: Option<String>,
    pub patient_address: Option<String>,
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Accepts RFC 3339 or a zone-less `YYYY-MM-DD HH:MM[:SS]`, the latter read
/// as server-local time.
pub fn parse_appointment_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS.iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// Server-local midnight to the following midnight, as UTC instants.
pub fn local_day_bounds(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Local.from_local_datetime(&day.and_hms_opt(0, 0, 0)?).earliest()?;
    let end = Local.from_local_datetime(&day.succ_opt()?.and_hms_opt(0, 0, 0)?).earliest()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Filter used by [`crate::store::AppointmentStore::list_appointments`].
///
/// `doctor_id` with `include_unassigned` also admits appointments that have
/// no doctor yet, which is how chat bookings arrive.
#[derive(Clone, Debug, Default)]
pub struct AppointmentQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub include_unassigned: bool,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AppointmentQuery {
    pub fn for_patient(patient_id: &str) -> Self {
        Self { patient_id: Some(patient_id.to_string()), ..Default::default() }
    }

    pub fn for_doctor(doctor_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            include_unassigned: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(patient_id) = &self.patient_id {
            if &appointment.patient_id != patient_id {
                return false;
            }
        }
        if let Some(doctor_id) = &self.doctor_id {
            match &appointment.doctor_id {
                Some(assigned) if assigned == doctor_id => {}
                None if self.include_unassigned => {}
                _ => return false,
            }
        }
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if appointment.appointment_time < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if appointment.appointment_time >= until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment(doctor_id: Option<&str>) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: "a1".into(),
            patient_id: "p1".into(),
            doctor_id: doctor_id.map(str::to_string),
            patient_name: "Jane".into(),
            patient_age: Some(30),
            patient_email: None,
            patient_contact: None,
            patient_address: None,
            appointment_time: now + Duration::hours(2),
            status: AppointmentStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn doctor_query_admits_unassigned_but_not_other_doctors() {
        let query = AppointmentQuery::for_doctor("d1");
        assert!(query.matches(&appointment(Some("d1"))));
        assert!(query.matches(&appointment(None)));
        assert!(!query.matches(&appointment(Some("d2"))));
    }

    #[test]
    fn time_window_is_half_open() {
        let appt = appointment(None);
        let query = AppointmentQuery {
            from: Some(appt.appointment_time),
            until: Some(appt.appointment_time + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(query.matches(&appt));

        let query = AppointmentQuery { until: Some(appt.appointment_time), ..Default::default() };
        assert!(!query.matches(&appt));
    }

    #[test]
    fn appointment_times_parse_in_several_layouts() {
        let local = parse_appointment_time("2099-01-01 10:00").unwrap();
        assert_eq!(parse_appointment_time("2099-01-01T10:00:00"), Some(local));
        assert_eq!(
            parse_appointment_time("2099-01-01T10:00:00Z").unwrap().to_rfc3339(),
            "2099-01-01T10:00:00+00:00"
        );
        assert!(parse_appointment_time("next tuesday").is_none());
        assert!(parse_appointment_time("2099-13-01 10:00").is_none());
    }

    #[test]
    fn local_day_spans_one_calendar_day() {
        let day = NaiveDate::from_ymd_opt(2099, 6, 15).unwrap();
        let (start, end) = local_day_bounds(day).unwrap();
        assert!(start < end);
        let noon = parse_appointment_time("2099-06-15 12:00").unwrap();
        assert!(start <= noon && noon < end);
    }

    #[test]
    fn status_parses_only_closed_set() {
        assert_eq!("Confirmed".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Confirmed));
        assert!("archived".parse::<AppointmentStatus>().is_err());
    }
}
