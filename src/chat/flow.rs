//! Scripted booking conversation.
//!
//! `welcome` offers two options: "1" ends the session with online
//! consultation details, "2" walks through `name → age → email → contact →
//! address → time`. Answers are stored raw and only validated once the form
//! reaches `complete`.

use chrono::{ DateTime, Utc };

use crate::auth::looks_like_email;
use crate::models::{
    new_id,
    parse_appointment_time,
    Appointment,
    AppointmentStatus,
    ChatSession,
    SessionStatus,
    Step,
};

pub const OPTIONS: [&str; 2] = ["1. Online Consultation", "2. Book Appointment"];

pub const WELCOME: &str =
    "Welcome to Smart Healthcare Assistant! 👋\nHow can I help you today?\nPlease select one of the following options:\n1. Online Consultation\n2. Book Appointment";

pub const CHOOSE_OPTION: &str =
    "To help you better, please select option 1 for Online Consultation or option 2 for Appointment Booking.";

pub const CONSULTATION: &str =
    "I'm setting up your online consultation. Here's your Zoom meeting link:\nJoin Zoom Meeting:\nhttps://zoom.us/j/123456789\nMeeting ID: 123 456 789\nPasscode: healthcare\nPlease click the link above to join the meeting. A healthcare professional will be with you shortly. The meeting will be active for the next 24 hours.";

pub const BOOKING_INTRO: &str =
    "I'll help you book an appointment. I'll need some information from you.";

pub const MAX_AGE: u32 = 120;
pub const MIN_CONTACT_DIGITS: usize = 10;

pub fn prompt(step: Step) -> &'static str {
    match step {
        Step::Welcome => WELCOME,
        Step::Name => "Please enter your full name:",
        Step::Age => "Please enter your age:",
        Step::Email => "Please enter your email address:",
        Step::Contact => "Please enter your contact number:",
        Step::Address => "Please enter your address:",
        Step::Time => "Please enter your preferred appointment date and time (YYYY-MM-DD HH:MM):",
        Step::Complete => "This conversation is complete. Start a new chat to book another appointment.",
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Reply(String),
    /// The form reached `complete`; it still has to be validated.
    Submit,
}

/// Applies one inbound message to the session in place.
pub fn apply(session: &mut ChatSession, input: &str) -> Outcome {
    match session.current_step {
        Step::Welcome => {
            match welcome_choice(input.trim()) {
                Some(Choice::Consultation) => {
                    record(session, Step::Welcome, input);
                    session.current_step = Step::Complete;
                    session.status = SessionStatus::Completed;
                    Outcome::Reply(CONSULTATION.to_string())
                }
                Some(Choice::Booking) => {
                    record(session, Step::Welcome, input);
                    session.current_step = next_open_step(session, Step::Welcome);
                    Outcome::Reply(
                        format!("{}\n{}", BOOKING_INTRO, prompt(session.current_step))
                    )
                }
                None => Outcome::Reply(format!("{}\n{}", CHOOSE_OPTION, OPTIONS.join("\n"))),
            }
        }
        Step::Complete => Outcome::Reply(prompt(Step::Complete).to_string()),
        step => {
            record(session, step, input);
            session.current_step = next_open_step(session, step);
            if session.current_step == Step::Complete {
                Outcome::Submit
            } else {
                Outcome::Reply(prompt(session.current_step).to_string())
            }
        }
    }
}

enum Choice {
    Consultation,
    Booking,
}

fn welcome_choice(input: &str) -> Option<Choice> {
    let lowered = input.to_lowercase();
    if input == "1" || lowered == OPTIONS[0].to_lowercase() || lowered == "online consultation" {
        Some(Choice::Consultation)
    } else if input == "2" || lowered == OPTIONS[1].to_lowercase() || lowered == "book appointment" {
        Some(Choice::Booking)
    } else {
        None
    }
}

fn record(session: &mut ChatSession, step: Step, input: &str) {
    session.appointment_data.insert(step.as_str().to_string(), input.to_string());
}

/// Next step in order, skipping form steps that already hold an answer
/// (which only happens after a failed submission rewound the session).
fn next_open_step(session: &ChatSession, from: Step) -> Step {
    let mut step = from.next();
    while step != Step::Complete && session.answer(step).is_some() {
        step = step.next();
    }
    step
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub step: Step,
    pub message: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BookingForm {
    pub name: String,
    pub age: u32,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub appointment_time: DateTime<Utc>,
}

impl BookingForm {
    pub fn into_appointment(self, patient_id: &str, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id: new_id(),
            patient_id: patient_id.to_string(),
            doctor_id: None,
            patient_name: self.name,
            patient_age: Some(self.age),
            patient_email: Some(self.email),
            patient_contact: Some(self.contact),
            patient_address: Some(self.address),
            appointment_time: self.appointment_time,
            status: AppointmentStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Checks every form answer; errors come back in step order.
pub fn validate(session: &ChatSession, now: DateTime<Utc>) -> Result<BookingForm, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut fail = |step, message| errors.push(FieldError { step, message });

    let answer = |step: Step| session.answer(step).map(str::trim).filter(|a| !a.is_empty());

    let name = answer(Step::Name);
    if name.is_none() {
        fail(Step::Name, "Please enter your name");
    }

    let age = answer(Step::Age)
        .and_then(|a| a.parse::<u32>().ok())
        .filter(|a| (1..=MAX_AGE).contains(a));
    if age.is_none() {
        fail(Step::Age, "Please enter a valid age (between 1 and 120)");
    }

    let email = answer(Step::Email).filter(|e| looks_like_email(e));
    if email.is_none() {
        fail(Step::Email, "Please enter a valid email address");
    }

    let contact = answer(Step::Contact).filter(|c| {
        c.len() >= MIN_CONTACT_DIGITS && c.chars().all(|ch| ch.is_ascii_digit())
    });
    if contact.is_none() {
        fail(Step::Contact, "Please enter a valid contact number (at least 10 digits)");
    }

    let address = answer(Step::Address);
    if address.is_none() {
        fail(Step::Address, "Please enter your address");
    }

    let appointment_time = answer(Step::Time).and_then(parse_appointment_time);
    match appointment_time {
        None => fail(Step::Time, "Please enter a valid date and time (YYYY-MM-DD HH:MM)"),
        Some(t) if t < now => fail(Step::Time, "The appointment time cannot be in the past"),
        Some(_) => {}
    }

    match (name, age, email, contact, address, appointment_time) {
        (Some(name), Some(age), Some(email), Some(contact), Some(address), Some(appointment_time))
            if errors.is_empty() => {
            Ok(BookingForm {
                name: name.to_string(),
                age,
                email: email.to_string(),
                contact: contact.to_string(),
                address: address.to_string(),
                appointment_time,
            })
        }
        _ => Err(errors),
    }
}

/// Drops the rejected answers and moves the session back to the first of
/// them. The session stays active.
pub fn rewind(session: &mut ChatSession, errors: &[FieldError]) {
    for error in errors {
        session.appointment_data.remove(error.step.as_str());
    }
    if let Some(first) = errors.iter().map(|e| e.step).min() {
        session.current_step = first;
    }
    session.status = SessionStatus::Active;
}

pub fn rejection_message(errors: &[FieldError]) -> String {
    let mut text = String::from("I couldn't book your appointment yet:\n");
    for error in errors {
        text.push_str(&format!("- {}\n", error.message));
    }
    if let Some(first) = errors.iter().map(|e| e.step).min() {
        text.push_str(prompt(first));
    }
    text
}

pub fn completion_message(appointment: &Appointment) -> String {
    format!(
        "Great! I've booked your appointment for {}. You can view the details in the appointments section.",
        appointment.appointment_time.format("%Y-%m-%d %H:%M UTC")
    )
}
