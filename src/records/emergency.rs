use chrono::Utc;
use log::{ info, warn };
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::Identity;
use crate::models::{ new_id, EmergencyRequest, EmergencyStatus, Priority };
use crate::store::{ EmergencyStore, Store };
use super::{ trimmed, RecordError };

#[derive(Debug, Default, Deserialize)]
pub struct CreateEmergencyRequest {
    pub description: Option<String>,
    pub location: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEmergencyRequest {
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<EmergencyStatus>,
    pub priority: Option<Priority>,
}

pub struct EmergencyService {
    store: Arc<dyn Store>,
}

impl EmergencyService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        req: CreateEmergencyRequest
    ) -> Result<EmergencyRequest, RecordError> {
        let description = trimmed(req.description).ok_or_else(||
            RecordError::Validation("Missing required field: description".into())
        )?;
        let location = trimmed(req.location).ok_or_else(||
            RecordError::Validation("Missing required field: location".into())
        )?;

        let now = Utc::now();
        let emergency = EmergencyRequest {
            id: new_id(),
            patient_id: identity.user_id.clone(),
            description,
            location,
            status: EmergencyStatus::Pending,
            priority: req.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_emergency(&emergency).await?;
        warn!(
            "Emergency {} raised by {} with {:?} priority",
            emergency.id,
            identity.user_id,
            emergency.priority
        );
        Ok(emergency)
    }

    /// Doctors get every request, most urgent first; patients get their own,
    /// newest first.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<EmergencyRequest>, RecordError> {
        if identity.is_doctor() {
            let mut all = self.store.list_emergencies(None).await?;
            all.sort_by(|a, b| {
                b.priority.cmp(&a.priority).then_with(|| b.created_at.cmp(&a.created_at))
            });
            Ok(all)
        } else {
            let mut own = self.store.list_emergencies(Some(&identity.user_id)).await?;
            own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(own)
        }
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: &str,
        req: UpdateEmergencyRequest
    ) -> Result<EmergencyRequest, RecordError> {
        let mut emergency = self.store
            .get_emergency(id).await?
            .ok_or_else(|| RecordError::NotFound("Emergency request not found".into()))?;
        if !identity.is_doctor() && emergency.patient_id != identity.user_id {
            return Err(RecordError::Forbidden("You cannot modify this emergency request".into()));
        }

        if let Some(description) = trimmed(req.description) {
            emergency.description = description;
        }
        if let Some(location) = trimmed(req.location) {
            emergency.location = location;
        }
        if let Some(status) = req.status {
            emergency.status = status;
        }
        if let Some(priority) = req.priority {
            emergency.priority = priority;
        }
        emergency.updated_at = Utc::now();

        self.store.update_emergency(&emergency).await?;
        info!("Emergency {} updated by {}", emergency.id, identity.user_id);
        Ok(emergency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::records::test_support::seed_user;
    use crate::store::MemoryStore;

    fn request(description: &str, priority: Option<Priority>) -> CreateEmergencyRequest {
        CreateEmergencyRequest {
            description: Some(description.into()),
            location: Some("12 Elm Road".into()),
            priority,
        }
    }

    #[tokio::test]
    async fn create_requires_description_and_location() {
        let store = Arc::new(MemoryStore::new());
        let patient = seed_user(&store, "p1", Role::Patient).await;
        let service = EmergencyService::new(store);

        let created = service.create(&patient, request("Chest pain", None)).await.unwrap();
        assert_eq!(created.priority, Priority::Medium);
        assert_eq!(created.status, EmergencyStatus::Pending);

        let missing = CreateEmergencyRequest { location: None, ..request("Chest pain", None) };
        assert!(matches!(service.create(&patient, missing).await, Err(RecordError::Validation(_))));
        let blank = request("  ", None);
        assert!(matches!(service.create(&patient, blank).await, Err(RecordError::Validation(_))));
    }

    #[tokio::test]
    async fn doctors_see_all_by_urgency_patients_see_their_own() {
        let store = Arc::new(MemoryStore::new());
        let p1 = seed_user(&store, "p1", Role::Patient).await;
        let p2 = seed_user(&store, "p2", Role::Patient).await;
        let doctor = seed_user(&store, "d1", Role::Doctor).await;
        let service = EmergencyService::new(store);

        service.create(&p1, request("sprain", Some(Priority::Low))).await.unwrap();
        service.create(&p2, request("bleeding", Some(Priority::High))).await.unwrap();
        service.create(&p1, request("fever", None)).await.unwrap();

        let triaged: Vec<Priority> = service
            .list(&doctor).await
            .unwrap()
            .iter()
            .map(|e| e.priority)
            .collect();
        assert_eq!(triaged, vec![Priority::High, Priority::Medium, Priority::Low]);

        let own = service.list(&p1).await.unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|e| e.patient_id == "p1"));
        assert!(own[0].created_at >= own[1].created_at);
    }

    #[tokio::test]
    async fn update_is_limited_to_owner_or_doctor() {
        let store = Arc::new(MemoryStore::new());
        let p1 = seed_user(&store, "p1", Role::Patient).await;
        let p2 = seed_user(&store, "p2", Role::Patient).await;
        let doctor = seed_user(&store, "d1", Role::Doctor).await;
        let service = EmergencyService::new(store);
        let created = service.create(&p1, request("Chest pain", None)).await.unwrap();

        let other = service.update(&p2, &created.id, UpdateEmergencyRequest::default()).await;
        assert!(matches!(other, Err(RecordError::Forbidden(_))));

        let handled = service
            .update(&doctor, &created.id, UpdateEmergencyRequest {
                status: Some(EmergencyStatus::InProgress),
                priority: Some(Priority::High),
                ..Default::default()
            }).await
            .unwrap();
        assert_eq!(handled.status, EmergencyStatus::InProgress);
        assert_eq!(handled.priority, Priority::High);

        let missing = service.update(&doctor, "nope", UpdateEmergencyRequest::default()).await;
        assert!(matches!(missing, Err(RecordError::NotFound(_))));
    }
}
