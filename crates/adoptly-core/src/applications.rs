use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::{
    AdoptionApplication, ApplicationStatus, Notification, NotificationPayload, PetStatus, Role,
};

use crate::blocking;
use crate::directory::{UserDirectory, require_staff, require_user};
use crate::error::{CoreError, CoreResult};
use crate::notifications::{NotificationBroadcaster, NotificationDraft};

/// Roles told about every new application.
pub const REVIEWER_ROLES: [Role; 2] = [Role::Admin, Role::Staff];

#[derive(Debug)]
pub struct SubmittedApplication {
    pub application: AdoptionApplication,
    /// Notifications that were stored: one per reviewer plus the applicant's receipt.
    pub notifications: Vec<Notification>,
    pub staff_notified: usize,
    /// Notification failures. They never undo the submission.
    pub notify_errors: Vec<String>,
}

#[derive(Debug)]
pub struct ReviewedApplication {
    pub application: AdoptionApplication,
    pub notification: Option<Notification>,
    /// Set when the applicant could not be notified. The review still stands.
    pub notify_error: Option<String>,
}

/// Adoption applications and the notifications they trigger.
#[derive(Clone)]
pub struct ApplicationWorkflow {
    db: Arc<Database>,
    directory: Arc<dyn UserDirectory>,
    broadcaster: NotificationBroadcaster,
}

impl ApplicationWorkflow {
    pub fn new(
        db: Arc<Database>,
        directory: Arc<dyn UserDirectory>,
        broadcaster: NotificationBroadcaster,
    ) -> Self {
        Self { db, directory, broadcaster }
    }

    pub async fn submit(
        &self,
        applicant_id: Uuid,
        pet_id: Option<Uuid>,
        living_situation: Option<&str>,
    ) -> CoreResult<SubmittedApplication> {
        let pet_id = pet_id.ok_or_else(|| CoreError::validation("pet_id", "pet is required"))?;
        let living_situation = living_situation.map(str::trim).unwrap_or_default().to_string();
        if living_situation.is_empty() {
            return Err(CoreError::validation(
                "living_situation",
                "living situation is required",
            ));
        }

        let applicant = require_user(&self.directory, applicant_id).await?;
        let pet = blocking(&self.db, move |db| db.get_pet(pet_id))
            .await?
            .ok_or(CoreError::NotFound("pet"))?;
        if pet.status == PetStatus::Adopted {
            return Err(CoreError::validation("pet_id", "pet has already been adopted"));
        }

        let application = blocking(&self.db, move |db| {
            db.insert_application(Uuid::new_v4(), pet_id, applicant_id, &living_situation)
        })
        .await
        .map_err(|e| CoreError::from_insert(e, "pet"))?;

        info!(
            "Application {} submitted by {} for pet {}",
            application.id, applicant_id, pet_id
        );

        let mut notifications = Vec::new();
        let mut notify_errors = Vec::new();

        let staff_draft = NotificationDraft::new(
            "New Adoption Application",
            format!("{} submitted an application for {}", applicant.display_name, pet.name),
            NotificationPayload::ApplicationSubmitted {
                application_id: application.id,
                pet_id,
                pet_name: pet.name.clone(),
                adopter_id: applicant_id,
                adopter_name: applicant.display_name.clone(),
            },
        );

        let staff_notified = match self.broadcaster.broadcast_to_roles(&REVIEWER_ROLES, staff_draft).await {
            Ok(report) => {
                notify_errors.extend(report.failures().map(|(id, e)| format!("{}: {}", id, e)));
                let count = report.notified_count();
                notifications.extend(report.outcomes.into_iter().filter_map(|o| o.result.ok()));
                count
            }
            Err(e) => {
                warn!("Could not notify reviewers about application {}: {}", application.id, e);
                notify_errors.push(format!("reviewers: {}", e));
                0
            }
        };

        let receipt = NotificationDraft::new(
            "Application Received",
            format!("Your application for {} was received and is awaiting review", pet.name),
            NotificationPayload::ApplicationReceived {
                application_id: application.id,
                pet_id,
                pet_name: pet.name,
            },
        );

        match self.broadcaster.notify(Some(applicant_id), receipt).await {
            Ok(n) => notifications.push(n),
            Err(e) => {
                warn!("Could not send receipt for application {}: {}", application.id, e);
                notify_errors.push(format!("{}: {}", applicant_id, e));
            }
        }

        Ok(SubmittedApplication {
            application,
            notifications,
            staff_notified,
            notify_errors,
        })
    }

    pub async fn approve(&self, application_id: Uuid, reviewer_id: Uuid) -> CoreResult<ReviewedApplication> {
        self.review(application_id, reviewer_id, ApplicationStatus::Approved, None)
            .await
    }

    pub async fn decline(
        &self,
        application_id: Uuid,
        reviewer_id: Uuid,
        reason: &str,
    ) -> CoreResult<ReviewedApplication> {
        self.review(
            application_id,
            reviewer_id,
            ApplicationStatus::Declined,
            Some(reason.trim().to_string()),
        )
        .await
    }

    /// Pending applications, oldest first. Staff and admins only.
    pub async fn list_pending(&self, viewer_id: Uuid) -> CoreResult<Vec<AdoptionApplication>> {
        require_staff(&self.directory, viewer_id).await?;
        Ok(blocking(&self.db, |db| db.get_pending_applications()).await?)
    }

    /// The applicant's own applications, newest first.
    pub async fn list_for_applicant(&self, applicant_id: Uuid) -> CoreResult<Vec<AdoptionApplication>> {
        Ok(blocking(&self.db, move |db| db.get_applications_by_applicant(applicant_id)).await?)
    }

    /// One application, visible to its applicant and to reviewers.
    pub async fn get(&self, application_id: Uuid, viewer_id: Uuid) -> CoreResult<AdoptionApplication> {
        let application = blocking(&self.db, move |db| db.get_application(application_id))
            .await?
            .ok_or(CoreError::NotFound("application"))?;

        if application.applicant_id != viewer_id {
            require_staff(&self.directory, viewer_id).await?;
        }
        Ok(application)
    }

    async fn review(
        &self,
        application_id: Uuid,
        reviewer_id: Uuid,
        status: ApplicationStatus,
        reason: Option<String>,
    ) -> CoreResult<ReviewedApplication> {
        require_staff(&self.directory, reviewer_id).await?;

        let reviewed = blocking(&self.db, {
            let reason = reason.clone();
            move |db| {
                let Some(current) = db.get_application(application_id)? else {
                    return Ok(None);
                };
                let pet = db.get_pet(current.pet_id)?;
                let updated =
                    db.review_application(application_id, reviewer_id, status, reason.as_deref())?;
                Ok(Some((current, pet, updated)))
            }
        })
        .await?;

        let (current, pet, updated) = reviewed.ok_or(CoreError::NotFound("application"))?;
        let application = updated.ok_or_else(|| {
            CoreError::validation(
                "status",
                format!("application is already {}", current.status.as_str()),
            )
        })?;

        info!(
            "Application {} {} by {}",
            application_id,
            status.as_str(),
            reviewer_id
        );

        // Secondary effect: a failure here is reported, never rolled back.
        let pet_name = pet.map(|p| p.name).unwrap_or_else(|| "your selected pet".to_string());
        let draft = match status {
            ApplicationStatus::Declined => {
                let reason = reason.unwrap_or_default();
                let message = if reason.is_empty() {
                    format!("Your application for {} was declined.", pet_name)
                } else {
                    format!("Your application for {} was declined. Reason: {}", pet_name, reason)
                };
                NotificationDraft::new(
                    "Application Declined",
                    message,
                    NotificationPayload::ApplicationDeclined {
                        application_id,
                        pet_id: application.pet_id,
                        pet_name,
                        reason,
                    },
                )
            }
            _ => NotificationDraft::new(
                "Application Approved",
                format!("Your application for {} has been approved!", pet_name),
                NotificationPayload::ApplicationApproved {
                    application_id,
                    pet_id: application.pet_id,
                    pet_name,
                },
            ),
        };

        let (notification, notify_error) =
            match self.broadcaster.notify(Some(application.applicant_id), draft).await {
                Ok(n) => (Some(n), None),
                Err(e) => {
                    warn!(
                        "Application {} reviewed but applicant was not notified: {}",
                        application_id, e
                    );
                    (None, Some(e.to_string()))
                }
            };

        Ok(ReviewedApplication {
            application,
            notification,
            notify_error,
        })
    }
}
