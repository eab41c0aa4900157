use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use adoptly_types::models::{AdoptionApplication, ApplicationStatus, Pet, PetStatus};

use crate::models::{ApplicationRow, PetRow};
use crate::{Database, OptionalExt};

const APPLICATION_COLUMNS: &str = "id, pet_id, applicant_id, living_situation, status, \
     decline_reason, reviewed_by, reviewed_at, created_at";

impl Database {
    // -- Pets --

    pub fn create_pet(&self, id: Uuid, name: &str, species: &str) -> Result<Pet> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, species, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id.to_string(), name, species, PetStatus::Available.as_str(), crate::now()),
            )?;
            query_pet(conn, id)?.ok_or_else(|| anyhow::anyhow!("Pet vanished after insert: {}", id))
        })
    }

    pub fn get_pet(&self, id: Uuid) -> Result<Option<Pet>> {
        self.with_conn(|conn| query_pet(conn, id))
    }

    pub fn list_pets(&self) -> Result<Vec<Pet>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, species, status, created_at FROM pets ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], pet_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Pet::try_from).collect()
        })
    }

    // -- Applications --

    pub fn insert_application(
        &self,
        id: Uuid,
        pet_id: Uuid,
        applicant_id: Uuid,
        living_situation: &str,
    ) -> Result<AdoptionApplication> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO adoption_applications (id, pet_id, applicant_id, living_situation, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    id.to_string(),
                    pet_id.to_string(),
                    applicant_id.to_string(),
                    living_situation,
                    ApplicationStatus::Pending.as_str(),
                    crate::now(),
                ),
            )?;
            query_application(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Application vanished after insert: {}", id))
        })
    }

    pub fn get_application(&self, id: Uuid) -> Result<Option<AdoptionApplication>> {
        self.with_conn(|conn| query_application(conn, id))
    }

    /// Oldest first, so the review queue is worked in arrival order.
    pub fn get_pending_applications(&self) -> Result<Vec<AdoptionApplication>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM adoption_applications
                 WHERE status = 'pending' ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map([], application_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(AdoptionApplication::try_from).collect()
        })
    }

    /// Every application `applicant_id` has made, newest first.
    pub fn get_applications_by_applicant(&self, applicant_id: Uuid) -> Result<Vec<AdoptionApplication>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM adoption_applications
                 WHERE applicant_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([applicant_id.to_string()], application_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(AdoptionApplication::try_from).collect()
        })
    }

    /// Move a pending application to `status`. Approval also marks the pet
    /// adopted, in the same transaction. Returns `None` when the application
    /// does not exist or was already reviewed.
    pub fn review_application(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        status: ApplicationStatus,
        decline_reason: Option<&str>,
    ) -> Result<Option<AdoptionApplication>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE adoption_applications
                 SET status = ?2, decline_reason = ?3, reviewed_by = ?4, reviewed_at = ?5
                 WHERE id = ?1 AND status = 'pending'",
                (
                    id.to_string(),
                    status.as_str(),
                    decline_reason,
                    reviewer_id.to_string(),
                    crate::now(),
                ),
            )?;

            if changed == 0 {
                return Ok(None);
            }

            if status == ApplicationStatus::Approved {
                tx.execute(
                    "UPDATE pets SET status = ?1
                     WHERE id = (SELECT pet_id FROM adoption_applications WHERE id = ?2)",
                    (PetStatus::Adopted.as_str(), id.to_string()),
                )?;
            }

            let application = query_application(&tx, id)?;
            tx.commit()?;
            Ok(application)
        })
    }
}

fn query_pet(conn: &Connection, id: Uuid) -> Result<Option<Pet>> {
    conn.query_row(
        "SELECT id, name, species, status, created_at FROM pets WHERE id = ?1",
        [id.to_string()],
        pet_row,
    )
    .optional()?
    .map(Pet::try_from)
    .transpose()
}

fn query_application(conn: &Connection, id: Uuid) -> Result<Option<AdoptionApplication>> {
    conn.query_row(
        &format!("SELECT {APPLICATION_COLUMNS} FROM adoption_applications WHERE id = ?1"),
        [id.to_string()],
        application_row,
    )
    .optional()?
    .map(AdoptionApplication::try_from)
    .transpose()
}

fn pet_row(row: &Row<'_>) -> rusqlite::Result<PetRow> {
    Ok(PetRow {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn application_row(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        applicant_id: row.get(2)?,
        living_situation: row.get(3)?,
        status: row.get(4)?,
        decline_reason: row.get(5)?,
        reviewed_by: row.get(6)?,
        reviewed_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoptly_types::models::Role;

    #[test]
    fn approval_adopts_pet_once() {
        let db = Database::open_in_memory().unwrap();
        let adopter = Uuid::new_v4();
        let staff = Uuid::new_v4();
        db.create_user(adopter, "ada", "Ada", "x", Role::Adopter).unwrap();
        db.create_user(staff, "sam", "Sam", "x", Role::Staff).unwrap();
        let pet = db.create_pet(Uuid::new_v4(), "Biscuit", "dog").unwrap();
        let app = db
            .insert_application(Uuid::new_v4(), pet.id, adopter, "House with yard")
            .unwrap();

        let reviewed = db
            .review_application(app.id, staff, ApplicationStatus::Approved, None)
            .unwrap()
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(staff));
        assert_eq!(db.get_pet(pet.id).unwrap().unwrap().status, PetStatus::Adopted);

        // Already reviewed
        assert!(
            db.review_application(app.id, staff, ApplicationStatus::Declined, Some("late"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn queues_run_oldest_first_and_history_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let ada = Uuid::new_v4();
        let bo = Uuid::new_v4();
        db.create_user(ada, "ada", "Ada", "x", Role::Adopter).unwrap();
        db.create_user(bo, "bo", "Bo", "x", Role::Adopter).unwrap();
        let pet = db.create_pet(Uuid::new_v4(), "Biscuit", "dog").unwrap();
        let other = db.create_pet(Uuid::new_v4(), "Mochi", "cat").unwrap();

        let first = db.insert_application(Uuid::new_v4(), pet.id, ada, "Flat").unwrap();
        let second = db.insert_application(Uuid::new_v4(), pet.id, bo, "House").unwrap();
        let third = db.insert_application(Uuid::new_v4(), other.id, ada, "Flat").unwrap();

        let pending: Vec<Uuid> = db.get_pending_applications().unwrap().iter().map(|a| a.id).collect();
        assert_eq!(pending, vec![first.id, second.id, third.id]);

        let mine: Vec<Uuid> = db
            .get_applications_by_applicant(ada)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(mine, vec![third.id, first.id]);
    }
}
