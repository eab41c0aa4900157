use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::Pet;

use crate::blocking;
use crate::directory::{UserDirectory, require_staff};
use crate::error::{CoreError, CoreResult};

/// The adoptable animals applications refer to.
#[derive(Clone)]
pub struct PetCatalog {
    db: Arc<Database>,
    directory: Arc<dyn UserDirectory>,
}

impl PetCatalog {
    pub fn new(db: Arc<Database>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { db, directory }
    }

    pub async fn create(&self, actor_id: Uuid, name: &str, species: &str) -> CoreResult<Pet> {
        require_staff(&self.directory, actor_id).await?;

        let name = name.trim().to_string();
        let species = species.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name", "pet name is required"));
        }
        if species.is_empty() {
            return Err(CoreError::validation("species", "species is required"));
        }

        let pet = blocking(&self.db, move |db| db.create_pet(Uuid::new_v4(), &name, &species)).await?;
        info!("Pet {} ({}) listed by {}", pet.id, pet.name, actor_id);
        Ok(pet)
    }

    pub async fn get(&self, pet_id: Uuid) -> CoreResult<Pet> {
        blocking(&self.db, move |db| db.get_pet(pet_id))
            .await?
            .ok_or(CoreError::NotFound("pet"))
    }

    pub async fn list(&self) -> CoreResult<Vec<Pet>> {
        Ok(blocking(&self.db, |db| db.list_pets()).await?)
    }
}
