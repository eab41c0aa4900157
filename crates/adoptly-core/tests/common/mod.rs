#![allow(dead_code)]

use std::sync::Arc;

use adoptly_core::{Services, UserDirectory};
use adoptly_db::Database;
use adoptly_types::models::{Role, User};
use uuid::Uuid;

pub struct World {
    pub db: Arc<Database>,
    pub services: Services,
}

pub fn world() -> World {
    let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
    World {
        services: Services::new(db.clone()),
        db,
    }
}

pub fn add_user(db: &Database, username: &str, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(id, username, &username.to_uppercase(), "not-a-real-hash", role)
        .expect("create user");
    id
}

/// Directory that also reports accounts missing from the users table, so
/// inserts for them fail on the foreign key.
pub struct GhostDirectory {
    pub db: Arc<Database>,
    pub ghosts: Vec<Uuid>,
}

impl UserDirectory for GhostDirectory {
    fn resolve_users_by_role(&self, roles: &[Role]) -> anyhow::Result<Vec<Uuid>> {
        let mut ids = self.db.resolve_users_by_role(roles)?;
        ids.extend(self.ghosts.iter().copied());
        Ok(ids)
    }

    fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.db.get_user(id)
    }
}

/// Directory whose backing store is down.
pub struct OfflineDirectory;

impl UserDirectory for OfflineDirectory {
    fn resolve_users_by_role(&self, _roles: &[Role]) -> anyhow::Result<Vec<Uuid>> {
        anyhow::bail!("directory unreachable")
    }

    fn get_user(&self, _id: Uuid) -> anyhow::Result<Option<User>> {
        anyhow::bail!("directory unreachable")
    }
}
