use std::sync::Arc;

use anyhow::{Result, anyhow};
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::{Role, User};

use crate::error::{CoreError, CoreResult};

/// Who exists and what role they hold. The users table is the default
/// implementation; broadcasts and reviews only see users through this trait.
pub trait UserDirectory: Send + Sync {
    fn resolve_users_by_role(&self, roles: &[Role]) -> Result<Vec<Uuid>>;

    fn get_user(&self, id: Uuid) -> Result<Option<User>>;
}

impl UserDirectory for Database {
    fn resolve_users_by_role(&self, roles: &[Role]) -> Result<Vec<Uuid>> {
        Ok(self.get_users_by_role(roles)?.into_iter().map(|u| u.id).collect())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Database::get_user(self, id)
    }
}

pub(crate) async fn resolve_by_role(
    directory: &Arc<dyn UserDirectory>,
    roles: Vec<Role>,
) -> Result<Vec<Uuid>> {
    let directory = directory.clone();
    tokio::task::spawn_blocking(move || directory.resolve_users_by_role(&roles))
        .await
        .map_err(|e| anyhow!("directory task failed: {}", e))?
}

pub(crate) async fn require_user(directory: &Arc<dyn UserDirectory>, id: Uuid) -> CoreResult<User> {
    let directory = directory.clone();
    tokio::task::spawn_blocking(move || directory.get_user(id))
        .await
        .map_err(|e| anyhow!("directory task failed: {}", e))??
        .ok_or(CoreError::NotFound("user"))
}

/// Fetch `id` and require a staff or admin role.
pub(crate) async fn require_staff(directory: &Arc<dyn UserDirectory>, id: Uuid) -> CoreResult<User> {
    let user = require_user(directory, id).await?;
    if !user.role.is_staff() {
        return Err(CoreError::Permission("staff or admin role required"));
    }
    Ok(user)
}
