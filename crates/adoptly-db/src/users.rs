use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use adoptly_types::models::{Role, User};

use crate::models::UserRow;
use crate::{Database, OptionalExt};

const USER_COLUMNS: &str = "id, username, display_name, password, role, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: Uuid,
        username: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, display_name, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    id.to_string(),
                    username,
                    display_name,
                    password_hash,
                    role.as_str(),
                    crate::now(),
                ),
            )?;
            Ok(())
        })
    }

    /// Includes the password hash; only the login path should need this.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                user_row,
            )
            .optional()
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Every user whose role is in `roles`, oldest account first.
    pub fn get_users_by_role(&self, roles: &[Role]) -> Result<Vec<User>> {
        if roles.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=roles.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role IN ({}) ORDER BY created_at, id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params = rusqlite::params_from_iter(roles.iter().map(Role::as_str));

            let rows = stmt
                .query_map(params, user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.iter().map(UserRow::to_user).collect()
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id.to_string()],
            user_row,
        )
        .optional()?;

    row.as_ref().map(UserRow::to_user).transpose()
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_users_by_role() {
        let db = Database::open_in_memory().unwrap();
        let adopter = Uuid::new_v4();
        let staff = Uuid::new_v4();
        let admin = Uuid::new_v4();
        db.create_user(adopter, "ada", "Ada", "x", Role::Adopter).unwrap();
        db.create_user(staff, "sam", "Sam", "x", Role::Staff).unwrap();
        db.create_user(admin, "alex", "Alex", "x", Role::Admin).unwrap();

        let ids: Vec<Uuid> = db
            .get_users_by_role(&[Role::Admin, Role::Staff])
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&staff));
        assert!(ids.contains(&admin));
        assert!(db.get_users_by_role(&[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(Uuid::new_v4(), "ada", "Ada", "x", Role::Adopter).unwrap();
        let err = db
            .create_user(Uuid::new_v4(), "ada", "Ada 2", "x", Role::Adopter)
            .unwrap_err();
        assert!(crate::is_unique_violation(&err));
        assert!(!crate::is_foreign_key_violation(&err));
    }
}
