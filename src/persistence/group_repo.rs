//! Contact group repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::contact::ContactGroup;
use crate::{AppError, Result};

use super::db::Database;

/// Identifier of the built-in group every database starts with.
pub const UNCATEGORIZED_GROUP_ID: i64 = 0;

/// Repository for contact groups.
#[derive(Clone)]
pub struct GroupRepo {
    db: Arc<Database>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    contact_count: i64,
}

impl From<GroupRow> for ContactGroup {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            contact_count: row.contact_count,
        }
    }
}

impl GroupRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a group with a unique, non-empty name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Invalid` for an empty name, `AppError::Conflict` if
    /// the name is taken, or `AppError::Db` if the insert fails.
    pub async fn create(&self, name: &str) -> Result<ContactGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Invalid("group name must not be empty".into()));
        }

        let result = sqlx::query("INSERT INTO contact_group (name) VALUES (?1)")
            .bind(name)
            .execute(self.db.as_ref())
            .await;

        match result {
            Ok(done) => Ok(ContactGroup {
                id: done.last_insert_rowid(),
                name: name.to_owned(),
                contact_count: 0,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict(format!("group '{name}' already exists")),
            ),
            Err(err) => Err(err.into()),
        }
    }

    /// Retrieve a group with its contact count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the group does not exist.
    pub async fn get_by_id(&self, id: i64) -> Result<ContactGroup> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT g.id, g.name, COUNT(c.id) AS contact_count
             FROM contact_group g
             LEFT JOIN contact c ON c.group_id = g.id
             WHERE g.id = ?1
             GROUP BY g.id",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(ContactGroup::from)
            .ok_or_else(|| AppError::NotFound(format!("group {id} not found")))
    }

    /// List all groups with their contact counts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self) -> Result<Vec<ContactGroup>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            "SELECT g.id, g.name, COUNT(c.id) AS contact_count
             FROM contact_group g
             LEFT JOIN contact c ON c.group_id = g.id
             GROUP BY g.id
             ORDER BY g.id ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        Ok(rows.into_iter().map(ContactGroup::from).collect())
    }

    /// Delete a group together with its contacts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the group does not exist, or
    /// `AppError::Db` if either delete fails.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;

        // Children first.
        sqlx::query("DELETE FROM contact WHERE group_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM contact_group WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("group {id} not found")));
        }

        tx.commit().await?;
        Ok(())
    }
}
