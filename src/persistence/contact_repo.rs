//! Contact repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::contact::{Contact, ContactRow, DeliveryStatus, NewContact};
use crate::Result;

use super::db::Database;

/// Repository for contact records and their delivery status.
#[derive(Clone)]
pub struct ContactRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ContactDbRow {
    id: i64,
    name: Option<String>,
    phone: String,
    status: String,
    group_id: i64,
    group_name: String,
}

impl ContactDbRow {
    fn into_contact(self) -> Result<Contact> {
        Ok(Contact {
            id: self.id,
            name: self.name,
            phone: self.phone,
            status: DeliveryStatus::parse(&self.status)?,
            group_id: self.group_id,
            group_name: self.group_name,
        })
    }
}

impl ContactRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert contacts into a group as `pending`, skipping phones already
    /// present in that group (and duplicates within `contacts`).
    ///
    /// The `(group_id, phone)` unique index makes the skip atomic, so
    /// concurrent inserts into one group never duplicate a phone.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn insert_many(&self, group_id: i64, contacts: &[NewContact]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;
        for contact in contacts {
            let phone = contact.phone.trim();
            if phone.is_empty() {
                continue;
            }
            let name = contact
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty());
            let result = sqlx::query(
                "INSERT OR IGNORE INTO contact (name, phone, status, group_id)
                 VALUES (?1, ?2, 'pending', ?3)",
            )
            .bind(name)
            .bind(phone)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    /// Retrieve a contact by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let row: Option<ContactDbRow> = sqlx::query_as(
            "SELECT c.id, c.name, c.phone, c.status, c.group_id, g.name AS group_name
             FROM contact c
             JOIN contact_group g ON g.id = c.group_id
             WHERE c.id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(ContactDbRow::into_contact).transpose()
    }

    /// List every contact, newest first; optionally scoped to one group.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self, group_id: Option<i64>) -> Result<Vec<Contact>> {
        let rows: Vec<ContactDbRow> = if let Some(gid) = group_id {
            sqlx::query_as(
                "SELECT c.id, c.name, c.phone, c.status, c.group_id, g.name AS group_name
                 FROM contact c
                 JOIN contact_group g ON g.id = c.group_id
                 WHERE c.group_id = ?1
                 ORDER BY c.id DESC",
            )
            .bind(gid)
            .fetch_all(self.db.as_ref())
            .await?
        } else {
            sqlx::query_as(
                "SELECT c.id, c.name, c.phone, c.status, c.group_id, g.name AS group_name
                 FROM contact c
                 JOIN contact_group g ON g.id = c.group_id
                 ORDER BY c.id DESC",
            )
            .fetch_all(self.db.as_ref())
            .await?
        };

        rows.into_iter().map(ContactDbRow::into_contact).collect()
    }

    /// Contacts in a group still needing delivery (anything not `sent`),
    /// in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending_rows(&self, group_id: i64) -> Result<Vec<ContactRow>> {
        let rows: Vec<(i64, Option<String>, String)> = sqlx::query_as(
            "SELECT id, name, phone FROM contact
             WHERE group_id = ?1 AND status != 'sent'
             ORDER BY id ASC",
        )
        .bind(group_id)
        .fetch_all(self.db.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, phone)| ContactRow { id, name, phone })
            .collect())
    }

    /// Set one contact's delivery status. Committed before returning.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_status(&self, id: i64, status: DeliveryStatus) -> Result<()> {
        sqlx::query("UPDATE contact SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Return every contact in a group to `pending`. Idempotent.
    ///
    /// Returns the number of contacts in the group.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn reset_group(&self, group_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE contact SET status = 'pending' WHERE group_id = ?1")
            .bind(group_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}
