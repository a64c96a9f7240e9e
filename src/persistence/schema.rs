//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS` / `INSERT OR IGNORE` and are safe to
//! re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the group and contact tables and seed the `Uncategorized` group.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS contact_group (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS contact (
    id          INTEGER PRIMARY KEY,
    name        TEXT,
    phone       TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','sent','failed')),
    group_id    INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_contact_group_phone ON contact(group_id, phone);

INSERT OR IGNORE INTO contact_group (id, name) VALUES (0, 'Uncategorized');
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
