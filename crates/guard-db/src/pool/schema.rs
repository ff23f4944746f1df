//! Schema bootstrap
//!
//! Tables are created idempotently at startup.

use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: [&str; 6] = [
    r"
    CREATE TABLE IF NOT EXISTS join_records (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id   INTEGER NOT NULL,
        group_id  INTEGER NOT NULL,
        join_time TEXT    NOT NULL
    )
    ",
    r"CREATE INDEX IF NOT EXISTS idx_join_records_user ON join_records (user_id)",
    r"CREATE INDEX IF NOT EXISTS idx_join_records_group ON join_records (group_id)",
    r"
    CREATE TABLE IF NOT EXISTS quit_records (
        user_id   INTEGER NOT NULL,
        group_id  INTEGER NOT NULL,
        quit_time TEXT    NOT NULL,
        quit_type TEXT    NOT NULL CHECK (quit_type IN ('kick', 'leave')),
        PRIMARY KEY (user_id, group_id, quit_time)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS group_members (
        group_id INTEGER NOT NULL,
        user_id  INTEGER NOT NULL,
        PRIMARY KEY (group_id, user_id)
    )
    ",
    r"CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members (user_id)",
];

/// Create every table and index if missing
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Record store schema ready");
    Ok(())
}
