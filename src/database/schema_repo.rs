use sqlx::SqlitePool;

const SQL_CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  description TEXT,
  schedule TEXT,
  max_participants INTEGER NOT NULL CHECK (max_participants > 0),
  tags TEXT
)
"#;

const SQL_CREATE_PARTICIPANTS: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
  id TEXT PRIMARY KEY,
  activity_id INTEGER NOT NULL REFERENCES activities(id),
  email TEXT NOT NULL,
  joined_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  UNIQUE (activity_id, email)
)
"#;

pub async fn create_tables(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(SQL_CREATE_ACTIVITIES).execute(pool).await?;
    sqlx::query(SQL_CREATE_PARTICIPANTS).execute(pool).await?;
    Ok(())
}
