use sqlx::SqlitePool;

use crate::models::ActivityParticipantsRow;

const SQL_LIST_PARTICIPANTS: &str = r#"
SELECT
  id,
  activity_id,
  email,
  joined_at
FROM participants
ORDER BY activity_id ASC, joined_at ASC, rowid ASC
"#;

pub async fn list_participants(pool: &SqlitePool) -> sqlx::Result<Vec<ActivityParticipantsRow>> {
    sqlx::query_as::<_, ActivityParticipantsRow>(SQL_LIST_PARTICIPANTS)
        .fetch_all(pool)
        .await
}

const SQL_INSERT_PARTICIPANT: &str = r#"
INSERT INTO participants (
  id,
  activity_id,
  email
) VALUES (?, ?, ?)
"#;

pub struct NewParticipant<'a> {
    pub id: &'a str,
    pub activity_id: i64,
    pub email: &'a str,
}

pub async fn insert_participant(
    pool: &SqlitePool,
    participant: NewParticipant<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_PARTICIPANT)
        .bind(participant.id)
        .bind(participant.activity_id)
        .bind(participant.email)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_PARTICIPANT: &str = r#"
DELETE FROM participants
WHERE activity_id = ?
  AND email = ?
"#;

pub async fn delete_participant(
    pool: &SqlitePool,
    activity_id: i64,
    email: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_PARTICIPANT)
        .bind(activity_id)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
