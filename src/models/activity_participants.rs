// One row per enrollment; (activity_id, email) is unique.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityParticipantsRow {
    pub id: String,
    pub activity_id: i64,
    pub email: String,
    pub joined_at: String,
}
