use sqlx::SqlitePool;
use tracing::info;

use crate::database::{activities_repo, schema_repo};
use crate::models::SeedActivity;

pub fn default_activities() -> Vec<SeedActivity> {
    vec![
        SeedActivity::new(
            "Chess Club",
            "Learn strategies and compete in chess tournaments",
            "Fridays, 3:30 PM - 5:00 PM",
            12,
            &["strategy", "competition", "indoor"],
        ),
        SeedActivity::new(
            "Programming Class",
            "Learn programming fundamentals and build software projects",
            "Tuesdays and Thursdays, 3:30 PM - 4:30 PM",
            20,
            &["technology", "coding", "education"],
        ),
        SeedActivity::new(
            "Gym Class",
            "Physical education and sports activities",
            "Mondays, Wednesdays, Fridays, 2:00 PM - 3:00 PM",
            30,
            &["sports", "physical", "outdoor"],
        ),
        SeedActivity::new(
            "GitHub Skills",
            "Learn practical coding and collaboration skills with GitHub",
            "Wednesdays, 4:00 PM - 5:30 PM",
            25,
            &["technology", "coding", "collaboration"],
        ),
    ]
}

/// Create the tables and seed the default activities into an empty database.
pub async fn init_db(pool: &SqlitePool) -> sqlx::Result<usize> {
    init_db_with(pool, &default_activities()).await
}

/// Returns how many activities were seeded; zero when the table already had rows.
pub async fn init_db_with(pool: &SqlitePool, seed: &[SeedActivity]) -> sqlx::Result<usize> {
    schema_repo::create_tables(pool).await?;

    let existing = activities_repo::count_activities(pool).await?;
    if existing > 0 {
        info!(existing, "roster already provisioned, skipping seed");
        return Ok(0);
    }

    for activity in seed {
        let tags = activity.tags.join(",");
        activities_repo::insert_activity(
            pool,
            activities_repo::NewActivity {
                name: &activity.name,
                description: &activity.description,
                schedule: &activity.schedule,
                max_participants: i64::from(activity.max_participants),
                tags: &tags,
            },
        )
        .await?;
    }

    info!(seeded = seed.len(), "roster seeded");
    Ok(seed.len())
}
