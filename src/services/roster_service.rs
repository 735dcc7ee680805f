use indexmap::{IndexMap, IndexSet};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::{activities_repo, participants_repo};
use crate::error::{ProvisionError, RosterError};
use crate::models::{ActivityView, RosterSnapshot, SeedActivity};
use crate::services::activity_filter_service::{parse_tags, ActivityFacts, ActivityFilter};
use crate::services::validation::{require_non_empty, BasicEmailValidator, EmailValidator};

/// Sole authority over activity capacity and membership.
///
/// The set of activities is fixed once the store is built, so the outer map
/// is never locked. Each activity carries its own mutex and every
/// check-then-mutate step runs while holding it: operations on one activity
/// are serialized, operations on different activities never wait on each
/// other.
pub struct RosterStore {
    activities: IndexMap<String, Arc<Mutex<ActivitySlot>>>,
    validator: Arc<dyn EmailValidator>,
    pool: Option<SqlitePool>,
}

struct ActivitySlot {
    row_id: Option<i64>,
    description: String,
    schedule: String,
    capacity: NonZeroU32,
    tags: Vec<String>,
    participants: IndexSet<String>,
}

impl ActivitySlot {
    fn check_signup(&self, email: &str) -> Result<(), RosterError> {
        if self.participants.contains(email) {
            return Err(RosterError::DuplicateRegistration);
        }
        if self.participants.len() >= self.capacity.get() as usize {
            return Err(RosterError::CapacityExceeded);
        }
        Ok(())
    }

    fn view(&self) -> ActivityView {
        ActivityView {
            description: self.description.clone(),
            schedule: self.schedule.clone(),
            max_participants: self.capacity.get(),
            participants: self.participants.iter().cloned().collect(),
        }
    }
}

impl RosterStore {
    /// In-memory roster, nothing is persisted.
    pub fn from_seed(seed: Vec<SeedActivity>) -> Result<Self, ProvisionError> {
        let mut activities = IndexMap::new();
        for activity in seed {
            let capacity = positive_capacity(&activity.name, i64::from(activity.max_participants))?;
            let slot = ActivitySlot {
                row_id: None,
                description: activity.description,
                schedule: activity.schedule,
                capacity,
                tags: activity.tags,
                participants: IndexSet::new(),
            };
            insert_slot(&mut activities, activity.name, slot)?;
        }
        Ok(Self::assemble(activities, None))
    }

    /// Roster backed by the database. Every accepted mutation is written
    /// through before the in-memory set changes.
    pub async fn load(pool: SqlitePool) -> Result<Self, ProvisionError> {
        let rows = activities_repo::list_activities(&pool).await?;
        let participant_rows = participants_repo::list_participants(&pool).await?;

        let mut by_activity: HashMap<i64, IndexSet<String>> = HashMap::new();
        for p in participant_rows {
            by_activity.entry(p.activity_id).or_default().insert(p.email);
        }

        let mut activities = IndexMap::new();
        for row in rows {
            let capacity = positive_capacity(&row.name, row.max_participants)?;
            let slot = ActivitySlot {
                row_id: Some(row.id),
                description: row.description.unwrap_or_default(),
                schedule: row.schedule.unwrap_or_default(),
                capacity,
                tags: row.tags.as_deref().map(parse_tags).unwrap_or_default(),
                participants: by_activity.remove(&row.id).unwrap_or_default(),
            };
            insert_slot(&mut activities, row.name, slot)?;
        }
        for (activity_id, orphans) in by_activity {
            warn!(activity_id, orphans = orphans.len(), "participants for unknown activity ignored");
        }

        let store = Self::assemble(activities, Some(pool));
        info!(activities = store.activities.len(), "roster loaded from database");
        Ok(store)
    }

    fn assemble(
        activities: IndexMap<String, Arc<Mutex<ActivitySlot>>>,
        pool: Option<SqlitePool>,
    ) -> Self {
        Self {
            activities,
            validator: Arc::new(BasicEmailValidator),
            pool,
        }
    }

    pub fn with_validator(mut self, validator: impl EmailValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn activity_names(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    /// Current roster. Each activity is read under its own lock, so every
    /// entry is internally consistent.
    pub async fn list_activities(&self) -> RosterSnapshot {
        self.list_filtered(&ActivityFilter::default()).await
    }

    pub async fn list_filtered(&self, filter: &ActivityFilter) -> RosterSnapshot {
        let mut out = RosterSnapshot::new();
        for (name, slot) in &self.activities {
            let slot = slot.lock().await;
            let facts = ActivityFacts {
                name,
                description: &slot.description,
                schedule: &slot.schedule,
                capacity: slot.capacity.get(),
                tags: &slot.tags,
            };
            if filter.matches(&facts) {
                out.insert(name.clone(), slot.view());
            }
        }
        out
    }

    pub async fn activity(&self, activity_name: &str) -> Option<ActivityView> {
        let slot = self.activities.get(activity_name)?;
        let view = slot.lock().await.view();
        Some(view)
    }

    pub async fn signup(&self, activity_name: &str, email: &str) -> Result<(), RosterError> {
        let slot = self.slot(activity_name)?;
        require_non_empty(email).map_err(RosterError::Validation)?;
        self.validator
            .validate(email)
            .map_err(RosterError::Validation)?;

        let pool = self.pool.clone();
        let owned_email = email.to_string();
        // Runs detached: dropping the caller must not abort a half-applied write.
        let task = tokio::spawn(async move {
            let mut slot = slot.lock().await;
            slot.check_signup(&owned_email)?;
            if let (Some(pool), Some(activity_id)) = (pool.as_ref(), slot.row_id) {
                let id = Uuid::new_v4().to_string();
                participants_repo::insert_participant(
                    pool,
                    participants_repo::NewParticipant {
                        id: &id,
                        activity_id,
                        email: &owned_email,
                    },
                )
                .await?;
            }
            slot.participants.insert(owned_email);
            Ok::<(), RosterError>(())
        });
        let result = join_mutation(task).await;
        log_outcome("signup", activity_name, email, &result);
        result
    }

    pub async fn unregister(&self, activity_name: &str, email: &str) -> Result<(), RosterError> {
        let slot = self.slot(activity_name)?;
        // Removal ignores the signup email policy, only emptiness is checked.
        require_non_empty(email).map_err(RosterError::Validation)?;

        let pool = self.pool.clone();
        let owned_email = email.to_string();
        let task = tokio::spawn(async move {
            let mut slot = slot.lock().await;
            if !slot.participants.contains(&owned_email) {
                return Err(RosterError::NotRegistered);
            }
            if let (Some(pool), Some(activity_id)) = (pool.as_ref(), slot.row_id) {
                let removed =
                    participants_repo::delete_participant(pool, activity_id, &owned_email).await?;
                if removed == 0 {
                    warn!(activity_id, email = %owned_email, "participant row already gone");
                }
            }
            slot.participants.shift_remove(&owned_email);
            Ok::<(), RosterError>(())
        });
        let result = join_mutation(task).await;
        log_outcome("unregister", activity_name, email, &result);
        result
    }

    fn slot(&self, activity_name: &str) -> Result<Arc<Mutex<ActivitySlot>>, RosterError> {
        self.activities
            .get(activity_name)
            .cloned()
            .ok_or(RosterError::NotFound)
    }
}

fn positive_capacity(activity: &str, raw: i64) -> Result<NonZeroU32, ProvisionError> {
    u32::try_from(raw)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ProvisionError::InvalidCapacity {
            activity: activity.to_string(),
        })
}

fn insert_slot(
    activities: &mut IndexMap<String, Arc<Mutex<ActivitySlot>>>,
    name: String,
    slot: ActivitySlot,
) -> Result<(), ProvisionError> {
    if activities.contains_key(&name) {
        return Err(ProvisionError::DuplicateActivity(name));
    }
    activities.insert(name, Arc::new(Mutex::new(slot)));
    Ok(())
}

async fn join_mutation(
    task: tokio::task::JoinHandle<Result<(), RosterError>>,
) -> Result<(), RosterError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(RosterError::Storage(format!("mutation task failed: {}", e))),
    }
}

fn log_outcome(op: &str, activity: &str, email: &str, result: &Result<(), RosterError>) {
    match result {
        Ok(()) => info!(op, activity, email, "roster mutation applied"),
        Err(e @ RosterError::Storage(_)) => {
            error!(op, activity, email, error = %e, "roster write-through failed")
        }
        Err(e) => warn!(op, activity, email, error = %e, "roster mutation rejected"),
    }
}

pub fn signup_message(activity: &str, email: &str) -> String {
    format!("Signed up {} for {}", email, activity)
}

pub fn unregister_message(activity: &str, email: &str) -> String {
    format!("Unregistered {} from {}", email, activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::seed_service;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    fn chess_club(capacity: u32) -> RosterStore {
        RosterStore::from_seed(vec![
            SeedActivity::new(
                "Chess Club",
                "Learn strategies and compete in chess tournaments",
                "Fridays, 3:30 PM - 5:00 PM",
                capacity,
                &["strategy"],
            ),
            SeedActivity::new(
                "Gym Class",
                "Physical education and sports activities",
                "Mondays, Wednesdays, Fridays, 2:00 PM - 3:00 PM",
                30,
                &["sports"],
            ),
        ])
        .unwrap()
    }

    async fn participants(store: &RosterStore, name: &str) -> Vec<String> {
        store.activity(name).await.unwrap().participants
    }

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn chess_club_walkthrough() {
        let store = chess_club(2);

        store.signup("Chess Club", "a@x.edu").await.unwrap();
        assert_eq!(participants(&store, "Chess Club").await, ["a@x.edu"]);

        assert_eq!(
            store.signup("Chess Club", "a@x.edu").await,
            Err(RosterError::DuplicateRegistration)
        );

        store.signup("Chess Club", "b@x.edu").await.unwrap();
        assert_eq!(participants(&store, "Chess Club").await, ["a@x.edu", "b@x.edu"]);

        assert_eq!(
            store.signup("Chess Club", "c@x.edu").await,
            Err(RosterError::CapacityExceeded)
        );

        store.unregister("Chess Club", "a@x.edu").await.unwrap();
        assert_eq!(participants(&store, "Chess Club").await, ["b@x.edu"]);

        store.signup("Chess Club", "c@x.edu").await.unwrap();
        assert_eq!(participants(&store, "Chess Club").await, ["b@x.edu", "c@x.edu"]);
    }

    #[tokio::test]
    async fn duplicate_leaves_count_unchanged() {
        let store = chess_club(5);
        store.signup("Chess Club", "a@x.edu").await.unwrap();
        assert_eq!(
            store.signup("Chess Club", "a@x.edu").await,
            Err(RosterError::DuplicateRegistration)
        );
        assert_eq!(participants(&store, "Chess Club").await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_wins_over_capacity_when_full() {
        let store = chess_club(1);
        store.signup("Chess Club", "a@x.edu").await.unwrap();
        assert_eq!(
            store.signup("Chess Club", "a@x.edu").await,
            Err(RosterError::DuplicateRegistration)
        );
    }

    #[tokio::test]
    async fn unknown_activity_is_not_found() {
        let store = chess_club(2);
        assert_eq!(
            store.signup("Underwater Basket Weaving", "a@x.edu").await,
            Err(RosterError::NotFound)
        );
        assert_eq!(
            store.unregister("Underwater Basket Weaving", "a@x.edu").await,
            Err(RosterError::NotFound)
        );
    }

    #[tokio::test]
    async fn unregister_twice_fails_the_second_time() {
        let store = chess_club(2);
        assert_eq!(
            store.unregister("Chess Club", "ghost@x.edu").await,
            Err(RosterError::NotRegistered)
        );

        store.signup("Chess Club", "a@x.edu").await.unwrap();
        store.unregister("Chess Club", "a@x.edu").await.unwrap();
        assert_eq!(
            store.unregister("Chess Club", "a@x.edu").await,
            Err(RosterError::NotRegistered)
        );
    }

    #[tokio::test]
    async fn empty_and_malformed_emails_are_rejected() {
        let store = chess_club(2);
        assert!(matches!(
            store.signup("Chess Club", "").await,
            Err(RosterError::Validation(_))
        ));
        assert!(matches!(
            store.signup("Chess Club", "not-an-email").await,
            Err(RosterError::Validation(_))
        ));
        assert!(matches!(
            store.unregister("Chess Club", "  ").await,
            Err(RosterError::Validation(_))
        ));
        assert!(participants(&store, "Chess Club").await.is_empty());
    }

    #[tokio::test]
    async fn custom_validator_replaces_the_default() {
        let store = chess_club(2).with_validator(|email: &str| {
            if email.ends_with("@mergington.edu") {
                Ok(())
            } else {
                Err("Use your school address".to_string())
            }
        });
        assert_eq!(
            store.signup("Chess Club", "a@x.edu").await,
            Err(RosterError::Validation("Use your school address".to_string()))
        );
        store.signup("Chess Club", "a@mergington.edu").await.unwrap();
        // Empty is refused before the validator is even asked.
        let permissive = chess_club(2).with_validator(|_: &str| -> Result<(), String> { Ok(()) });
        assert!(matches!(
            permissive.signup("Chess Club", "").await,
            Err(RosterError::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_slot_goes_to_exactly_one_caller() {
        for _ in 0..20 {
            let store = Arc::new(chess_club(2));
            store.signup("Chess Club", "first@x.edu").await.unwrap();

            let a = tokio::spawn({
                let store = store.clone();
                async move { store.signup("Chess Club", "a@x.edu").await }
            });
            let b = tokio::spawn({
                let store = store.clone();
                async move { store.signup("Chess Club", "b@x.edu").await }
            });
            let results = [a.await.unwrap(), b.await.unwrap()];

            let ok = results.iter().filter(|r| r.is_ok()).count();
            let full = results
                .iter()
                .filter(|r| **r == Err(RosterError::CapacityExceeded))
                .count();
            assert_eq!((ok, full), (1, 1));
            assert_eq!(participants(&store, "Chess Club").await.len(), 2);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_email_racing_is_admitted_once() {
        let store = Arc::new(chess_club(12));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.signup("Chess Club", "twin@x.edu").await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(e) => assert_eq!(e, RosterError::DuplicateRegistration),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(participants(&store, "Chess Club").await, ["twin@x.edu"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_racers_never_overfill() {
        let store = Arc::new(chess_club(5));
        let handles: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .signup("Chess Club", &format!("student{}@x.edu", i))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 5);
        assert_eq!(participants(&store, "Chess Club").await.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_unregisters_remove_once() {
        for _ in 0..20 {
            let store = Arc::new(chess_club(12));
            store.signup("Chess Club", "a@x.edu").await.unwrap();
            store.signup("Chess Club", "b@x.edu").await.unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.unregister("Chess Club", "a@x.edu").await })
                })
                .collect();

            let mut ok = 0;
            for h in handles {
                match h.await.unwrap() {
                    Ok(()) => ok += 1,
                    Err(e) => assert_eq!(e, RosterError::NotRegistered),
                }
            }
            assert_eq!(ok, 1);
            assert_eq!(participants(&store, "Chess Club").await, ["b@x.edu"]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn signup_racing_unregister_on_a_full_activity() {
        for _ in 0..20 {
            let store = Arc::new(chess_club(2));
            store.signup("Chess Club", "a@x.edu").await.unwrap();
            store.signup("Chess Club", "b@x.edu").await.unwrap();

            let leave = tokio::spawn({
                let store = store.clone();
                async move { store.unregister("Chess Club", "a@x.edu").await }
            });
            let join = tokio::spawn({
                let store = store.clone();
                async move { store.signup("Chess Club", "c@x.edu").await }
            });

            assert_eq!(leave.await.unwrap(), Ok(()));
            match join.await.unwrap() {
                Ok(()) => assert_eq!(
                    participants(&store, "Chess Club").await,
                    ["b@x.edu", "c@x.edu"]
                ),
                Err(e) => {
                    assert_eq!(e, RosterError::CapacityExceeded);
                    assert_eq!(participants(&store, "Chess Club").await, ["b@x.edu"]);
                }
            }
        }
    }

    #[tokio::test]
    async fn a_held_activity_does_not_block_another() {
        let store = chess_club(2);
        let chess = store.activities.get("Chess Club").unwrap().clone();
        let _held = chess.lock().await;

        tokio::time::timeout(
            Duration::from_secs(1),
            store.signup("Gym Class", "a@x.edu"),
        )
        .await
        .expect("gym signup should not wait on chess")
        .unwrap();
    }

    #[tokio::test]
    async fn listing_keeps_provisioning_and_insertion_order() {
        let store = chess_club(3);
        store.signup("Chess Club", "z@x.edu").await.unwrap();
        store.signup("Chess Club", "a@x.edu").await.unwrap();

        let snapshot = store.list_activities().await;
        let names: Vec<&String> = snapshot.keys().collect();
        assert_eq!(names, ["Chess Club", "Gym Class"]);
        assert_eq!(snapshot["Chess Club"].participants, ["z@x.edu", "a@x.edu"]);
        assert_eq!(snapshot["Chess Club"].max_participants, 3);
        assert_eq!(snapshot["Chess Club"].spots_left(), 1);
    }

    #[tokio::test]
    async fn filtered_listing() {
        let store = chess_club(3);
        let filter = ActivityFilter {
            day: Some("monday".to_string()),
            ..Default::default()
        };
        let snapshot = store.list_filtered(&filter).await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("Gym Class"));
    }

    #[test]
    fn provisioning_rejects_bad_seed() {
        let zero = RosterStore::from_seed(vec![SeedActivity::new("Nobody Club", "", "", 0, &[])]);
        assert!(matches!(zero, Err(ProvisionError::InvalidCapacity { .. })));

        let twice = RosterStore::from_seed(vec![
            SeedActivity::new("Chess Club", "", "", 1, &[]),
            SeedActivity::new("Chess Club", "", "", 2, &[]),
        ]);
        assert!(matches!(twice, Err(ProvisionError::DuplicateActivity(_))));
    }

    #[tokio::test]
    async fn mutations_are_written_through() {
        let pool = memory_pool().await;
        seed_service::init_db(&pool).await.unwrap();

        let store = RosterStore::load(pool.clone()).await.unwrap();
        store.signup("Chess Club", "a@x.edu").await.unwrap();
        store.signup("Chess Club", "b@x.edu").await.unwrap();
        store.signup("Gym Class", "a@x.edu").await.unwrap();
        store.unregister("Chess Club", "a@x.edu").await.unwrap();

        let reloaded = RosterStore::load(pool).await.unwrap();
        assert_eq!(participants(&reloaded, "Chess Club").await, ["b@x.edu"]);
        assert_eq!(participants(&reloaded, "Gym Class").await, ["a@x.edu"]);
        assert_eq!(
            reloaded.activity_names().collect::<Vec<_>>(),
            ["Chess Club", "Programming Class", "Gym Class", "GitHub Skills"]
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let pool = memory_pool().await;
        seed_service::init_db(&pool).await.unwrap();
        let store = RosterStore::load(pool.clone()).await.unwrap();

        sqlx::query("DROP TABLE participants")
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            store.signup("Chess Club", "a@x.edu").await,
            Err(RosterError::Storage(_))
        ));
        assert!(participants(&store, "Chess Club").await.is_empty());
    }
}
