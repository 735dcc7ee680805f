use axum::{
    extract::{Query, State},
    Json,
};

use crate::models::RosterSnapshot;
use crate::services::activity_filter_service::ActivityFilter;
use crate::web::AppState;

pub async fn activities_handler(
    State(store): State<AppState>,
    Query(filter): Query<ActivityFilter>,
) -> Json<RosterSnapshot> {
    if filter.is_empty() {
        return Json(store.list_activities().await);
    }
    Json(store.list_filtered(&filter).await)
}
