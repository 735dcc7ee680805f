pub mod activity_filter_service;
pub mod roster_service;
pub mod seed_service;
pub mod validation;
