pub mod activities_repo;
pub mod participants_repo;
pub mod schema_repo;
