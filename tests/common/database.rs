//! Test database setup
#![allow(dead_code)]

use chrono::NaiveDateTime;
use podium::{EntryService, FixedClock, LifecycleSettings};
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use tempfile::TempDir;

/// Connections in the pool used by contention tests.
pub const CONTENDED_POOL_SIZE: u32 = 8;

/// A fresh in-memory database with the full schema.
///
/// Every test gets its own database, so tests need no cleanup and can run
/// in parallel.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = podium::db::connect("sqlite::memory:", 1).await?;
    podium::db::create_schema(&db).await?;
    Ok(db)
}

/// A service over a fresh database whose clock starts at `now`.
pub async fn setup_service(now: NaiveDateTime) -> Result<(EntryService, Arc<FixedClock>), DbErr> {
    let db = setup_test_database().await?;
    let clock = Arc::new(FixedClock::new(now));
    let service = EntryService::new(db, clock.clone(), LifecycleSettings::default());
    Ok((service, clock))
}

/// A service over a file-backed database with several pooled connections,
/// so concurrent callers really do overlap inside the database.
///
/// The returned directory holds the database file; keep it alive for the
/// duration of the test.
pub async fn setup_contended_service(
    now: NaiveDateTime,
) -> Result<(EntryService, Arc<FixedClock>, TempDir), DbErr> {
    let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("podium.db").display()
    );
    let db = podium::db::connect(&url, CONTENDED_POOL_SIZE).await?;
    podium::db::create_schema(&db).await?;

    let clock = Arc::new(FixedClock::new(now));
    let settings = LifecycleSettings {
        max_attempts: 10,
        ..LifecycleSettings::default()
    };
    let service = EntryService::new(db, clock.clone(), settings);
    Ok((service, clock, dir))
}
