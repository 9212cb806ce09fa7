//! Database connection and schema bootstrap.

use crate::error::{ENTRY_UNIQUE_INDEX, USAGE_UNIQUE_INDEX};
use crate::orm::{entries, rounds, sticker_usages, stickers};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

/// Opens a connection pool.
///
/// In-memory SQLite databases live and die with their connection, so they
/// are pinned to a single pooled connection.
pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    if url.starts_with("sqlite::memory:") || url.contains("mode=memory") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(max_connections.max(1));
    }
    opt.connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

async fn create_table<E: EntityTrait>(entity: E, db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    db.execute(backend.build(schema.create_table_from_entity(entity).if_not_exists()))
        .await?;

    Ok(())
}

/// Creates every table and index this service relies on, if missing.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(rounds::Entity, db).await?;
    create_table(entries::Entity, db).await?;
    create_table(stickers::Entity, db).await?;
    create_table(sticker_usages::Entity, db).await?;

    // Partial indexes are spelled the same on PostgreSQL and SQLite
    let backend = db.get_database_backend();
    let indexes = [
        format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{}" ON "entries" ("round_id", "user_id") WHERE "post_id" IS NOT NULL"#,
            ENTRY_UNIQUE_INDEX
        ),
        format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{}" ON "sticker_usages" ("sticker_id", "media_url") WHERE "is_deleted" = false"#,
            USAGE_UNIQUE_INDEX
        ),
        r#"CREATE INDEX IF NOT EXISTS "sticker_usages_media_idx" ON "sticker_usages" ("media_url")"#
            .to_string(),
        r#"CREATE INDEX IF NOT EXISTS "entries_post_idx" ON "entries" ("post_id")"#.to_string(),
    ];
    for sql in indexes {
        db.execute(Statement::from_string(backend, sql)).await?;
    }

    log::debug!("Schema is up to date");
    Ok(())
}
