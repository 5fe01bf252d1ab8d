//! Schema bootstrap: tables are derived from the entity definitions and
//! created if missing. There is no migration tooling beyond this.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};

use crate::entities::{profile, tag, user, user_tag};

/// Create all tables. Idempotent; parent tables first so foreign keys
/// resolve.
///
/// # Errors
///
/// Returns the database error if a create statement fails.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, profile::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, user_tag::Entity).await?;
    Ok(())
}

async fn create_table<C: ConnectionTrait, E: EntityTrait>(db: &C, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
