use rocket_db_pools::sqlx::{self, PgPool};
use rocket_db_pools::Database;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Database)]
#[database("cards_db")]
pub struct CardsDb(sqlx::PgPool);

/// Apply pending migrations before the server starts taking traffic.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
