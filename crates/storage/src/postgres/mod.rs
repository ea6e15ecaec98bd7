//! PostgreSQL-backed stores.
//!
//! Every atomic primitive maps to one conditional statement (or one
//! transaction), so the guarantees hold across processes sharing a database.

mod cart;
mod catalog;
mod orders;

pub use cart::PgCartRepository;
pub use catalog::PgProductCatalog;
pub use orders::PgOrderRepository;

use sqlx::PgPool;

use crate::Result;

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
