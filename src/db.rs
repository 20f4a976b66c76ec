use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply the SQL files embedded from `migrations/`.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    if conn.get_database_backend() != DbBackend::Postgres {
        anyhow::bail!("migrations target PostgreSQL only");
    }
    sqlx::migrate!("./migrations")
        .run(conn.get_postgres_connection_pool())
        .await?;
    tracing::info!("migrations applied");
    Ok(())
}
