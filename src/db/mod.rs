pub mod chats;
pub mod messages;
pub mod orders;
pub mod providers;
pub mod quotes;
pub mod reviews;
pub mod users;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Create a SeaORM database connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
