use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Connectivity probe before the pipeline starts
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}
