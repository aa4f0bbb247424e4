use log::*;
use pesa_engine::SqliteDatabase;
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// A freshly migrated database in the temp directory that is dropped by [`TestDb::tear_down`].
pub struct TestDb {
    pub url: String,
    pub db: SqliteDatabase,
}

impl TestDb {
    pub async fn new() -> Self {
        dotenvy::from_filename(".env.test").ok();
        let _ = env_logger::try_init();
        let path = std::env::temp_dir().join(format!("pesa_engine_test_{}.db", rand::random::<u64>()));
        let url = format!("sqlite://{}", path.display());
        Sqlite::create_database(&url).await.expect("Error creating database");
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
        db.migrate().await.expect("Error running migrations");
        debug!("🚀️ Test database ready at {url}");
        Self { url, db }
    }

    pub async fn tear_down(self) {
        self.db.close().await;
        if let Err(e) = Sqlite::drop_database(&self.url).await {
            warn!("🚀️ Could not drop {}: {e}", self.url);
        }
    }
}
