use std::sync::Once;

use plaza_settlement::SqliteDatabase;

static INIT: Once = Once::new();

pub fn prepare_test_env() {
    INIT.call_once(|| {
        dotenvy::from_filename(".env.test").ok();
        let _ = env_logger::try_init();
    });
}

pub fn random_db_path() -> String {
    let db_path = std::env::temp_dir().join(format!("plaza_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", db_path.display())
}

/// A throwaway database for one test. The file is created on demand and the schema is
/// bootstrapped by the connection itself.
pub async fn create_database() -> SqliteDatabase {
    prepare_test_env();
    let url = random_db_path();
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}
