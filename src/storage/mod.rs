use std::sync::Arc;

use libsql::{Builder, Connection, Database};

use crate::error::BotResult;

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        telegram_id INTEGER PRIMARY KEY,
        phone TEXT,
        email TEXT,
        birthdate TEXT,
        gender TEXT CHECK(gender IN ('male', 'female')),
        full_name TEXT,
        registration_step TEXT,
        referral_count INTEGER DEFAULT 0,
        is_admin INTEGER DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        last_activity DATETIME DEFAULT CURRENT_TIMESTAMP,
        username TEXT,
        bonuses INTEGER DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS referrals (
        referrer_id INTEGER,
        referred_id INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (referrer_id, referred_id),
        FOREIGN KEY (referrer_id) REFERENCES users(telegram_id),
        FOREIGN KEY (referred_id) REFERENCES users(telegram_id)
    )",
    "CREATE TABLE IF NOT EXISTS promotions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        is_active INTEGER DEFAULT 1,
        start_date DATE DEFAULT CURRENT_DATE,
        end_date DATE,
        deleted_at DATETIME
    )",
    "CREATE TABLE IF NOT EXISTS promotion_views (
        promotion_id INTEGER,
        user_id INTEGER,
        viewed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (promotion_id, user_id),
        FOREIGN KEY (promotion_id) REFERENCES promotions(id),
        FOREIGN KEY (user_id) REFERENCES users(telegram_id)
    )",
    "CREATE TABLE IF NOT EXISTS appointment_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id INTEGER,
        status TEXT DEFAULT 'pending',
        admin_comment TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        processed_at DATETIME,
        processed_by INTEGER,
        data_snapshot TEXT,
        appointment_date TEXT,
        appointment_time TEXT,
        FOREIGN KEY (telegram_id) REFERENCES users(telegram_id)
    )",
    "CREATE TABLE IF NOT EXISTS bonus_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        amount INTEGER NOT NULL,
        operation_type TEXT CHECK(operation_type IN ('add', 'subtract')),
        admin_id INTEGER,
        comment TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users(telegram_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_promotions_active ON promotions(is_active)",
    "CREATE INDEX IF NOT EXISTS idx_promotions_dates ON promotions(start_date, end_date)",
    "CREATE INDEX IF NOT EXISTS idx_requests_status ON appointment_requests(status)",
];

#[derive(Clone)]
pub struct Db {
    inner: Arc<Database>,
}

impl Db {
    pub async fn open(path: &str) -> BotResult<Self> {
        info!("Opening database at {}", path);
        let db = Builder::new_local(path).build().await?;
        let this = Self { inner: Arc::new(db) };
        this.migrate().await?;
        info!("Database ready");
        Ok(this)
    }

    /// Throwaway file-backed database for the test suite. A local `:memory:`
    /// database in libsql is per-connection, so the migrated schema would be
    /// invisible to later `connect()` calls.
    #[cfg(test)]
    pub async fn open_temp() -> BotResult<Self> {
        Self::open(&temp_db_path()).await
    }

    pub fn connect(&self) -> BotResult<Connection> {
        Ok(self.inner.connect()?)
    }

    async fn migrate(&self) -> BotResult<()> {
        let conn = self.connect()?;
        for stmt in MIGRATIONS {
            conn.execute(stmt, ()).await?;
        }
        Ok(())
    }
}

/// Unique path under the system temp dir, one per call.
#[cfg(test)]
pub fn temp_db_path() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    std::env::temp_dir()
        .join(format!(
            "dentabot-test-{}-{}.db",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Db::open_temp().await.unwrap();
        // Running them a second time must not fail.
        db.migrate().await.unwrap();

        let conn = db.connect().unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert!(count >= 6);
    }

    #[tokio::test]
    async fn connections_share_one_database() {
        let db = Db::open_temp().await.unwrap();

        let writer = db.connect().unwrap();
        writer
            .execute(
                "INSERT INTO users (telegram_id, registration_step) VALUES (1, 'PHONE')",
                (),
            )
            .await
            .unwrap();

        // A fresh connection must see both the schema and the row.
        let reader = db.connect().unwrap();
        let mut rows = reader.query("SELECT COUNT(*) FROM users", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert_eq!(count, 1);
    }
}
