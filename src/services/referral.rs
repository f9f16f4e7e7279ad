use libsql::params;

use crate::error::BotResult;
use crate::storage::Db;

#[derive(Clone)]
pub struct ReferralService {
    db: Db,
}

impl ReferralService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Records a referral once per (referrer, referred) pair. Self-referrals
    /// are ignored. Returns true if a new referral was recorded, in which
    /// case the referrer's counter has been incremented.
    pub async fn record(&self, referrer_id: i64, referred_id: i64) -> BotResult<bool> {
        if referrer_id == referred_id {
            return Ok(false);
        }

        let conn = self.db.connect()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO referrals (referrer_id, referred_id, created_at)
                 VALUES (?1, ?2, DATETIME('now'))",
                params![referrer_id, referred_id],
            )
            .await?;
        if inserted == 0 {
            return Ok(false);
        }

        conn.execute(
            "UPDATE users SET referral_count = referral_count + 1 WHERE telegram_id = ?1",
            params![referrer_id],
        )
        .await?;
        Ok(true)
    }

    pub async fn active_referrers(&self) -> BotResult<i64> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query("SELECT COUNT(DISTINCT referrer_id) FROM referrals", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    /// Parses the deep-link payload of `/start ref<id>`.
    pub fn parse_start_payload(payload: &str) -> Option<i64> {
        payload.trim().strip_prefix("ref")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::ProfileService;

    #[tokio::test]
    async fn referral_is_counted_once_per_pair() {
        let db = Db::open_temp().await.unwrap();
        let profiles = ProfileService::new(db.clone(), vec![]);
        profiles.begin_registration(1, None).await.unwrap();
        profiles.begin_registration(2, None).await.unwrap();
        let svc = ReferralService::new(db);

        assert!(svc.record(1, 2).await.unwrap());
        assert!(!svc.record(1, 2).await.unwrap());

        assert_eq!(profiles.get(1).await.unwrap().unwrap().referral_count, 1);
        assert_eq!(svc.active_referrers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn self_referral_is_ignored() {
        let db = Db::open_temp().await.unwrap();
        let profiles = ProfileService::new(db.clone(), vec![]);
        profiles.begin_registration(1, None).await.unwrap();
        let svc = ReferralService::new(db);

        assert!(!svc.record(1, 1).await.unwrap());
        assert_eq!(profiles.get(1).await.unwrap().unwrap().referral_count, 0);
    }

    #[test]
    fn start_payload_parsing() {
        assert_eq!(ReferralService::parse_start_payload("ref123"), Some(123));
        assert_eq!(ReferralService::parse_start_payload(" ref42 "), Some(42));
        assert_eq!(ReferralService::parse_start_payload("123"), None);
        assert_eq!(ReferralService::parse_start_payload("refabc"), None);
        assert_eq!(ReferralService::parse_start_payload(""), None);
    }
}
