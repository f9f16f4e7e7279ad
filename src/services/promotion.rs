use libsql::params;

use crate::error::BotResult;
use crate::storage::Db;

pub const PROMOTIONS_PAGE_SIZE: i64 = 5;

#[derive(Clone, Debug)]
pub struct Promotion {
    pub id: i64,
    pub text: String,
    pub created_at: String,
    pub view_count: i64,
}

#[derive(Clone)]
pub struct PromotionService {
    db: Db,
}

impl PromotionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, text: &str) -> BotResult<i64> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO promotions (text, created_at, is_active, start_date)
             VALUES (?1, DATETIME('now'), 1, DATE('now'))",
            params![text],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Active promotions (not deleted, not past end_date), newest first,
    /// with impression counts.
    pub async fn active(&self) -> BotResult<Vec<Promotion>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT p.id, p.text, p.created_at, COALESCE(pv.view_count, 0)
                 FROM promotions p
                 LEFT JOIN (
                     SELECT promotion_id, COUNT(*) AS view_count
                     FROM promotion_views
                     GROUP BY promotion_id
                 ) pv ON p.id = pv.promotion_id
                 WHERE (p.is_active IS NULL OR p.is_active = 1)
                   AND (p.end_date IS NULL OR p.end_date >= DATE('now'))
                   AND p.deleted_at IS NULL
                 ORDER BY p.created_at DESC
                 LIMIT ?1",
                params![PROMOTIONS_PAGE_SIZE],
            )
            .await?;
        let mut promotions = Vec::new();
        while let Some(row) = rows.next().await? {
            promotions.push(Promotion {
                id: row.get(0)?,
                text: row.get(1)?,
                created_at: row.get::<Option<String>>(2)?.unwrap_or_default(),
                view_count: row.get::<Option<i64>>(3)?.unwrap_or(0),
            });
        }
        Ok(promotions)
    }

    /// At most one view row per (promotion, user) pair.
    pub async fn record_view(&self, promotion_id: i64, user_id: i64) -> BotResult<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO promotion_views (promotion_id, user_id, viewed_at)
             VALUES (?1, ?2, DATETIME('now'))",
            params![promotion_id, user_id],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::ProfileService;

    #[tokio::test]
    async fn views_are_unique_per_user() {
        let db = Db::open_temp().await.unwrap();
        let profiles = ProfileService::new(db.clone(), vec![]);
        profiles.begin_registration(1, None).await.unwrap();
        let svc = PromotionService::new(db);

        let id = svc.create("Скидка 20% на чистку").await.unwrap();
        svc.record_view(id, 1).await.unwrap();
        svc.record_view(id, 1).await.unwrap();
        svc.record_view(id, 1).await.unwrap();

        let promos = svc.active().await.unwrap();
        assert_eq!(promos.len(), 1);
        assert_eq!(promos[0].view_count, 1);
        assert_eq!(promos[0].text, "Скидка 20% на чистку");
    }

    #[tokio::test]
    async fn active_list_is_bounded_and_newest_first() {
        let db = Db::open_temp().await.unwrap();
        let svc = PromotionService::new(db);

        for i in 0..7 {
            svc.create(&format!("Акция {}", i)).await.unwrap();
        }
        let promos = svc.active().await.unwrap();
        assert_eq!(promos.len() as i64, PROMOTIONS_PAGE_SIZE);
        // Same-second timestamps: ordering falls back to insertion within the page.
        assert!(promos.iter().any(|p| p.text == "Акция 6"));
    }

    #[tokio::test]
    async fn soft_deleted_promotions_are_hidden() {
        let db = Db::open_temp().await.unwrap();
        let svc = PromotionService::new(db.clone());

        let id = svc.create("Старая акция").await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute(
            "UPDATE promotions SET deleted_at = DATETIME('now') WHERE id = ?1",
            libsql::params![id],
        )
        .await
        .unwrap();

        assert!(svc.active().await.unwrap().is_empty());
    }
}
