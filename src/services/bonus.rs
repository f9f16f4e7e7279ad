use libsql::params;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, BotResult};
use crate::storage::Db;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
    Add,
    Subtract,
}

impl BonusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusKind::Add => "add",
            BonusKind::Subtract => "subtract",
        }
    }
}

#[derive(Clone)]
pub struct BonusService {
    db: Db,
}

impl BonusService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Applies a bonus operation to a user. The balance update and the
    /// history append happen in one transaction; the balance is re-read
    /// inside it rather than trusted from the conversation state.
    /// Returns the new balance.
    pub async fn adjust(&self, admin_id: i64, target_id: i64, amount: i64, kind: BonusKind) -> BotResult<i64> {
        debug_assert!(amount > 0);

        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        let balance: i64 = {
            let mut rows = tx
                .query(
                    "SELECT bonuses FROM users WHERE telegram_id = ?1",
                    params![target_id],
                )
                .await?;
            match rows.next().await? {
                Some(row) => row.get::<Option<i64>>(0)?.unwrap_or(0),
                None => return Err(BotError::TargetNotFound(target_id.to_string())),
            }
        };

        let new_balance = match kind {
            BonusKind::Add => balance + amount,
            BonusKind::Subtract => {
                if amount > balance {
                    return Err(BotError::InsufficientBalance { balance });
                }
                balance - amount
            }
        };

        tx.execute(
            "UPDATE users SET bonuses = ?1 WHERE telegram_id = ?2",
            params![new_balance, target_id],
        )
        .await?;
        tx.execute(
            "INSERT INTO bonus_history (user_id, amount, operation_type, admin_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![target_id, amount, kind.as_str(), admin_id],
        )
        .await?;
        tx.commit().await?;

        Ok(new_balance)
    }

    /// Sum of the user's ledger rows (adds minus subtracts). Must always
    /// equal the stored balance.
    #[cfg(test)]
    pub async fn ledger_total(&self, target_id: i64) -> BotResult<i64> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT COALESCE(SUM(CASE WHEN operation_type = 'add' THEN amount ELSE -amount END), 0)
                 FROM bonus_history WHERE user_id = ?1",
                params![target_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<i64>>(0)?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    #[cfg(test)]
    async fn ledger_rows(&self, target_id: i64) -> BotResult<i64> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM bonus_history WHERE user_id = ?1",
                params![target_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::ProfileService;

    async fn setup() -> (ProfileService, BonusService) {
        let db = Db::open_temp().await.unwrap();
        let profiles = ProfileService::new(db.clone(), vec![]);
        profiles.begin_registration(1, None).await.unwrap();
        (profiles, BonusService::new(db))
    }

    #[tokio::test]
    async fn balance_always_equals_ledger_sum() {
        let (profiles, bonuses) = setup().await;

        bonuses.adjust(99, 1, 100, BonusKind::Add).await.unwrap();
        bonuses.adjust(99, 1, 50, BonusKind::Add).await.unwrap();
        bonuses.adjust(99, 1, 30, BonusKind::Subtract).await.unwrap();

        let user = profiles.get(1).await.unwrap().unwrap();
        assert_eq!(user.bonuses, 120);
        assert_eq!(bonuses.ledger_total(1).await.unwrap(), 120);
    }

    #[tokio::test]
    async fn overdraft_leaves_balance_and_ledger_untouched() {
        let (profiles, bonuses) = setup().await;
        bonuses.adjust(99, 1, 100, BonusKind::Add).await.unwrap();

        let err = bonuses.adjust(99, 1, 500, BonusKind::Subtract).await.unwrap_err();
        assert!(matches!(err, BotError::InsufficientBalance { balance: 100 }));

        let user = profiles.get(1).await.unwrap().unwrap();
        assert_eq!(user.bonuses, 100);
        assert_eq!(bonuses.ledger_rows(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_target_is_reported() {
        let (_, bonuses) = setup().await;
        assert!(matches!(
            bonuses.adjust(99, 777, 10, BonusKind::Add).await,
            Err(BotError::TargetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn subtract_down_to_zero_is_allowed() {
        let (profiles, bonuses) = setup().await;
        bonuses.adjust(99, 1, 100, BonusKind::Add).await.unwrap();
        let balance = bonuses.adjust(99, 1, 100, BonusKind::Subtract).await.unwrap();
        assert_eq!(balance, 0);
        assert_eq!(profiles.get(1).await.unwrap().unwrap().bonuses, 0);
    }
}
