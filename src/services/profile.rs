use libsql::{params, Row};
use serde::{Deserialize, Serialize};
use teloxide::types::UserId;

use crate::error::{BotError, BotResult};
use crate::services::dialogue::ProfileField;
use crate::storage::Db;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn display_ru(&self) -> &'static str {
        match self {
            Gender::Male => "Мужской",
            Gender::Female => "Женский",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    Phone,
    Birthdate,
    Email,
    Gender,
    FullName,
    Completed,
}

impl RegistrationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStep::Phone => "PHONE",
            RegistrationStep::Birthdate => "BIRTHDATE",
            RegistrationStep::Email => "EMAIL",
            RegistrationStep::Gender => "GENDER",
            RegistrationStep::FullName => "FULL_NAME",
            RegistrationStep::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PHONE" => Some(RegistrationStep::Phone),
            "BIRTHDATE" => Some(RegistrationStep::Birthdate),
            "EMAIL" => Some(RegistrationStep::Email),
            "GENDER" => Some(RegistrationStep::Gender),
            "FULL_NAME" => Some(RegistrationStep::FullName),
            "COMPLETED" => Some(RegistrationStep::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub gender: Option<Gender>,
    pub full_name: Option<String>,
    pub registration_step: RegistrationStep,
    pub referral_count: i64,
    pub is_admin: bool,
    pub created_at: String,
    pub last_activity: String,
    pub username: Option<String>,
    pub bonuses: i64,
}

const PROFILE_COLUMNS: &str = "telegram_id, phone, email, birthdate, gender, full_name, \
     registration_step, referral_count, is_admin, created_at, last_activity, username, bonuses";

impl UserProfile {
    fn from_row(row: &Row) -> BotResult<Self> {
        let gender: Option<String> = row.get(4)?;
        let step: Option<String> = row.get(6)?;
        Ok(Self {
            telegram_id: row.get(0)?,
            phone: row.get(1)?,
            email: row.get(2)?,
            birthdate: row.get(3)?,
            gender: gender.as_deref().and_then(Gender::from_str),
            full_name: row.get(5)?,
            registration_step: step
                .as_deref()
                .and_then(RegistrationStep::from_str)
                .unwrap_or(RegistrationStep::Phone),
            referral_count: row.get::<Option<i64>>(7)?.unwrap_or(0),
            is_admin: row.get::<Option<i64>>(8)?.unwrap_or(0) == 1,
            created_at: row.get::<Option<String>>(9)?.unwrap_or_default(),
            last_activity: row.get::<Option<String>>(10)?.unwrap_or_default(),
            username: row.get(11)?,
            bonuses: row.get::<Option<i64>>(12)?.unwrap_or(0),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.registration_step == RegistrationStep::Completed
    }
}

/// Aggregate user counters for the admin statistics screens.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserStats {
    pub total: i64,
    pub new_today: i64,
    pub new_last_week: i64,
    pub new_last_month: i64,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
    admin_allow_list: Vec<u64>,
}

impl ProfileService {
    pub fn new(db: Db, admin_allow_list: Vec<u64>) -> Self {
        Self { db, admin_allow_list }
    }

    pub async fn get(&self, telegram_id: i64) -> BotResult<Option<UserProfile>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users WHERE telegram_id = ?1", PROFILE_COLUMNS),
                params![telegram_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(UserProfile::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> BotResult<Option<UserProfile>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users WHERE phone = ?1", PROFILE_COLUMNS),
                params![phone],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(UserProfile::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Creates (or resets) a registration record at the PHONE step.
    pub async fn begin_registration(&self, telegram_id: i64, username: Option<&str>) -> BotResult<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO users (telegram_id, registration_step, created_at, username)
             VALUES (?1, ?2, DATETIME('now'), ?3)",
            params![telegram_id, RegistrationStep::Phone.as_str(), username],
        )
        .await?;
        Ok(())
    }

    pub async fn update_field(&self, telegram_id: i64, field: ProfileField, value: &str) -> BotResult<()> {
        let conn = self.db.connect()?;
        // Column name comes from a closed enum, never from user input.
        conn.execute(
            &format!(
                "UPDATE users SET {} = ?1, last_activity = DATETIME('now') WHERE telegram_id = ?2",
                field.column()
            ),
            params![value, telegram_id],
        )
        .await?;
        Ok(())
    }

    pub async fn set_step(&self, telegram_id: i64, step: RegistrationStep) -> BotResult<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "UPDATE users SET registration_step = ?1, last_activity = DATETIME('now') WHERE telegram_id = ?2",
            params![step.as_str(), telegram_id],
        )
        .await?;
        Ok(())
    }

    pub async fn set_gender(&self, telegram_id: i64, gender: Gender) -> BotResult<()> {
        self.update_field(telegram_id, ProfileField::Gender, gender.as_str()).await
    }

    pub async fn touch(&self, telegram_id: i64) -> BotResult<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "UPDATE users SET last_activity = DATETIME('now') WHERE telegram_id = ?1",
            params![telegram_id],
        )
        .await?;
        Ok(())
    }

    /// Single capability check: static allow-list merged with the database flag.
    pub async fn is_privileged(&self, user_id: UserId) -> BotResult<bool> {
        if self.admin_allow_list.contains(&user_id.0) {
            return Ok(true);
        }
        Ok(self
            .get(user_id.0 as i64)
            .await?
            .map(|u| u.is_admin)
            .unwrap_or(false))
    }

    /// All administrator identities: allow-list plus flagged users, deduplicated.
    pub async fn admin_ids(&self) -> BotResult<Vec<i64>> {
        let conn = self.db.connect()?;
        let mut ids: Vec<i64> = self.admin_allow_list.iter().map(|id| *id as i64).collect();
        let mut rows = conn.query("SELECT telegram_id FROM users WHERE is_admin = 1", ()).await?;
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Broadcast recipients: completed registration, active within the window.
    pub async fn active_completed(&self, window_days: u32) -> BotResult<Vec<i64>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT telegram_id FROM users
                 WHERE registration_step = ?1
                   AND last_activity >= DATETIME('now', '-' || ?2 || ' day')",
                params![RegistrationStep::Completed.as_str(), window_days as i64],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    pub async fn all(&self) -> BotResult<Vec<UserProfile>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users ORDER BY created_at DESC", PROFILE_COLUMNS),
                (),
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(UserProfile::from_row(&row)?);
        }
        Ok(users)
    }

    pub async fn stats(&self) -> BotResult<UserStats> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT
                    COUNT(*),
                    SUM(CASE WHEN DATE(created_at) = DATE('now') THEN 1 ELSE 0 END),
                    SUM(CASE WHEN DATE(created_at) >= DATE('now', '-7 days') THEN 1 ELSE 0 END),
                    SUM(CASE WHEN DATE(created_at) >= DATE('now', '-30 days') THEN 1 ELSE 0 END)
                 FROM users",
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            BotError::AppState("Empty aggregate result".to_string())
        })?;
        Ok(UserStats {
            total: row.get::<Option<i64>>(0)?.unwrap_or(0),
            new_today: row.get::<Option<i64>>(1)?.unwrap_or(0),
            new_last_week: row.get::<Option<i64>>(2)?.unwrap_or(0),
            new_last_month: row.get::<Option<i64>>(3)?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> ProfileService {
        let db = Db::open_temp().await.unwrap();
        ProfileService::new(db, vec![42])
    }

    #[tokio::test]
    async fn registration_walks_the_cursor_to_completed() {
        let svc = service().await;
        svc.begin_registration(100, Some("ivan")).await.unwrap();

        let user = svc.get(100).await.unwrap().unwrap();
        assert_eq!(user.registration_step, RegistrationStep::Phone);
        assert!(!user.is_completed());

        svc.update_field(100, ProfileField::Phone, "+79991234567").await.unwrap();
        svc.set_step(100, RegistrationStep::Birthdate).await.unwrap();
        svc.update_field(100, ProfileField::Birthdate, "01.01.1990").await.unwrap();
        svc.set_step(100, RegistrationStep::Email).await.unwrap();
        // email skipped
        svc.set_step(100, RegistrationStep::Gender).await.unwrap();
        svc.set_gender(100, Gender::Male).await.unwrap();
        svc.set_step(100, RegistrationStep::FullName).await.unwrap();
        svc.update_field(100, ProfileField::FullName, "Иванов Иван Иванович")
            .await
            .unwrap();
        svc.set_step(100, RegistrationStep::Completed).await.unwrap();

        // COMPLETED implies phone, birthdate, gender and full name are present.
        let user = svc.get(100).await.unwrap().unwrap();
        assert!(user.is_completed());
        assert!(user.phone.is_some());
        assert!(user.birthdate.is_some());
        assert_eq!(user.gender, Some(Gender::Male));
        assert!(user.full_name.is_some());
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn privilege_merges_allow_list_and_flag() {
        let svc = service().await;
        svc.begin_registration(200, None).await.unwrap();

        // Allow-listed id is privileged without any record.
        assert!(svc.is_privileged(UserId(42)).await.unwrap());
        // Plain user is not.
        assert!(!svc.is_privileged(UserId(200)).await.unwrap());

        let conn = svc.db.connect().unwrap();
        conn.execute("UPDATE users SET is_admin = 1 WHERE telegram_id = 200", ())
            .await
            .unwrap();
        assert!(svc.is_privileged(UserId(200)).await.unwrap());

        let admins = svc.admin_ids().await.unwrap();
        assert!(admins.contains(&42));
        assert!(admins.contains(&200));
        assert_eq!(admins.len(), 2);
    }

    #[tokio::test]
    async fn find_by_phone_is_exact() {
        let svc = service().await;
        svc.begin_registration(300, None).await.unwrap();
        svc.update_field(300, ProfileField::Phone, "+79991234567").await.unwrap();

        assert!(svc.find_by_phone("+79991234567").await.unwrap().is_some());
        assert!(svc.find_by_phone("+79991234568").await.unwrap().is_none());
    }
}
