use libsql::{params, Row};
use serde_json::json;

use crate::error::{BotError, BotResult};
use crate::services::profile::UserProfile;
use crate::storage::Db;

pub const PENDING_PAGE_SIZE: i64 = 10;
pub const HISTORY_PAGE_SIZE: i64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Decision {
    Approve { date: String, time: String },
    Reject,
}

#[derive(Clone, Debug)]
pub struct AppointmentRequest {
    pub id: i64,
    pub telegram_id: i64,
    pub status: RequestStatus,
    pub admin_comment: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
    pub processed_by: Option<i64>,
    pub data_snapshot: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

/// A request joined with the requester's current profile, for admin screens.
#[derive(Clone, Debug)]
pub struct RequestCard {
    pub request: AppointmentRequest,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub birthdate: Option<String>,
    pub gender: Option<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub today: i64,
}

const REQUEST_COLUMNS: &str = "ar.id, ar.telegram_id, ar.status, ar.admin_comment, ar.created_at, \
     ar.processed_at, ar.processed_by, ar.data_snapshot, ar.appointment_date, ar.appointment_time";

fn request_from_row(row: &Row) -> BotResult<AppointmentRequest> {
    let status: Option<String> = row.get(2)?;
    Ok(AppointmentRequest {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        status: status
            .as_deref()
            .and_then(RequestStatus::from_str)
            .unwrap_or(RequestStatus::Pending),
        admin_comment: row.get(3)?,
        created_at: row.get::<Option<String>>(4)?.unwrap_or_default(),
        processed_at: row.get(5)?,
        processed_by: row.get(6)?,
        data_snapshot: row.get(7)?,
        appointment_date: row.get(8)?,
        appointment_time: row.get(9)?,
    })
}

fn card_from_row(row: &Row) -> BotResult<RequestCard> {
    Ok(RequestCard {
        request: request_from_row(row)?,
        full_name: row.get(10)?,
        phone: row.get(11)?,
        email: row.get(12)?,
        username: row.get(13)?,
        birthdate: row.get(14)?,
        gender: row.get(15)?,
    })
}

#[derive(Clone)]
pub struct AppointmentService {
    db: Db,
}

impl AppointmentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates a pending request with an immutable snapshot of the profile.
    /// Fails with `ProfileIncomplete` unless registration is COMPLETED.
    pub async fn submit(&self, user: &UserProfile) -> BotResult<i64> {
        if !user.is_completed() {
            return Err(BotError::ProfileIncomplete);
        }

        let snapshot = serde_json::to_string(&json!({
            "full_name": user.full_name,
            "phone": user.phone,
            "email": user.email,
            "birthdate": user.birthdate,
            "gender": user.gender.map(|g| g.as_str()),
            "telegram_id": user.telegram_id,
            "username": user.username,
        }))?;

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO appointment_requests (telegram_id, status, created_at, data_snapshot)
             VALUES (?1, 'pending', DATETIME('now'), ?2)",
            params![user.telegram_id, snapshot],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Applies an admin decision. Approval carries the agreed date and time,
    /// rejection carries neither. A request that already left the pending
    /// state cannot be re-decided.
    pub async fn decide(&self, admin_id: i64, request_id: i64, decision: Decision) -> BotResult<AppointmentRequest> {
        let conn = self.db.connect()?;
        let (status, date, time) = match &decision {
            Decision::Approve { date, time } => (RequestStatus::Approved, Some(date.clone()), Some(time.clone())),
            Decision::Reject => (RequestStatus::Rejected, None, None),
        };
        // Guarding on status inside the UPDATE keeps two concurrent admins
        // from both claiming the same request.
        let affected = conn
            .execute(
                "UPDATE appointment_requests
                 SET status = ?1,
                     processed_at = DATETIME('now'),
                     processed_by = ?2,
                     appointment_date = ?3,
                     appointment_time = ?4
                 WHERE id = ?5 AND status = 'pending'",
                params![status.as_str(), admin_id, date, time, request_id],
            )
            .await?;
        if affected == 0 {
            return Err(match self.get(request_id).await? {
                None => BotError::RequestNotFound(request_id),
                Some(_) => BotError::RequestAlreadyProcessed(request_id),
            });
        }

        self.get(request_id)
            .await?
            .ok_or(BotError::RequestNotFound(request_id))
    }

    /// Sets the admin comment without changing the status.
    pub async fn annotate(&self, admin_id: i64, request_id: i64, comment: &str) -> BotResult<AppointmentRequest> {
        let conn = self.db.connect()?;
        let affected = conn
            .execute(
                "UPDATE appointment_requests
                 SET admin_comment = ?1,
                     processed_at = DATETIME('now'),
                     processed_by = ?2
                 WHERE id = ?3",
                params![comment, admin_id, request_id],
            )
            .await?;
        if affected == 0 {
            return Err(BotError::RequestNotFound(request_id));
        }
        self.get(request_id)
            .await?
            .ok_or(BotError::RequestNotFound(request_id))
    }

    pub async fn get(&self, request_id: i64) -> BotResult<Option<AppointmentRequest>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM appointment_requests ar WHERE ar.id = ?1",
                    REQUEST_COLUMNS
                ),
                params![request_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(request_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_card(&self, request_id: i64) -> BotResult<Option<RequestCard>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {}, u.full_name, u.phone, u.email, u.username, u.birthdate, u.gender
                     FROM appointment_requests ar
                     JOIN users u ON ar.telegram_id = u.telegram_id
                     WHERE ar.id = ?1",
                    REQUEST_COLUMNS
                ),
                params![request_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(card_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Pending requests, newest first, bounded to one page.
    pub async fn pending(&self) -> BotResult<Vec<RequestCard>> {
        self.cards(
            "WHERE ar.status = 'pending' ORDER BY ar.created_at DESC",
            PENDING_PAGE_SIZE,
        )
        .await
    }

    /// Decided requests, newest by decision time, bounded to one page.
    pub async fn history(&self) -> BotResult<Vec<RequestCard>> {
        self.cards(
            "WHERE ar.status != 'pending' ORDER BY ar.processed_at DESC",
            HISTORY_PAGE_SIZE,
        )
        .await
    }

    /// Every request ever made, newest first. Used for the xlsx export.
    pub async fn all_cards(&self) -> BotResult<Vec<RequestCard>> {
        self.cards("ORDER BY ar.created_at DESC", i64::MAX).await
    }

    async fn cards(&self, tail: &str, limit: i64) -> BotResult<Vec<RequestCard>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {}, u.full_name, u.phone, u.email, u.username, u.birthdate, u.gender
                     FROM appointment_requests ar
                     JOIN users u ON ar.telegram_id = u.telegram_id
                     {} LIMIT ?1",
                    REQUEST_COLUMNS, tail
                ),
                params![limit],
            )
            .await?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next().await? {
            cards.push(card_from_row(&row)?);
        }
        Ok(cards)
    }

    pub async fn for_user(&self, telegram_id: i64) -> BotResult<Vec<AppointmentRequest>> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM appointment_requests ar
                     WHERE ar.telegram_id = ?1
                     ORDER BY ar.created_at DESC",
                    REQUEST_COLUMNS
                ),
                params![telegram_id],
            )
            .await?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().await? {
            requests.push(request_from_row(&row)?);
        }
        Ok(requests)
    }

    pub async fn stats(&self) -> BotResult<RequestStats> {
        self.stats_where("", None).await
    }

    pub async fn user_stats(&self, telegram_id: i64) -> BotResult<RequestStats> {
        self.stats_where("WHERE telegram_id = ?1", Some(telegram_id)).await
    }

    async fn stats_where(&self, clause: &str, id: Option<i64>) -> BotResult<RequestStats> {
        let conn = self.db.connect()?;
        let sql = format!(
            "SELECT
                COUNT(*),
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END),
                SUM(CASE WHEN DATE(created_at) = DATE('now') THEN 1 ELSE 0 END)
             FROM appointment_requests {}",
            clause
        );
        let mut rows = match id {
            Some(id) => conn.query(&sql, params![id]).await?,
            None => conn.query(&sql, ()).await?,
        };
        let row = rows
            .next()
            .await?
            .ok_or_else(|| BotError::AppState("Empty aggregate result".to_string()))?;
        Ok(RequestStats {
            total: row.get::<Option<i64>>(0)?.unwrap_or(0),
            pending: row.get::<Option<i64>>(1)?.unwrap_or(0),
            approved: row.get::<Option<i64>>(2)?.unwrap_or(0),
            rejected: row.get::<Option<i64>>(3)?.unwrap_or(0),
            today: row.get::<Option<i64>>(4)?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dialogue::ProfileField;
    use crate::services::profile::{Gender, ProfileService, RegistrationStep};

    async fn setup() -> (ProfileService, AppointmentService) {
        let db = Db::open_temp().await.unwrap();
        (
            ProfileService::new(db.clone(), vec![]),
            AppointmentService::new(db),
        )
    }

    async fn completed_user(profiles: &ProfileService, id: i64) {
        profiles.begin_registration(id, Some("ivan")).await.unwrap();
        profiles.update_field(id, ProfileField::Phone, "+79991234567").await.unwrap();
        profiles.update_field(id, ProfileField::Birthdate, "01.01.1990").await.unwrap();
        profiles.set_gender(id, Gender::Male).await.unwrap();
        profiles
            .update_field(id, ProfileField::FullName, "Иванов Иван Иванович")
            .await
            .unwrap();
        profiles.set_step(id, RegistrationStep::Completed).await.unwrap();
    }

    #[tokio::test]
    async fn submit_requires_completed_profile() {
        let (profiles, appointments) = setup().await;
        profiles.begin_registration(1, None).await.unwrap();
        let user = profiles.get(1).await.unwrap().unwrap();

        assert!(matches!(
            appointments.submit(&user).await,
            Err(BotError::ProfileIncomplete)
        ));
    }

    #[tokio::test]
    async fn snapshot_is_decoupled_from_later_edits() {
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();

        let id = appointments.submit(&user).await.unwrap();
        let request = appointments.get(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        // Editing the profile afterwards must not change the snapshot.
        profiles.update_field(1, ProfileField::Phone, "+79990000000").await.unwrap();
        let request = appointments.get(id).await.unwrap().unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(request.data_snapshot.as_deref().unwrap()).unwrap();
        assert_eq!(snapshot["phone"], "+79991234567");
    }

    #[tokio::test]
    async fn approve_sets_schedule_and_leaves_pending_list() {
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();
        let id = appointments.submit(&user).await.unwrap();

        assert_eq!(appointments.pending().await.unwrap().len(), 1);

        let decided = appointments
            .decide(
                99,
                id,
                Decision::Approve {
                    date: "15.03.2025".to_string(),
                    time: "14:30".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.appointment_date.as_deref(), Some("15.03.2025"));
        assert_eq!(decided.appointment_time.as_deref(), Some("14:30"));
        assert_eq!(decided.processed_by, Some(99));
        assert!(decided.processed_at.is_some());
        assert!(appointments.pending().await.unwrap().is_empty());
        assert_eq!(appointments.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reject_leaves_schedule_unset() {
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();
        let id = appointments.submit(&user).await.unwrap();

        let decided = appointments.decide(99, id, Decision::Reject).await.unwrap();
        assert_eq!(decided.status, RequestStatus::Rejected);
        assert!(decided.appointment_date.is_none());
        assert!(decided.appointment_time.is_none());
    }

    #[tokio::test]
    async fn redeciding_is_rejected() {
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();
        let id = appointments.submit(&user).await.unwrap();

        appointments.decide(99, id, Decision::Reject).await.unwrap();
        assert!(matches!(
            appointments.decide(99, id, Decision::Reject).await,
            Err(BotError::RequestAlreadyProcessed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let (_, appointments) = setup().await;
        assert!(matches!(
            appointments.decide(99, 12345, Decision::Reject).await,
            Err(BotError::RequestNotFound(12345))
        ));
        assert!(matches!(
            appointments.annotate(99, 12345, "hi").await,
            Err(BotError::RequestNotFound(12345))
        ));
    }

    #[tokio::test]
    async fn unregistered_admin_can_decide_and_annotate() {
        // Allow-listed admins are not required to have a users row.
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();

        let first = appointments.submit(&user).await.unwrap();
        let second = appointments.submit(&user).await.unwrap();

        let decided = appointments.decide(555_000, first, Decision::Reject).await.unwrap();
        assert_eq!(decided.processed_by, Some(555_000));

        let annotated = appointments.annotate(555_000, second, "позвонить").await.unwrap();
        assert_eq!(annotated.processed_by, Some(555_000));
    }

    #[tokio::test]
    async fn annotate_keeps_status() {
        let (profiles, appointments) = setup().await;
        completed_user(&profiles, 1).await;
        let user = profiles.get(1).await.unwrap().unwrap();
        let id = appointments.submit(&user).await.unwrap();

        let annotated = appointments.annotate(99, id, "перезвоните нам").await.unwrap();
        assert_eq!(annotated.status, RequestStatus::Pending);
        assert_eq!(annotated.admin_comment.as_deref(), Some("перезвоните нам"));
        assert_eq!(annotated.processed_by, Some(99));
    }
}
