use std::sync::OnceLock;

use crate::config::AppConfig;
use crate::error::{BotError, BotResult};
use crate::services::appointment::AppointmentService;
use crate::services::bonus::BonusService;
use crate::services::profile::ProfileService;
use crate::services::promotion::PromotionService;
use crate::services::referral::ReferralService;
use crate::services::vision::VisionService;
use crate::storage::Db;

#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileService,
    pub appointments: AppointmentService,
    pub bonuses: BonusService,
    pub promotions: PromotionService,
    pub referrals: ReferralService,
    pub vision: VisionService,
}

static APP_STATE: OnceLock<AppState> = OnceLock::new();

impl AppState {
    pub async fn new(config: &AppConfig) -> BotResult<Self> {
        let db = Db::open(&config.database.path).await?;
        let admin_ids = config.admin.user_ids.iter().map(|id| id.0).collect();

        Ok(Self {
            profiles: ProfileService::new(db.clone(), admin_ids),
            appointments: AppointmentService::new(db.clone()),
            bonuses: BonusService::new(db.clone()),
            promotions: PromotionService::new(db.clone()),
            referrals: ReferralService::new(db.clone()),
            vision: VisionService::new(config.vision.clone()),
        })
    }

    pub fn set_global(state: AppState) -> BotResult<()> {
        APP_STATE
            .set(state)
            .map_err(|_| BotError::AppState("Failed to set global app state".into()))
    }

    pub fn get() -> BotResult<AppState> {
        APP_STATE
            .get()
            .cloned()
            .ok_or_else(|| BotError::AppState("App state not initialized".into()))
    }
}
