pub mod appointment;
pub mod bonus;
pub mod dialogue;
pub mod export;
pub mod notifier;
pub mod profile;
pub mod promotion;
pub mod referral;
pub mod vision;
