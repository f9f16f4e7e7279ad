pub mod admin;
pub mod editing;
pub mod menu;
pub mod photo;
pub mod registration;

use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::services::dialogue::DialogueState;

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .branch(
            dptree::filter(|msg: Message| msg.contact().is_some()).endpoint(registration::handle_contact),
        )
        .branch(dptree::case![DialogueState::AwaitingTeethPhoto].endpoint(photo::handle_teeth_photo))
        .branch(dptree::case![DialogueState::Editing(target)].endpoint(editing::handle_edit_input))
        .branch(dptree::case![DialogueState::AwaitingDecisionDate { request_id }].endpoint(admin::handle_decision_date))
        .branch(
            dptree::case![DialogueState::AwaitingDecisionTime { request_id, date }]
                .endpoint(admin::handle_decision_time),
        )
        .branch(dptree::case![DialogueState::AwaitingComment { request_id }].endpoint(admin::handle_comment))
        .branch(dptree::case![DialogueState::AddingPromotion].endpoint(admin::handle_promotion_text))
        .branch(dptree::case![DialogueState::AwaitingBonusPhone { kind }].endpoint(admin::handle_bonus_phone))
        .branch(
            dptree::case![DialogueState::AwaitingBonusAmount { kind, target, full_name }]
                .endpoint(admin::handle_bonus_amount),
        )
        .endpoint(menu::handle_text)
}
