mod callback;
mod command;
mod message;
pub mod screens;

use teloxide::{
    dispatching::{
        dialogue::{self, ErasedStorage},
        UpdateHandler,
    },
    types::{Update, UserId},
};

use crate::services::dialogue::DialogueState;
use crate::state::AppState;

/// Per-update context, resolved once before dispatch. `is_admin` merges the
/// static allow-list with the database flag.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: UserId,
    pub username: Option<String>,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn identity(&self) -> i64 {
        self.user_id.0 as i64
    }
}

pub fn handler_tree() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dialogue::enter::<Update, ErasedStorage<DialogueState>, DialogueState, _>()
        .filter_map_async(|update: Update| async move {
            let state = match AppState::get() {
                Ok(state) => state,
                Err(e) => {
                    error!("Failed to get AppState: {:?}", e);
                    return None;
                }
            };

            let user = update.from()?.clone();
            let is_admin = state.profiles.is_privileged(user.id).await.unwrap_or_else(|e| {
                error!("Failed to check privileges for {}: {}", user.id, e);
                false
            });

            if let Err(e) = state.profiles.touch(user.id.0 as i64).await {
                warn!("Failed to touch last_activity for {}: {}", user.id, e);
            }

            Some(RequestContext {
                user_id: user.id,
                username: user.username.clone(),
                is_admin,
            })
        })
        .branch(command::get_command_handler())
        .branch(callback::get_callback_handler())
        .branch(message::get_message_handler())
}
