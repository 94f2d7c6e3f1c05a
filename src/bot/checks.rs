use crate::bot::error::BotError;
use crate::config::Config;

pub fn check_admin(config: &Config, user_id: i64) -> Result<(), BotError> {
    if config.is_admin(user_id) {
        Ok(())
    } else {
        Err(BotError::PermissionDenied(format!(
            "user {user_id} is not an administrator"
        )))
    }
}
