//! Inline-button actions.
//!
//! Every button carries the encoded form of a [`MenuAction`] as its callback data.

use std::fmt;
use std::str::FromStr;

use crate::bot::error::BotError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Live sample and chart of a monitored service
    ServiceStatus { service: String },
    /// Back to the monitored service list
    BackToServices,

    // Admin panel
    AdminStats,
    AdminLastMessage,
    AdminBroadcast,
    AdminRefStats,
    BackToAdmin,

    // Broadcast confirmation
    ConfirmBroadcast,
    CancelBroadcast,
}

const SERVICE_PREFIX: &str = "svc:";

impl MenuAction {
    pub fn callback_data(&self) -> String {
        self.to_string()
    }

    /// Actions reserved for administrators.
    pub fn is_admin_only(&self) -> bool {
        !matches!(
            self,
            MenuAction::ServiceStatus { .. } | MenuAction::BackToServices
        )
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::ServiceStatus { service } => write!(f, "{SERVICE_PREFIX}{service}"),
            MenuAction::BackToServices => f.write_str("back"),
            MenuAction::AdminStats => f.write_str("admin:stats"),
            MenuAction::AdminLastMessage => f.write_str("admin:last"),
            MenuAction::AdminBroadcast => f.write_str("admin:broadcast"),
            MenuAction::AdminRefStats => f.write_str("admin:refstats"),
            MenuAction::BackToAdmin => f.write_str("admin:back"),
            MenuAction::ConfirmBroadcast => f.write_str("broadcast:confirm"),
            MenuAction::CancelBroadcast => f.write_str("broadcast:cancel"),
        }
    }
}

impl FromStr for MenuAction {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(service) = s.strip_prefix(SERVICE_PREFIX)
            && !service.is_empty()
        {
            return Ok(MenuAction::ServiceStatus {
                service: service.to_string(),
            });
        }

        match s {
            "back" => Ok(MenuAction::BackToServices),
            "admin:stats" => Ok(MenuAction::AdminStats),
            "admin:last" => Ok(MenuAction::AdminLastMessage),
            "admin:broadcast" => Ok(MenuAction::AdminBroadcast),
            "admin:refstats" => Ok(MenuAction::AdminRefStats),
            "admin:back" => Ok(MenuAction::BackToAdmin),
            "broadcast:confirm" => Ok(MenuAction::ConfirmBroadcast),
            "broadcast:cancel" => Ok(MenuAction::CancelBroadcast),
            other => Err(BotError::UnknownMenuAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_parses_back() {
        let actions = [
            MenuAction::ServiceStatus {
                service: "telegram".to_string(),
            },
            MenuAction::BackToServices,
            MenuAction::AdminStats,
            MenuAction::AdminLastMessage,
            MenuAction::AdminBroadcast,
            MenuAction::AdminRefStats,
            MenuAction::BackToAdmin,
            MenuAction::ConfirmBroadcast,
            MenuAction::CancelBroadcast,
        ];
        for action in actions {
            assert_eq!(action.callback_data().parse::<MenuAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        assert!(matches!(
            "svc:".parse::<MenuAction>(),
            Err(BotError::UnknownMenuAction(_))
        ));
        assert!("app_telegram".parse::<MenuAction>().is_err());
    }

    #[test]
    fn test_callback_data_fits_api_limit() {
        let action = MenuAction::ServiceStatus {
            service: "vkontakte".to_string(),
        };
        assert!(action.callback_data().len() <= 64);
        assert!(!action.is_admin_only());
        assert!(MenuAction::ConfirmBroadcast.is_admin_only());
    }
}
