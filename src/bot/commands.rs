//! Slash commands understood by the bot.

/// A parsed `/command [payload]` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Registration, optionally through a referral payload.
    Start { payload: Option<String> },
    Stats,
    Broadcast,
    Last,
    Ref,
    RefStats,
    Admins,
    Help,
    Me,
    Admin,
    Fail,
}

impl Command {
    /// Parses a message text into a command.
    ///
    /// A command addressed to another bot (`/cmd@other_bot`) and unknown commands yield `None`.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, payload) = match rest.split_once(char::is_whitespace) {
            Some((head, payload)) => (head, payload.trim()),
            None => (rest, ""),
        };
        let name = match head.split_once('@') {
            Some((name, mention)) if mention.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => head,
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start {
                payload: (!payload.is_empty()).then(|| payload.to_string()),
            },
            "stats" => Command::Stats,
            "broadcast" => Command::Broadcast,
            "last" => Command::Last,
            "ref" => Command::Ref,
            "refstats" => Command::RefStats,
            "admins" => Command::Admins,
            "command" | "help" => Command::Help,
            "me" => Command::Me,
            "admin" => Command::Admin,
            "fail" => Command::Fail,
            _ => return None,
        };
        Some(command)
    }

    /// Commands only administrators may run. Others get no reply at all.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Command::Stats | Command::Broadcast | Command::Admin)
    }
}

/// Referrer id carried by a `/start` payload. Anything that is not an id is ignored.
pub fn parse_referrer(payload: Option<&str>) -> Option<i64> {
    payload.and_then(|payload| payload.trim().parse::<i64>().ok())
}
