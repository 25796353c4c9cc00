use teloxide::types::BotCommand;

pub const COMMANDS: &[Command] = &[START, HELP, STATS];

/// What a command does, once recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Help,
    Stats,
}

pub struct Command {
    pub callname: &'static str,
    pub description: &'static str,
    pub kind: CommandKind,
    hidden: bool,
}

impl Command {
    pub fn is_matching_callname(&self, command: &str) -> bool {
        self.callname.eq_ignore_ascii_case(command)
    }

    /// Find the command with this callname, like `/start`.
    pub fn find(callname: &str) -> Option<&'static Command> {
        COMMANDS
            .iter()
            .find(|command| command.is_matching_callname(callname))
    }

    /// Lines like `/start - Start the bot` for every command, for the help message.
    pub fn generate_help_lines() -> String {
        let mut response = String::new();
        for command in COMMANDS {
            response.push_str(command.callname);
            response.push_str(" - ");
            response.push_str(command.description);
            response.push('\n');
        }
        response.pop();
        response
    }

    pub fn generate_bot_commands() -> Vec<BotCommand> {
        COMMANDS
            .iter()
            .filter(|command| !command.hidden)
            .map(|command| BotCommand {
                // Cut off the /
                command: command.callname[1..].to_string(),
                description: command.description.to_string(),
            })
            .collect()
    }
}

pub const START: Command = Command {
    callname: "/start",
    description: "Start the bot",
    kind: CommandKind::Start,
    hidden: true,
};

pub const HELP: Command = Command {
    callname: "/help",
    description: "Show this help message",
    kind: CommandKind::Help,
    hidden: false,
};

pub const STATS: Command = Command {
    callname: "/stats",
    description: "Show statistics (admin only)",
    kind: CommandKind::Stats,
    hidden: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding() {
        assert_eq!(Command::find("/start").map(|c| c.kind), Some(CommandKind::Start));
        assert_eq!(Command::find("/HELP").map(|c| c.kind), Some(CommandKind::Help));
        assert_eq!(Command::find("/stats").map(|c| c.kind), Some(CommandKind::Stats));
        assert!(Command::find("/distort").is_none());
        assert!(Command::find("start").is_none());
    }

    #[test]
    fn bot_commands_skip_hidden() {
        let commands: Vec<String> = Command::generate_bot_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(commands, vec!["help", "stats"]);
    }

    #[test]
    fn help_lists_everything() {
        let help = Command::generate_help_lines();
        assert_eq!(help.lines().count(), COMMANDS.len());
        assert!(help.starts_with("/start - "));
        assert!(!help.ends_with('\n'));
    }
}
