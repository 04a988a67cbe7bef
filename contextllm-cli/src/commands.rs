//! Slash commands of the interactive chat

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain text to submit
    Prompt(String),
    New,
    List,
    /// 1-based position in the session list
    Switch(usize),
    Delete(usize),
    Llm,
    Help,
    Quit,
    Unknown(String),
    /// Nothing typed
    Empty,
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Prompt(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let index = parts.next().and_then(|n| n.parse::<usize>().ok());
        match (name.as_str(), index) {
            ("new", _) => Self::New,
            ("list" | "ls", _) => Self::List,
            ("switch", Some(n)) if n > 0 => Self::Switch(n),
            ("delete", Some(n)) if n > 0 => Self::Delete(n),
            ("llm", _) => Self::Llm,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
/new          start a new chat
/list         list chats (newest first)
/switch <n>   switch to chat n from /list
/delete <n>   delete chat n (not supported yet)
/llm          show the model of the latest reply
/quit         leave";
