//! Inbound message classification

use radar_common::link::is_artist_link;

/// Command prefixes accepted in front of a command word
const PREFIXES: [char; 3] = ['/', '.', '!'];

/// What an inbound chat message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Subscriptions,
    /// Argument as typed: link, URI or bare id
    Latest(String),
    /// Message starting with an artist link; the link token only
    Toggle(String),
}

/// Classify a text message; `None` for anything the bot ignores
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();

    if is_artist_link(text) {
        let link = text.split_whitespace().next()?;
        return Some(Command::Toggle(link.to_string()));
    }

    let body = text.strip_prefix(PREFIXES)?;
    let (word, rest) = match body.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (body, ""),
    };
    // "/start@SomeBot" in group chats
    let word = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

    match word.as_str() {
        "start" => Some(Command::Start),
        "subs" | "subscriptions" | "iscrizioni" => Some(Command::Subscriptions),
        "latest" if !rest.is_empty() => {
            let arg = rest.split_whitespace().next()?;
            Some(Command::Latest(arg.to_string()))
        }
        _ => None,
    }
}
