use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(ChatRole::System),
            "user" | "you" => Some(ChatRole::User),
            "assistant" | "ai" | "bot" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// One message of a chat-completions conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Parse a `role: content` transcript. Lines without a known role prefix
/// continue the previous turn; leading unprefixed text is treated as the user's.
pub fn parse_transcript(text: &str) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = Vec::new();

    for line in text.lines() {
        let prefixed = line
            .split_once(':')
            .and_then(|(role, rest)| ChatRole::parse(role).map(|r| (r, rest.trim())));

        if let Some((role, content)) = prefixed {
            turns.push(ChatTurn {
                role,
                content: content.to_string(),
            });
        } else if let Some(last) = turns.last_mut() {
            if !last.content.is_empty() {
                last.content.push('\n');
            }
            last.content.push_str(line.trim_end());
        } else if !line.trim().is_empty() {
            turns.push(ChatTurn::user(line.trim_end()));
        }
    }

    for turn in &mut turns {
        let trimmed = turn.content.trim_end().to_string();
        turn.content = trimmed;
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_turns() {
        let turns = parse_transcript("user: we need exports\nassistant: which formats?\nuser: csv");
        assert_eq!(
            turns,
            vec![
                ChatTurn::user("we need exports"),
                ChatTurn::assistant("which formats?"),
                ChatTurn::user("csv"),
            ]
        );
    }

    #[test]
    fn continuation_lines_join_previous_turn() {
        let turns = parse_transcript("User: first line\nsecond line\n\nAssistant: ok");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "first line\nsecond line");
        assert_eq!(turns[1].role, ChatRole::Assistant);
    }

    #[test]
    fn unknown_prefix_is_content() {
        let turns = parse_transcript("note: remember the SLA");
        assert_eq!(turns, vec![ChatTurn::user("note: remember the SLA")]);
    }

    #[test]
    fn empty_transcript_has_no_turns() {
        assert!(parse_transcript("\n\n").is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatTurn::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
