//! User details picked up from past messages

use serde::{Deserialize, Serialize};

use super::entry::MemoryEntry;

const PREFERENCE_CUES: &[&str] = &["i like", "i prefer"];
const INTEREST_CUES: &[&str] = &["interested in", "working on"];

/// What the user has told the agent about themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub preferences: Vec<String>,
    pub interests: Vec<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.preferences.is_empty() && self.interests.is_empty()
    }

    /// One line per known detail, for the system prompt
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.name {
            lines.push(format!("- Name: {}", name));
        }
        if !self.preferences.is_empty() {
            lines.push(format!("- Likes: {}", self.preferences.join("; ")));
        }
        if !self.interests.is_empty() {
            lines.push(format!("- Interests: {}", self.interests.join("; ")));
        }
        lines.join("\n")
    }
}

/// Build a profile from the user side of the given exchanges
pub fn extract_user_profile(entries: &[MemoryEntry]) -> UserProfile {
    let mut profile = UserProfile::default();

    for entry in entries {
        let message = entry.user_message.to_lowercase();

        if let Some(name) = text_after(&message, &["my name is"])
            .and_then(|rest| rest.split_whitespace().next())
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| !word.is_empty())
        {
            profile.name = Some(capitalize(name));
        }

        if let Some(preference) = text_after(&message, PREFERENCE_CUES) {
            push_unique(&mut profile.preferences, preference);
        }

        if let Some(interest) = text_after(&message, INTEREST_CUES) {
            push_unique(&mut profile.interests, interest);
        }
    }

    profile
}

/// Text following the last occurrence of the first cue present in `message`
fn text_after<'a>(message: &'a str, cues: &[&str]) -> Option<&'a str> {
    let cue = cues.iter().find(|cue| message.contains(*cue))?;
    let (_, rest) = message.rsplit_once(cue)?;
    let rest = rest.trim().trim_end_matches(['.', '!', '?']);
    (!rest.is_empty()).then_some(rest)
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(user: &str) -> MemoryEntry {
        MemoryEntry::new(user, "noted", "s1", HashMap::new())
    }

    #[test]
    fn picks_up_name_preferences_and_interests() {
        let profile = extract_user_profile(&[
            entry("Hi, my name is alice."),
            entry("I like hiking in the alps!"),
            entry("I prefer short answers"),
            entry("I'm working on a rust crate"),
            entry("I like hiking in the alps"),
        ]);

        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert_eq!(profile.preferences, vec!["hiking in the alps", "short answers"]);
        assert_eq!(profile.interests, vec!["a rust crate"]);
        assert!(profile.summary().contains("- Name: Alice"));
    }

    #[test]
    fn plain_messages_give_empty_profile() {
        let profile = extract_user_profile(&[entry("what's the weather?")]);
        assert!(profile.is_empty());
        assert_eq!(profile.summary(), "");
    }
}
