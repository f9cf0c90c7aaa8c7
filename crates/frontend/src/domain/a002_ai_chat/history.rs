//! Conversation kept by one chat view.

use chrono::{DateTime, Utc};
use contracts::domain::a002_ai_chat::aggregate::{ChatMessage, ChatRole};
use uuid::Uuid;

pub const SYSTEM_PROMPT: &str = "你是神农集团的智能农牧助手\"神农晓问\"，专门为用户提供农牧业生产、管理、技术等方面的专业咨询和系统操作指导。请用中文回答，语气要友好专业。";

pub const WELCOME_MESSAGE: &str = "您好！我是神农晓问，您的专属智能农牧助手！🐷✨\n\n我可以为您提供专业的农牧业咨询服务，包括生产管理、智慧养殖、数据分析等各个方面的问题。";

pub const QUICK_REPLIES: [&str; 4] = [
    "生产管理系统怎么使用？",
    "智慧养殖有哪些功能？",
    "如何进行数据分析？",
    "系统操作帮助",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// Ordered user/assistant exchange, trimmed to the newest `max_pairs` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
    max_pairs: usize,
}

impl ChatHistory {
    pub fn new(max_pairs: u32) -> Self {
        Self {
            entries: Vec::new(),
            max_pairs: max_pairs.max(1) as usize,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_max_pairs(&mut self, max_pairs: u32) {
        self.max_pairs = max_pairs.max(1) as usize;
        self.trim();
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) -> ChatEntry {
        let entry = ChatEntry {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };
        self.entries.push(entry.clone());
        self.trim();
        entry
    }

    fn trim(&mut self) {
        let limit = self.max_pairs * 2;
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
        }
    }

    /// Context sent along with the newest user message: the system prompt and
    /// every earlier entry. A trailing user entry is left out because the
    /// transport appends the message itself.
    pub fn context_for_api(&self) -> Vec<ChatMessage> {
        let earlier = match self.entries.last() {
            Some(last) if last.is_user() => &self.entries[..self.entries.len() - 1],
            _ => &self.entries[..],
        };
        std::iter::once(ChatMessage::system(SYSTEM_PROMPT))
            .chain(earlier.iter().map(|e| ChatMessage {
                role: e.role,
                content: e.content.clone(),
            }))
            .collect()
    }

    /// Removes the trailing user entry of a failed exchange so it can be resent.
    pub fn pop_last_user(&mut self) -> Option<ChatEntry> {
        match self.entries.last() {
            Some(last) if last.is_user() => self.entries.pop(),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_to_newest_pairs() {
        let mut history = ChatHistory::new(2);
        for i in 0..3 {
            history.push(ChatRole::User, format!("q{}", i));
            history.push(ChatRole::Assistant, format!("a{}", i));
        }
        let contents: Vec<&str> = history.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);

        history.set_max_pairs(1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].content, "q2");
    }

    #[test]
    fn test_context_excludes_pending_user_message() {
        let mut history = ChatHistory::new(10);
        history.push(ChatRole::User, "first");
        history.push(ChatRole::Assistant, "reply");
        history.push(ChatRole::User, "second");

        let context = history.context_for_api();
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].role, ChatRole::System);
        assert_eq!(context[0].content, SYSTEM_PROMPT);
        assert_eq!(context[2].content, "reply");
    }

    #[test]
    fn test_pop_last_user_only_pops_user() {
        let mut history = ChatHistory::new(10);
        history.push(ChatRole::User, "q");
        history.push(ChatRole::Assistant, "a");
        assert!(history.pop_last_user().is_none());

        history.push(ChatRole::User, "retry me");
        let popped = history.pop_last_user().unwrap();
        assert_eq!(popped.content, "retry me");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_zero_limit_keeps_one_pair() {
        let mut history = ChatHistory::new(0);
        history.push(ChatRole::User, "a");
        history.push(ChatRole::Assistant, "b");
        history.push(ChatRole::User, "c");
        assert_eq!(history.len(), 2);
        history.clear();
        assert!(history.is_empty());
    }
}
