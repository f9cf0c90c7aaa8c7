pub mod a001_portal_system;
pub mod a002_ai_chat;
