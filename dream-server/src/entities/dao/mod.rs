pub mod chat;
pub mod dream;

pub use chat::{ChatMessage, ChatRole};
pub use dream::{Dream, NewDream, Symbol};
