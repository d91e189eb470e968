pub mod chat;
pub mod concerns;
pub mod posts;
