pub mod chat;
pub mod concern;
pub mod post;

pub use chat::{ChatMessage, NewChatMessage, Role};
pub use concern::{Concern, ConcernFilter, ConcernStatus, NewConcern, CONCERN_CATEGORIES};
pub use post::{CommunityPost, NewPost, NewPostComment, PostComment};
