mod comment;
mod post;
mod user;
mod vote;

pub use comment::Comment;
pub use post::Post;
pub use user::User;
pub use vote::{VoteKind, VoteRecord};
