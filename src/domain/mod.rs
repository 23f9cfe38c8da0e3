pub mod feed;
pub mod follow;
pub mod item;
pub mod post;
pub mod user;

pub use feed::Feed;
pub use follow::FeedFollow;
pub use item::{FetchedFeed, RawItem};
pub use post::{Post, PostWithFeed};
pub use user::User;
