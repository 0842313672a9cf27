//! Feed access contract: the item trait, page bounds, and the accessor trait
//! implemented by whatever transport serves listing pages.

pub mod accessor;
pub mod item;

pub use accessor::{FeedAccessor, PageQuery};
pub use item::{FeedItem, Post};
