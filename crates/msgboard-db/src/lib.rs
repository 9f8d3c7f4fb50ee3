pub mod message_store;
pub mod schema;
pub mod seed;

pub use message_store::{DEFAULT_LIST_LIMIT, ListQuery, MessageProvider, MessageStore};
