pub mod chats;
pub mod messages;
pub mod orders;
pub mod providers;
pub mod quotes;
pub mod reviews;
pub mod users;
