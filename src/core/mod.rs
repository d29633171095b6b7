pub mod attachments;
pub mod config;
pub mod message;
pub mod request;
pub mod session;
pub mod turn;
