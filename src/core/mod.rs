pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod greeting;
pub mod message;
pub mod session;
pub mod transcript;
pub mod transport;
