pub mod chat_log;
pub mod config;
pub mod credentials;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod secret;
pub mod session;
pub mod tutor;
