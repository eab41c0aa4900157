pub mod applications;
pub mod auth;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod middleware;
pub mod notifications;
pub mod routes;
