//! Command server: lets a web view outside the native process reach the
//! command table over HTTP (`POST /api/invoke`) or WebSocket (`/ws`).

pub mod auth;
pub mod dispatch;
pub mod server;
pub mod websocket;

pub use dispatch::CommandDispatcher;
pub use server::{start_server, CommandServerHandle, ServerStatus};
