//! Greetdesk: view-model glue and native command bridge for a desktop shell.
//!
//! The view side ([`views`], [`dom`]) reaches native code only through a
//! [`bridge::CommandBridge`]. The native side ([`http_server`], [`sidecar`])
//! serves commands in-process or over HTTP/WebSocket and supervises the local
//! API sidecar.

pub mod app;
pub mod bridge;
pub mod config;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod dom;
pub mod fetch;
pub mod format;
pub mod http_server;
pub mod platform;
pub mod sidecar;
pub mod views;

pub use app::Shell;
pub use bridge::{BridgeError, CommandBridge, CommandRequest, NativeCall};
pub use config::ShellConfig;
pub use format::format_file_size;

/// Handler for the `greet` command.
pub fn greet(name: &str) -> String {
    format!("Hello, {name}! You've been greeted from Rust!")
}

/// Install the env_logger backend. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        log::debug!("Logger already initialized: {e}");
    }
}
