// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(
    all(feature = "desktop", not(debug_assertions)),
    windows_subsystem = "windows"
)]

#[cfg(feature = "desktop")]
fn main() {
    greetdesk_lib::desktop::run()
}

#[cfg(not(feature = "desktop"))]
fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(headless::run())
}

/// Command server + API sidecar without a window. Web views connect to the
/// printed URL with the printed token.
#[cfg(not(feature = "desktop"))]
mod headless {
    use anyhow::Context;
    use greetdesk_lib::http_server::{auth, start_server, CommandDispatcher};
    use greetdesk_lib::ShellConfig;

    pub async fn run() -> anyhow::Result<()> {
        let config = ShellConfig::load().context("failed to load configuration")?;
        greetdesk_lib::init_logging(&config.log_level);

        let dispatcher = CommandDispatcher::from_config(&config);
        if config.sidecar_program.is_some() {
            match dispatcher.start_sidecar().await {
                Ok(msg) => log::info!("{msg}"),
                Err(e) => log::error!("Failed to start API server: {e}"),
            }
        }

        let server = start_server(
            dispatcher.clone(),
            config.server_port,
            auth::generate_token(),
            config.localhost_only,
        )
        .await
        .map_err(anyhow::Error::msg)?;
        log::info!("Command server ready at {} (token: {})", server.url, server.token);

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;

        server.shutdown().await;
        if config.sidecar_program.is_some() {
            match dispatcher.stop_sidecar().await {
                Ok(msg) => log::info!("{msg}"),
                Err(e) => log::error!("Error stopping API server: {e}"),
            }
        }
        Ok(())
    }
}
