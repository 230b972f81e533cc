//! Native window front (feature `desktop`). The web view calls the commands
//! below through Tauri's own IPC; the API sidecar lives as long as the window.

use serde_json::{Map, Value};
use tauri::{Manager, State, WindowEvent};

use crate::config::ShellConfig;
use crate::http_server::CommandDispatcher;

#[tauri::command]
fn greet(name: &str) -> String {
    crate::greet(name)
}

#[tauri::command]
async fn stop_server(dispatcher: State<'_, CommandDispatcher>) -> Result<String, String> {
    dispatcher.stop_sidecar().await
}

/// Generic entry for every other command in the table.
#[tauri::command]
async fn invoke_command(
    dispatcher: State<'_, CommandDispatcher>,
    command: String,
    args: Option<Map<String, Value>>,
) -> Result<Value, String> {
    dispatcher
        .dispatch_command(&command, Value::Object(args.unwrap_or_default()))
        .await
}

pub fn run() {
    let config = ShellConfig::load().unwrap_or_else(|e| {
        eprintln!("Using default configuration: {e}");
        ShellConfig::default()
    });
    let has_sidecar = config.sidecar_program.is_some();

    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(log::LevelFilter::Info)
                .build(),
        )
        .manage(CommandDispatcher::from_config(&config))
        .setup(move |app| {
            if has_sidecar {
                let dispatcher = app.state::<CommandDispatcher>().inner().clone();
                tauri::async_runtime::spawn(async move {
                    match dispatcher.start_sidecar().await {
                        Ok(msg) => log::info!("{msg}"),
                        Err(e) => log::error!("Failed to start API server: {e}"),
                    }
                });
            }
            Ok(())
        })
        .on_window_event(move |window, event| {
            if let WindowEvent::Destroyed = event {
                if !has_sidecar {
                    return;
                }
                let dispatcher = window.state::<CommandDispatcher>().inner().clone();
                tauri::async_runtime::block_on(async move {
                    match dispatcher.stop_sidecar().await {
                        Ok(msg) => log::info!("{msg}"),
                        Err(e) => log::error!("Error stopping API server: {e}"),
                    }
                });
            }
        })
        .invoke_handler(tauri::generate_handler![greet, stop_server, invoke_command])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
