//! Lacquer Desktop - Tauri shell around the launcher.
//!
//! The shell owns nothing but the webview: single-instance arbitration,
//! process supervision, and the static server all live in the launcher
//! crates, driven from one init task spawned once Tauri's runtime is up.

mod bridge;
mod shell;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tauri::{AppHandle, Manager};
use tracing_subscriber::EnvFilter;

use lq_core::config::{self, LauncherConfig};
use lq_core::instance::{InstanceLock, SingleInstanceGuard};
use lq_core::RunMode;
use lq_launcher::{BinaryResolver, LifecycleCoordinator};

use shell::TauriShell;
pub use state::AppState;

/// Initialize and run the Tauri application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config_path = config::default_config_path();
    let config = match config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring config at {}: {}", config_path.display(), e);
            LauncherConfig::default()
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            app.manage(AppState::new());

            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                initialize(app_handle, config).await;
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            bridge::choose_folder,
            bridge::choose_files,
            bridge::choose_save_destination,
        ])
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                // Keep the window alive until teardown finishes, then exit
                api.prevent_close();
                let _ = window.hide();
                request_shutdown(window.app_handle());
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

/// One-shot init task: instance arbitration, then the startup pipeline.
async fn initialize(app: AppHandle, config: LauncherConfig) {
    let focus_handle = app.clone();
    let lock = SingleInstanceGuard::acquire(lq_core::instance::default_lock_path(), move || {
        shell::focus_main(&focus_handle)
    })
    .await;

    let _guard = match lock {
        InstanceLock::Acquired(guard) => guard,
        InstanceLock::Yielded => {
            tracing::info!("Another instance is already running, exiting");
            app.exit(0);
            return;
        }
    };

    let mode = RunMode::detect();
    let (resolver, asset_root) = match locate_roots(&app) {
        Ok(roots) => roots,
        Err(e) => {
            tracing::error!("Cannot locate application directories: {:#}", e);
            app.exit(1);
            return;
        }
    };

    let shell = TauriShell::new(app.clone(), config.window_width, config.window_height);
    let mut coordinator = LifecycleCoordinator::new(config, mode, resolver, asset_root, shell);

    let state = app.state::<AppState>();
    state.set_cancel(coordinator.cancel_token());
    let coordinator_slot = Arc::clone(&state.coordinator);

    let started = coordinator.start().await;
    *coordinator_slot.lock().await = Some(coordinator);

    match started {
        Ok(_) => {
            let mut slot = coordinator_slot.lock().await;
            if let Some(coordinator) = slot.as_mut() {
                if coordinator.supervise().await.is_err() {
                    drop(slot);
                    app.exit(1);
                }
            }
        }
        Err(e) if e.is_fatal() => app.exit(1),
        Err(_) => app.exit(0),
    }
}

/// Cancel any startup in flight, tear down, and exit
fn request_shutdown(app: &AppHandle) {
    let (cancel, coordinator_slot) = {
        let state = app.state::<AppState>();
        (state.cancel_token(), Arc::clone(&state.coordinator))
    };
    if let Some(cancel) = cancel {
        cancel.cancel();
    }

    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        if let Some(coordinator) = coordinator_slot.lock().await.as_mut() {
            coordinator.shutdown().await;
        }
        app.exit(0);
    });
}

/// Compute the backend roots and the exported frontend bundle location.
///
/// Development runs use the repository checkout next to this app; packaged
/// runs use the directories bundled under the Tauri resource dir.
fn locate_roots(app: &AppHandle) -> anyhow::Result<(BinaryResolver, PathBuf)> {
    let dev_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../..")
        .join("backend");
    let resources = app
        .path()
        .resource_dir()
        .context("resource directory unavailable")?;

    let resolver = BinaryResolver::new(dev_root, resources.join("backend"));
    Ok((resolver, resources.join("dist")))
}
