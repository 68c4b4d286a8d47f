//! Tauri-backed window shell

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use lq_launcher::WindowShell;

/// Label of the single application window
pub const MAIN_WINDOW: &str = "main";

/// Drives the webview window and native dialogs for the coordinator
pub struct TauriShell {
    handle: AppHandle,
    width: f64,
    height: f64,
}

impl TauriShell {
    pub fn new(handle: AppHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width: f64::from(width),
            height: f64::from(height),
        }
    }
}

impl WindowShell for TauriShell {
    fn open_window(&self, url: &str) -> anyhow::Result<()> {
        let url: tauri::Url = url.parse()?;
        WebviewWindowBuilder::new(&self.handle, MAIN_WINDOW, WebviewUrl::External(url))
            .title("Paint Defect Analyzer")
            .inner_size(self.width, self.height)
            .build()?;
        Ok(())
    }

    fn focus_window(&self) {
        focus_main(&self.handle);
    }

    fn show_error_dialog(&self, title: &str, message: &str) {
        self.handle
            .dialog()
            .message(message)
            .title(title)
            .kind(MessageDialogKind::Error)
            .blocking_show();
    }
}

/// Restore and focus the main window if it exists
pub fn focus_main(handle: &AppHandle) {
    if let Some(window) = handle.get_webview_window(MAIN_WINDOW) {
        let _ = window.unminimize();
        let _ = window.set_focus();
    }
}
