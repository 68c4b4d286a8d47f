//! File dialog commands exposed to the frontend.
//!
//! The plugin's dialogs report their result through a callback; each
//! command bridges that into async with a oneshot channel. A dismissed
//! dialog resolves to an empty result rather than an error.

use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

/// Pick a single directory; `None` when the dialog is dismissed
#[tauri::command]
pub async fn choose_folder(app: AppHandle) -> Option<String> {
    let (tx, rx) = oneshot::channel();
    app.dialog().file().pick_folder(move |folder| {
        let _ = tx.send(folder);
    });
    rx.await.ok().flatten().map(|path| path.to_string())
}

/// Pick one or more image files to analyze
#[tauri::command]
pub async fn choose_files(app: AppHandle) -> Vec<String> {
    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "tiff"])
        .pick_files(move |files| {
            let _ = tx.send(files);
        });
    rx.await
        .ok()
        .flatten()
        .unwrap_or_default()
        .into_iter()
        .map(|path| path.to_string())
        .collect()
}

/// Pick a destination for an exported report
#[tauri::command]
pub async fn choose_save_destination(
    app: AppHandle,
    default_name: Option<String>,
) -> Option<String> {
    let (tx, rx) = oneshot::channel();
    let mut dialog = app.dialog().file();
    if let Some(name) = default_name {
        dialog = dialog.set_file_name(name);
    }
    dialog.save_file(move |path| {
        let _ = tx.send(path);
    });
    rx.await.ok().flatten().map(|path| path.to_string())
}
