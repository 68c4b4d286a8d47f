//! Window shell abstraction
//!
//! The coordinator owns the UI window's lifecycle but never touches a GUI
//! toolkit directly; the desktop shell implements this trait with its
//! windowing stack, and tests use a recording stub.

/// Operations the coordinator needs from the windowing layer
pub trait WindowShell: Send + Sync + 'static {
    /// Create the main window and navigate it to `url`.
    ///
    /// Called at most once per run, after the backend is ready.
    fn open_window(&self, url: &str) -> anyhow::Result<()>;

    /// Restore and focus the main window; no-op if no window exists yet.
    ///
    /// Invoked when a second launch attempt is redirected to this instance.
    fn focus_window(&self);

    /// Show a blocking error dialog.
    ///
    /// Used exactly once, for the first fatal startup condition.
    fn show_error_dialog(&self, title: &str, message: &str);
}
