//! Lifecycle coordination
//!
//! The coordinator is the single owner of every resource the launcher
//! acquires: the backend process, the static server, and (through the
//! window shell) the UI window. Startup is a strictly ordered pipeline -
//! each stage needs the previous stage's output - and every failure routes
//! through the same cleanup path so nothing is orphaned, no matter where
//! the pipeline stopped.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use lq_core::config::LauncherConfig;
use lq_core::{LauncherError, ReadinessState, RunMode};

use crate::ports;
use crate::probe::ReadinessProbe;
use crate::resolver::BinaryResolver;
use crate::static_server::StaticServer;
use crate::supervisor::{self, BackendProcess};
use crate::window::WindowShell;

/// Where the coordinator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Created, not yet started
    Idle,
    /// Startup pipeline in progress
    Starting,
    /// Backend ready, window open
    Running,
    /// Teardown in progress
    ShuttingDown,
    /// Normal end of life
    Terminated,
    /// Startup failed or the backend died; cleanup has already run
    Failed,
}

/// Sequences startup, owns every acquired handle, and tears them down
pub struct LifecycleCoordinator<S: WindowShell> {
    config: LauncherConfig,
    mode: RunMode,
    resolver: BinaryResolver,
    /// Exported frontend bundle (packaged mode only)
    asset_root: PathBuf,
    shell: S,
    probe: ReadinessProbe,
    phase: LifecyclePhase,
    backend: Option<BackendProcess>,
    static_server: Option<StaticServer>,
    cancel: CancellationToken,
}

impl<S: WindowShell> LifecycleCoordinator<S> {
    /// Create an idle coordinator
    pub fn new(
        config: LauncherConfig,
        mode: RunMode,
        resolver: BinaryResolver,
        asset_root: PathBuf,
        shell: S,
    ) -> Self {
        let probe = ReadinessProbe::new(
            config.health_path.clone(),
            config.probe_timeout,
            config.probe_interval,
        );
        Self {
            config,
            mode,
            resolver,
            asset_root,
            shell,
            probe,
            phase: LifecyclePhase::Idle,
            backend: None,
            static_server: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Token that aborts a startup in progress.
    ///
    /// Cancelling it (e.g. from a window-close handler) stops the probe
    /// loop at the next opportunity; `start` still runs the cleanup path
    /// before returning `Cancelled`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The window shell this coordinator drives
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Run the startup pipeline and open the window.
    ///
    /// Returns the frontend origin the window was bound to. On any failure
    /// the partially acquired resources are released, the phase moves to
    /// `Failed` (or `Terminated` for a cancellation), and fatal conditions
    /// are surfaced through one blocking error dialog.
    pub async fn start(&mut self) -> Result<String, LauncherError> {
        self.phase = LifecyclePhase::Starting;
        tracing::info!("Starting Lacquer ({} mode)", self.mode);

        match self.run_pipeline().await {
            Ok(origin) => {
                self.phase = LifecyclePhase::Running;
                tracing::info!("Startup complete, UI bound to {}", origin);
                Ok(origin)
            }
            Err(e) => {
                tracing::warn!("Startup stopped: {}", e);
                self.cleanup().await;
                if e.is_fatal() {
                    self.phase = LifecyclePhase::Failed;
                    self.shell.show_error_dialog("Startup Error", &e.user_message());
                } else {
                    self.phase = LifecyclePhase::Terminated;
                }
                Err(e)
            }
        }
    }

    /// The ordered startup pipeline: frontend origin first (the backend
    /// needs it for its CORS scope), then backend port, binary, spawn,
    /// readiness, window.
    async fn run_pipeline(&mut self) -> Result<String, LauncherError> {
        let frontend_origin = match self.mode {
            RunMode::Development => {
                // The dev server is an external collaborator; nothing to start
                tracing::info!(
                    "Using external frontend dev server at {}",
                    self.config.dev_frontend_origin
                );
                self.config.dev_frontend_origin.clone()
            }
            RunMode::Packaged => {
                let binding = ports::allocate(self.config.frontend_port)?;
                let server = StaticServer::start(self.asset_root.clone(), &binding).await?;
                let origin = server.origin();
                self.static_server = Some(server);
                origin
            }
        };

        if self.cancel.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }

        let backend_binding = ports::allocate(self.config.backend_port)?;
        let location = self.resolver.resolve(self.mode)?;
        let mut backend = supervisor::spawn(&location, &backend_binding, &frontend_origin)?;

        // Probe readiness while watching the process: a backend that dies
        // during startup fails fast instead of burning the whole deadline
        let backend_origin = backend_binding.origin();
        let outcome = {
            let probe_fut = self.probe.wait_ready(&backend_origin, &self.cancel);
            tokio::pin!(probe_fut);
            tokio::select! {
                state = &mut probe_fut => Ok(state),
                status = backend.wait() => Err(status.and_then(|s| s.code())),
            }
        };
        self.backend = Some(backend);

        let state = match outcome {
            Ok(state) => state,
            Err(code) => return Err(LauncherError::BackendExited { code }),
        };

        match state {
            ReadinessState::Ready => {}
            ReadinessState::TimedOut => {
                return Err(LauncherError::ReadinessTimeout {
                    timeout: self.config.probe_timeout,
                })
            }
            ReadinessState::Pending => return Err(LauncherError::Cancelled),
        }

        self.shell
            .open_window(&frontend_origin)
            .map_err(|e| LauncherError::Window {
                message: e.to_string(),
            })?;

        Ok(frontend_origin)
    }

    /// Watch the running backend until shutdown is requested.
    ///
    /// Returns `Ok` when the cancel token fires (normal teardown follows
    /// via `shutdown`). An exit the launcher did not ask for is fatal for
    /// the session: resources are released, the failure is surfaced, and
    /// no restart is attempted.
    pub async fn supervise(&mut self) -> Result<(), LauncherError> {
        let cancel = self.cancel.clone();
        let exit_code = {
            let Some(backend) = self.backend.as_mut() else {
                return Ok(());
            };
            tokio::select! {
                _ = cancel.cancelled() => None,
                status = backend.wait() => Some(status.and_then(|s| s.code())),
            }
        };

        match exit_code {
            None => Ok(()),
            Some(code) => {
                let err = LauncherError::BackendExited { code };
                tracing::error!("{}", err);
                self.cleanup().await;
                self.phase = LifecyclePhase::Failed;
                self.shell
                    .show_error_dialog("Backend Error", &err.user_message());
                Err(err)
            }
        }
    }

    /// Tear everything down, in order: backend process, then static
    /// server.
    ///
    /// Idempotent and infallible - teardown errors are logged, never
    /// propagated, because shutdown must always complete.
    pub async fn shutdown(&mut self) {
        if matches!(
            self.phase,
            LifecyclePhase::ShuttingDown | LifecyclePhase::Terminated
        ) {
            return;
        }

        self.phase = LifecyclePhase::ShuttingDown;
        self.cancel.cancel();
        self.cleanup().await;
        self.phase = LifecyclePhase::Terminated;
        tracing::info!("Shutdown complete");
    }

    /// Release whatever was acquired so far
    async fn cleanup(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.stop().await;
        }
        if let Some(server) = self.static_server.take() {
            server.stop().await;
        }
    }
}
