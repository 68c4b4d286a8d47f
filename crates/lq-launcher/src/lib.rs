//! lq-launcher: Service orchestration for the Lacquer desktop app
//!
//! One control process boots and supervises two local collaborators - the
//! Python analysis backend and, in packaged builds, a loopback static-asset
//! server - then hands the resulting origin to the UI window. Startup is a
//! strictly ordered pipeline; teardown is deterministic and runs even when
//! startup is cancelled halfway through.

pub mod coordinator;
pub mod ports;
pub mod probe;
pub mod resolver;
pub mod static_server;
pub mod supervisor;
pub mod window;

pub use coordinator::{LifecycleCoordinator, LifecyclePhase};
pub use resolver::{BinaryResolver, ExecutableLocation};
pub use window::WindowShell;
