//! Process lifecycle.
//!
//! ```text
//! startup.rs   load config → logging/metrics → watcher → bind → serve
//! signals.rs   SIGINT/SIGTERM → shutdown, SIGHUP → reload
//! shutdown.rs  broadcast stop → drain in-flight requests → abort after grace
//! ```
//!
//! Configuration errors abort startup before any listener is bound.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError, StartupOptions};
