//! Engine subprocess execution and event delivery.

pub mod events;
pub mod process;

pub use events::{derive_status, ExportEvent, ExportOutcome};
pub use process::{CancelHandle, ExportError, ExportRunner};
