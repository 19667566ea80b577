//! File operations for a host application shell: pick a document through the
//! host's picker, and copy bytes from one resource to another.
//!
//! The host provides the platform pieces through [`ResourceAccessor`],
//! [`AccessGrantor`] and [`Picker`], builds a [`TransferService`] and exposes
//! it on its method channel with [`file_operations_router`].

pub mod accessor;
pub mod config;
pub mod copy;
pub mod errors;
pub mod id;
pub mod pick;
pub mod router;
pub mod service;

pub use accessor::{
    AccessFlags, AccessGrantor, FsAccessor, MemoryAccessor, ResourceAccessor,
};
pub use config::TransferConfig;
pub use copy::{copy_stream, CancelFlag, CopyReport};
pub use errors::{Result, StreamSide, TransferError, STATUS_SUCCESS};
pub use id::ResourceId;
pub use pick::{PickOutcome, PickRequest, Picker};
pub use router::{file_operations_router, PickResult, Response, Router, CHANNEL};
pub use service::{CopyHandle, TransferService};

/// Routes `log` output to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
