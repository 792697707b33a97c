//! Hash anchoring on a shared key/value ledger
//!
//! Callers anchor content hashes at `(bucket, index)` coordinates under
//! their own sender token and anyone can list a sender's records. The
//! ledger itself is abstracted behind [`host::ChaincodeHost`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod host;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod store;

pub use config::Config;
pub use dispatch::{error_message, Dispatcher, ErrorEnvelope, Operation, Response};
pub use error::{IntegrityError, IntegrityResult};
pub use handler::HashHandler;
pub use host::{ChaincodeHost, Invocation, MemoryHost, SqliteHost, SqliteStateDb};
pub use identity::SenderToken;
pub use logging::{init_logging, LogLevel};
pub use store::HashRecord;
