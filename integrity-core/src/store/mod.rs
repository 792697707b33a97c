/*
    Store subsystem - keyspace and record access
*/

pub mod adapter;
pub mod composite_key;
pub mod errors;
pub mod record;

pub use adapter::{RecordScan, RecordStore};
pub use composite_key::{CompositeKeyCodec, RECORD_ARITY, RECORD_NAMESPACE};
pub use errors::*;
pub use record::HashRecord;
