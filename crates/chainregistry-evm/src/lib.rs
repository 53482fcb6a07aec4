//! chainregistry-evm: batched log scanner, concurrent sync engine and builder.

pub mod builder;
pub mod engine;
pub mod registry;
pub mod scanner;
pub mod sink;

pub use builder::RegistryBuilder;
pub use engine::{SyncEngine, SyncReport};
pub use registry::Registry;
pub use scanner::{BatchedScanner, ScanReport, ScanSink};
pub use sink::{IndexSink, IndexedEvent};
