//! chainregistry-core: foundation for the fid / fname identity index.
//!
//! # Architecture
//!
//! ```text
//! LogSource ──► BatchedScanner (chainregistry-evm) ──► IdentityIndex
//!                                                     ├── ids:   fid   ⇄ address
//!                                                     ├── names: fname ⇄ address
//!                                                     └── one SyncCursor per half
//!
//! RegistryQuery ◄── read-only lookups over IdentityIndex
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod events;
pub mod index;
pub mod query;
pub mod source;
pub mod types;

pub use config::{ContractConfig, RegistryConfig};
pub use cursor::SyncCursor;
pub use error::RegistryError;
pub use events::{RegisterEvent, TransferEvent};
pub use index::{IdentityIndex, IndexStats};
pub use query::RegistryQuery;
pub use source::{LogSource, MemoryLogSource};
pub use types::{format_address, normalize_address, LogEntry, Stream};
