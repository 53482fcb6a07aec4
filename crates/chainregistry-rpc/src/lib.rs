//! chainregistry-rpc: the JSON-RPC side of the log source boundary.
//!
//! - [`RpcTransport`]: async trait for sending JSON-RPC requests
//! - [`HttpTransport`]: `reqwest`-backed HTTP transport
//! - [`RpcLogSource`]: [`LogSource`](chainregistry_core::LogSource) over
//!   `eth_blockNumber` and `eth_getLogs`

pub mod error;
pub mod http;
pub mod log_source;
pub mod request;
pub mod transport;

pub use error::TransportError;
pub use http::HttpTransport;
pub use log_source::{RawLog, RpcLogSource};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use transport::RpcTransport;
