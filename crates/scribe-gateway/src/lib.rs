// Remote operation gateway: the only way the client reaches the backend.

pub mod error;
pub mod gateway;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod ops;
pub mod remote;

pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpGateway;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBackend;
pub use ops::Operation;
pub use remote::Remote;
