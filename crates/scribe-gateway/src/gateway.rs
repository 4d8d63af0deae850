use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::ops::Operation;

/// The call boundary to the backend.
///
/// An implementation receives the operation name and its argument record as
/// JSON and returns the reply as JSON. Calls may take arbitrarily long; no
/// timeout is applied at this layer.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn invoke(&self, operation: Operation, args: Value) -> Result<Value>;
}
