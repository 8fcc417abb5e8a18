use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A chat model that can be asked to continue a conversation.
///
/// Providers are treated as stateless: every request carries the full
/// history, and the caller never relies on anything the provider keeps
/// between requests.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Returns the identifier of the model requests are sent to.
    fn model_name(&self) -> &str;

    /// Sends a request to the model.
    ///
    /// The returned future must not borrow `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
