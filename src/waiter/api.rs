use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiError;

/// Remote API that describes one resource.
///
/// One call per poll. Implementations map their client errors into
/// [`ApiError`] so the waiter can classify them.
#[async_trait]
pub trait Describe: Send + Sync + 'static {
    /// Request parameters, reused for every poll.
    type Params: Send + Sync;
    /// Successful response handed to the condition.
    type Output: Send;

    /// Issues one describe call.
    async fn describe(&self, params: &Self::Params) -> Result<Self::Output, ApiError>;
}

#[async_trait]
impl<T: Describe + ?Sized> Describe for Arc<T> {
    type Params = T::Params;
    type Output = T::Output;

    async fn describe(&self, params: &Self::Params) -> Result<Self::Output, ApiError> {
        (**self).describe(params).await
    }
}
