use async_trait::async_trait;

use crate::error::Result;
use crate::model::RawCandidate;

/// Free-text search against the target library.
///
/// Implementations must tolerate concurrent calls. Transport failures are
/// reported as `Err`; the matcher decides how to degrade.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>>;
}

#[async_trait]
impl<P: SearchProvider + ?Sized> SearchProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>> {
        (**self).search(query, limit).await
    }
}
