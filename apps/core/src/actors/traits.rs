use crate::actors::messages::AppError;
use crate::models::AnalysisResult;
use async_trait::async_trait;

/// Defines the public interface of the remote detection service client.
///
/// This trait abstracts the transport so the background coordinator and the
/// popup can be driven by an in-process fake in tests.
#[async_trait]
pub trait DetectionClient: Send + Sync + 'static {
    /// Sends `text` to the detection service and decodes its verdict. A single attempt is made.
    async fn detect(&self, text: String) -> Result<AnalysisResult, AppError>;

    /// Lightweight liveness probe. Only success or failure is meaningful.
    async fn probe(&self) -> Result<(), AppError>;
}
