use async_trait::async_trait;

use crate::errors::ScreenPilotResult;
use crate::types::{AnalysisResult, ElementLocation, ImageInput};

/// Capability seam to the hosted vision-language model. The agent core is
/// written against this trait so it can run on a deterministic fake with no
/// network dependency.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Describes the screen and lists interactive elements.
    async fn describe(&self, image: &ImageInput) -> ScreenPilotResult<AnalysisResult>;

    /// Resolves a natural-language element description to coordinates.
    /// `Ok(None)` means the model looked and found nothing.
    async fn locate(
        &self,
        description: &str,
        image: &ImageInput,
    ) -> ScreenPilotResult<Option<ElementLocation>>;
}
