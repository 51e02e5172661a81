use std::future::Future;

use brandcheck_backend_euipo::RegistryBackend;
use brandcheck_classify::Classifier;
use brandcheck_generation::TextGenerator;
use brandcheck_model::{SearchRequest, SearchResponse};
use brandcheck_pipeline::{Pipeline, PipelineError};

/// What the HTTP layer needs from the pipeline.
pub trait SearchService: Send + Sync + 'static {
    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<SearchResponse, PipelineError>> + Send;
}

impl<C, R, G> SearchService for Pipeline<C, R, G>
where
    C: Classifier + 'static,
    R: RegistryBackend + 'static,
    G: TextGenerator + 'static,
{
    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<SearchResponse, PipelineError>> + Send {
        self.run(request)
    }
}
