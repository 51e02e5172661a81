use tracing::{debug, warn};

/// Progress of a single request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Received,
    Classified,
    Queried,
    Scored,
    Aggregated,
    Completed,
    Failed,
}

/// Forward-only record of a run: current stage and the steps that degraded.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    stage: PipelineStage,
    degraded: Vec<String>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
            degraded: Vec::new(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to `next`. Moves backwards, or out of a terminal stage, are ignored.
    pub fn advance(&mut self, next: PipelineStage) -> bool {
        if self.is_terminal() || next <= self.stage {
            warn!(from = ?self.stage, to = ?next, "Ignoring pipeline stage regression");
            return false;
        }
        debug!(from = ?self.stage, to = ?next, "Pipeline stage");
        self.stage = next;
        true
    }

    /// Enter the terminal `Failed` stage.
    pub fn fail(&mut self) {
        if self.stage != PipelineStage::Completed {
            debug!(from = ?self.stage, "Pipeline failed");
            self.stage = PipelineStage::Failed;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, PipelineStage::Completed | PipelineStage::Failed)
    }

    /// Record a step that failed and was skipped.
    pub fn degrade(&mut self, step: &str) {
        if !self.degraded.iter().any(|s| s == step) {
            self.degraded.push(step.to_string());
        }
    }

    pub fn degraded(&self) -> &[String] {
        &self.degraded
    }

    pub fn into_degraded(self) -> Vec<String> {
        self.degraded
    }
}
