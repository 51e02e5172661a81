use std::collections::HashMap;

use brandcheck_backend_euipo::{parse_response, AccessToken, Credentials, RegistryBackend};
use brandcheck_classify::{sanitize_codes, Classifier, Taxonomy};
use brandcheck_explain::{
    image_analysis_prompt, image_analysis_schema, legal_analysis_prompt, parse_image_analysis,
    parse_verdict, parse_visual_comparison, verdict_schema, visual_comparison_prompt,
    visual_comparison_schema, ImageAnalysis, LegalAnalysisInput, NarrativeVerdict,
};
use brandcheck_generation::{
    CapabilityLadder, Generation, GenerationRequest, InlineImage, ModelTier, TextGenerator,
};
use brandcheck_model::{
    CandidateMark, ClassInfo, ImageData, SearchMetadata, SearchRequest, SearchResponse,
    VisualComparison,
};
use brandcheck_query::{build_figurative_query, build_word_query};
use tracing::{debug, info, warn};

use crate::validate::{validate, ValidatedRequest};
use crate::{PipelineConfig, PipelineError, PipelineRun, PipelineStage};

/// Classify, query the registry, score, and aggregate one request.
pub struct Pipeline<C, R, G> {
    classifier: C,
    registry: R,
    generator: G,
    taxonomy: Taxonomy,
    credentials: Credentials,
    ladder: CapabilityLadder,
    config: PipelineConfig,
}

impl<C, R, G> Pipeline<C, R, G>
where
    C: Classifier,
    R: RegistryBackend,
    G: TextGenerator,
{
    pub fn new(
        classifier: C,
        registry: R,
        generator: G,
        taxonomy: Taxonomy,
        credentials: Credentials,
        config: PipelineConfig,
    ) -> Self {
        Self {
            classifier,
            registry,
            generator,
            taxonomy,
            credentials,
            ladder: CapabilityLadder::default(),
            config,
        }
    }

    pub fn with_ladder(mut self, ladder: CapabilityLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Run a search request end to end.
    pub async fn run(&self, request: SearchRequest) -> Result<SearchResponse, PipelineError> {
        let mut run = PipelineRun::new();
        let result = self.execute(request, &mut run).await;
        if let Err(e) = &result {
            run.fail();
            warn!(error = %e, status = e.status_code(), "Search failed");
        }
        result
    }

    async fn execute(
        &self,
        request: SearchRequest,
        run: &mut PipelineRun,
    ) -> Result<SearchResponse, PipelineError> {
        let request = validate(request, &self.config)?;

        // Classification
        let classified = self.classifier.classify(&request.description).await?;
        let codes = sanitize_codes(classified.codes);
        if codes.is_empty() {
            return Err(PipelineError::ClassificationFailure);
        }
        let classes = self.taxonomy.annotate(&codes).classes;
        info!(classes = ?codes, strategy = classified.strategy, "Classified description");
        run.advance(PipelineStage::Classified);

        // Registry queries
        let token = self.registry.authenticate(&self.credentials).await?;

        let verbal_marks = match (&request.brand_name, request.search_type.runs_word_search()) {
            (Some(brand_name), true) => {
                let query = build_word_query(brand_name, &codes)?;
                let raw = self.registry.search(&query, &token).await?;
                parse_response(&raw, Some(brand_name.as_str()))
            }
            _ => Vec::new(),
        };

        let image = request
            .image
            .as_ref()
            .filter(|_| request.search_type.runs_image_search());

        let mut analysis = None;
        let mut figurative_marks = Vec::new();
        if let Some(image) = image {
            analysis = self.analyse_image(image, run).await;
            if let Some(analysis) = &analysis {
                figurative_marks = self.search_figurative(&request, analysis, &codes, &token, run).await;
            }
        }
        run.advance(PipelineStage::Queried);
        debug!(
            verbal = verbal_marks.len(),
            figurative = figurative_marks.len(),
            "Registry candidates"
        );

        // Visual scoring
        if let Some(image) = image {
            self.compare_visually(image, &mut figurative_marks, &token, run).await;
        }
        run.advance(PipelineStage::Scored);

        // Narrative and aggregation
        let (verdict, generation) = self
            .narrative(&request, &classes, &verbal_marks, &figurative_marks, analysis.as_ref(), run)
            .await?;

        let candidates = dedupe_candidates(&verbal_marks, &figurative_marks);
        let assessment = brandcheck_risk::assess(
            &candidates,
            verdict.tier,
            image.is_some(),
            &self.config.risk,
        );
        run.advance(PipelineStage::Aggregated);
        info!(score = assessment.score, tier = ?assessment.tier, count = candidates.len(), "Assessed");

        let total_results = verbal_marks.len() + figurative_marks.len();
        let response = SearchResponse {
            brand_score: assessment.score,
            risk_level: assessment.tier,
            identified_classes: classes,
            verbal_marks,
            figurative_marks,
            synthetic_judgment: verdict.analysis,
            search_metadata: SearchMetadata {
                search_date: chrono::Utc::now().to_rfc3339(),
                total_results,
                database_source: self.registry.name().to_uppercase(),
                analysis_model: generation.model,
                search_type: request.search_type,
                classifier: classified.strategy.to_string(),
                degraded: run.degraded().to_vec(),
            },
        };
        run.advance(PipelineStage::Completed);
        Ok(response)
    }

    async fn analyse_image(&self, image: &ImageData, run: &mut PipelineRun) -> Option<ImageAnalysis> {
        let mut request =
            GenerationRequest::new(image_analysis_prompt(), ModelTier::Flash).with_image(inline(image));
        if self.config.structured_output {
            request = request.with_schema(image_analysis_schema());
        }

        let analysis = match self.generator.generate(&request).await {
            Ok(generation) => parse_image_analysis(&generation.text),
            Err(e) => {
                warn!(error = %e, "Image analysis failed, continuing without it");
                None
            }
        };
        if analysis.is_none() {
            run.degrade("image_analysis");
        }
        analysis
    }

    async fn search_figurative(
        &self,
        request: &ValidatedRequest,
        analysis: &ImageAnalysis,
        codes: &[u16],
        token: &AccessToken,
        run: &mut PipelineRun,
    ) -> Vec<CandidateMark> {
        let query = match build_figurative_query(&analysis.visual_codes, codes) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "No usable figurative query, skipping figurative search");
                run.degrade("figurative_search");
                return Vec::new();
            }
        };

        let raw = self.registry.search_figurative(&query, token).await;
        // an empty set may be a degraded search or a genuine miss; the backend logs the former
        let name = request
            .brand_name
            .as_deref()
            .or_else(|| analysis.verbal_elements.first().map(String::as_str));
        parse_response(&raw, name)
    }

    async fn compare_visually(
        &self,
        image: &ImageData,
        marks: &mut [CandidateMark],
        token: &AccessToken,
        run: &mut PipelineRun,
    ) {
        let limit = self.config.visual_comparison_limit;
        for mark in marks.iter_mut().filter(|m| m.image_url.is_some()).take(limit) {
            match self.compare_one(image, mark, token).await {
                Some(comparison) => mark.visual_comparison = Some(comparison),
                None => {
                    warn!(application_number = %mark.application_number, "Visual comparison skipped");
                    run.degrade("visual_comparison");
                }
            }
        }
    }

    async fn compare_one(
        &self,
        image: &ImageData,
        mark: &CandidateMark,
        token: &AccessToken,
    ) -> Option<VisualComparison> {
        let url = mark.image_url.as_deref()?;
        let prior = match self.registry.fetch_image(url, token).await {
            Ok(prior) => prior,
            Err(e) => {
                warn!(url, error = %e, "Mark image download failed");
                return None;
            }
        };

        let mut request = GenerationRequest::new(visual_comparison_prompt(mark), ModelTier::Flash)
            .with_image(inline(image))
            .with_image(inline(&prior));
        if self.config.structured_output {
            request = request.with_schema(visual_comparison_schema());
        }

        match self.generator.generate(&request).await {
            Ok(generation) => parse_visual_comparison(&generation.text),
            Err(e) => {
                warn!(error = %e, "Visual comparison failed");
                None
            }
        }
    }

    async fn narrative(
        &self,
        request: &ValidatedRequest,
        classes: &[ClassInfo],
        verbal_marks: &[CandidateMark],
        figurative_marks: &[CandidateMark],
        analysis: Option<&ImageAnalysis>,
        run: &mut PipelineRun,
    ) -> Result<(NarrativeVerdict, Generation), PipelineError> {
        let prompt = legal_analysis_prompt(&LegalAnalysisInput {
            brand_name: request.brand_name.as_deref().unwrap_or("N/D"),
            description: &request.description,
            classes,
            countries: &request.countries,
            verbal_marks,
            figurative_marks,
            logo_description: analysis.map(|a| a.description.as_str()),
        });

        let mut generation_request = GenerationRequest::new(prompt, ModelTier::Pro);
        if self.config.structured_output {
            generation_request = generation_request.with_schema(verdict_schema());
        }

        let generation = self.ladder.generate(&self.generator, &generation_request).await?;
        let verdict = parse_verdict(&generation.text);
        if self.config.structured_output && !verdict.structured {
            warn!(model = %generation.model, tier = ?verdict.tier, "Structured verdict unavailable, used keyword scan");
            run.degrade("structured_verdict");
        }
        Ok((verdict, generation))
    }
}

fn inline(image: &ImageData) -> InlineImage {
    InlineImage {
        mime_type: image.mime_type.clone(),
        data: image.base64.clone(),
    }
}

/// Verbal then figurative marks, each application counted once.
///
/// A mark found by both searches keeps its verbal entry and takes the visual
/// comparison attached to its figurative entry.
fn dedupe_candidates(verbal: &[CandidateMark], figurative: &[CandidateMark]) -> Vec<CandidateMark> {
    let mut merged: Vec<CandidateMark> = Vec::with_capacity(verbal.len() + figurative.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for mark in verbal.iter().chain(figurative) {
        match positions.get(mark.application_number.as_str()) {
            Some(&i) => {
                let kept = &mut merged[i];
                if kept.visual_comparison.is_none() {
                    kept.visual_comparison = mark.visual_comparison.clone();
                }
            }
            None => {
                positions.insert(mark.application_number.as_str(), merged.len());
                merged.push(mark.clone());
            }
        }
    }
    merged
}
