//! End-to-end pipeline runs against in-memory collaborators.

use std::sync::{Arc, Mutex};

use brandcheck_backend_euipo::{AccessToken, BackendError, Credentials, RawSearchResponse, RegistryBackend};
use brandcheck_classify::{FallbackClassifier, LexicalIndex, Taxonomy};
use brandcheck_generation::{Generation, GenerationError, GenerationRequest, ModelTier, TextGenerator};
use brandcheck_model::{ConfusionRisk, ImageData, RiskTier, SearchRequest, SearchType};
use brandcheck_pipeline::{GenerativeClassifier, Pipeline, PipelineConfig, PipelineError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[derive(Default)]
struct Script {
    /// Reply to classification prompts; `None` fails the call
    classes: Option<&'static str>,
    narrative: &'static str,
    pro_exhausted: bool,
    flash_exhausted: bool,
    /// Reply to logo analysis; `None` fails the call
    image_analysis: Option<&'static str>,
    comparison: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

#[derive(Clone)]
struct ScriptedGenerator(Arc<Script>);

impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let script = &self.0;
        let model = match request.tier {
            ModelTier::Pro => "pro-model",
            ModelTier::Flash => "flash-model",
        };
        let reply = |text: Option<&'static str>, step: &str| {
            script.calls.lock().unwrap().push(format!("{}:{}", step, model));
            text.map(|t| Generation {
                text: t.to_string(),
                model: model.to_string(),
            })
            .ok_or_else(|| GenerationError::Unavailable(format!("{} down", step)))
        };

        if request.prompt.contains("Nice Classification") {
            return reply(script.classes, "classify");
        }
        match request.images.len() {
            1 => return reply(script.image_analysis, "image"),
            2 => return reply(script.comparison, "compare"),
            _ => {}
        }

        let exhausted = match request.tier {
            ModelTier::Pro => script.pro_exhausted,
            ModelTier::Flash => script.flash_exhausted,
        };
        if exhausted {
            script.calls.lock().unwrap().push(format!("narrative:{}:quota", model));
            return Err(GenerationError::QuotaExhausted);
        }
        reply(Some(script.narrative), "narrative")
    }
}

#[derive(Default)]
struct StubRegistry {
    word_records: Vec<Value>,
    figurative_records: Vec<Value>,
    reject_credentials: bool,
    /// Fail every figurative search
    fail_figurative: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl RegistryBackend for StubRegistry {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, BackendError> {
        self.calls.lock().unwrap().push("authenticate");
        if self.reject_credentials {
            return Err(BackendError::Authentication("invalid_client".into()));
        }
        Ok(AccessToken::new("token", credentials.client_id.clone()))
    }

    async fn search(&self, query: &str, _token: &AccessToken) -> Result<RawSearchResponse, BackendError> {
        let figurative = query.contains("markImage");
        self.calls
            .lock()
            .unwrap()
            .push(if figurative { "search_figurative" } else { "search_word" });
        if figurative && self.fail_figurative {
            return Err(BackendError::Search("503 Service Unavailable".into()));
        }
        let records = if figurative {
            &self.figurative_records
        } else {
            &self.word_records
        };
        Ok(RawSearchResponse {
            trademarks: records.clone(),
            total_elements: Some(records.len() as u64),
        })
    }

    async fn fetch_image(&self, _url: &str, _token: &AccessToken) -> Result<ImageData, BackendError> {
        self.calls.lock().unwrap().push("fetch_image");
        Ok(ImageData {
            base64: "aGVsbG8=".into(),
            mime_type: "image/png".into(),
        })
    }

    fn name(&self) -> &'static str {
        "euipo"
    }
}

type TestPipeline = Pipeline<
    FallbackClassifier<GenerativeClassifier<ScriptedGenerator>, LexicalIndex>,
    StubRegistry,
    ScriptedGenerator,
>;

fn pipeline(script: Script, registry: StubRegistry) -> (TestPipeline, Arc<Script>) {
    let taxonomy = Taxonomy::builtin().unwrap();
    let script = Arc::new(script);
    let generator = ScriptedGenerator(script.clone());
    let classifier = FallbackClassifier::new(
        GenerativeClassifier::new(generator.clone(), &taxonomy),
        LexicalIndex::build(&taxonomy),
    );
    let pipeline = Pipeline::new(
        classifier,
        registry,
        generator,
        taxonomy,
        Credentials::new("client", "secret"),
        PipelineConfig::default(),
    );
    (pipeline, script)
}

fn acme_record() -> Value {
    json!({
        "applicationNumber": "018000001",
        "wordMarkSpecification": {"verbalElement": "ACME"},
        "applicants": [{"name": "Acme Corp"}],
        "status": "REGISTERED",
        "niceClasses": [25],
        "applicationDate": "2019-03-01",
        "markFeature": "WORD"
    })
}

fn figurative_record(application_number: &str, feature: &str) -> Value {
    json!({
        "applicationNumber": application_number,
        "status": "REGISTERED",
        "niceClasses": [25],
        "markFeature": feature,
        "imageUrl": format!("https://registry.example/img/{}", application_number)
    })
}

fn combined_acme_record() -> Value {
    let mut record = figurative_record("018000001", "COMBINED");
    record["wordMarkSpecification"] = json!({"verbalElement": "ACME"});
    record["applicants"] = json!([{"name": "Acme Corp"}]);
    record
}

const STAR_ANALYSIS: &str =
    r#"{"description": "a five-pointed star", "viennaCodes": ["01.01"], "verbalElements": []}"#;
const HIGH_COMPARISON: &str =
    r#"{"visualSimilarity": 82, "confusionRisk": "HIGH", "reasoning": "same star"}"#;
const LOW_VERDICT: &str = r#"{"riskLevel": "LOW", "analysis": "Different overall impression."}"#;

fn logo() -> ImageData {
    ImageData {
        base64: "aGVsbG8=".into(),
        mime_type: "image/png".into(),
    }
}

#[tokio::test]
async fn test_scenario_b_exact_registered_match() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: "1. RISK ASSESSMENT\nRISK: HIGH\nAn identical mark is registered.",
            ..Default::default()
        },
        StubRegistry {
            word_records: vec![acme_record()],
            ..Default::default()
        },
    );

    let response = pipeline
        .run(SearchRequest::new("ACME", "sports shoes"))
        .await
        .unwrap();

    assert_eq!(response.verbal_marks.len(), 1);
    assert_eq!(response.verbal_marks[0].similarity, 100);
    assert_eq!(response.risk_level, RiskTier::High);
    // 90 - 5 (one active mark) - 10 (similarity > 70) - 25 (high)
    assert_eq!(response.brand_score, 50);
    assert_eq!(response.identified_classes[0].number, 25);
    assert_eq!(response.identified_classes[0].title, "Clothing");

    let metadata = &response.search_metadata;
    assert_eq!(metadata.total_results, 1);
    assert_eq!(metadata.database_source, "EUIPO");
    assert_eq!(metadata.analysis_model, "pro-model");
    assert_eq!(metadata.classifier, "generative");
    assert_eq!(metadata.search_type, SearchType::Verbal);
    assert_eq!(metadata.degraded, vec!["structured_verdict".to_string()]);
}

#[tokio::test]
async fn test_scenario_c_no_records_defaults_to_moderate() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: "The proposed mark appears distinctive.",
            ..Default::default()
        },
        StubRegistry::default(),
    );

    let response = pipeline
        .run(SearchRequest::new("ZORBLAX", "sports shoes"))
        .await
        .unwrap();

    assert!(response.verbal_marks.is_empty());
    assert!(response.figurative_marks.is_empty());
    assert_eq!(response.risk_level, RiskTier::Moderate);
    assert_eq!(response.brand_score, 80);
}

#[tokio::test]
async fn test_scenario_d_validation_makes_no_calls() {
    let (pipeline, script) = pipeline(Script::default(), StubRegistry::default());

    let request = SearchRequest {
        brand_name: Some("ACME".into()),
        ..Default::default()
    };
    let err = pipeline.run(request).await.unwrap_err();

    assert!(matches!(err, PipelineError::Validation(_)));
    assert_eq!(err.status_code(), 400);
    assert!(script.calls.lock().unwrap().is_empty());
    assert!(pipeline.registry().calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scenario_a_lexical_fallback_classifies_footwear() {
    let (pipeline, _) = pipeline(
        Script {
            classes: None,
            narrative: "RISCHIO: BASSO",
            ..Default::default()
        },
        StubRegistry::default(),
    );

    let response = pipeline
        .run(SearchRequest::new("ZORBLAX", "scarpe sportive"))
        .await
        .unwrap();

    let numbers: Vec<u16> = response.identified_classes.iter().map(|c| c.number).collect();
    assert!(numbers.contains(&25));
    assert_eq!(response.search_metadata.classifier, "lexical");
    assert_eq!(response.risk_level, RiskTier::Low);
    assert_eq!(response.brand_score, 95);
}

#[tokio::test]
async fn test_unclassifiable_description_fails_before_registry() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("none apply"),
            ..Default::default()
        },
        StubRegistry::default(),
    );

    let err = pipeline
        .run(SearchRequest::new("ACME", "xyzzy qwv"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ClassificationFailure));
    assert_eq!(err.status_code(), 422);
    assert!(pipeline.registry().calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_downgrades_narrative_once() {
    let (pipeline, script) = pipeline(
        Script {
            classes: Some("25"),
            narrative: r#"{"riskLevel": "MODERATE", "analysis": "Some risk."}"#,
            pro_exhausted: true,
            ..Default::default()
        },
        StubRegistry::default(),
    );

    let response = pipeline
        .run(SearchRequest::new("ACME", "shoes"))
        .await
        .unwrap();

    assert_eq!(response.search_metadata.analysis_model, "flash-model");
    assert_eq!(response.synthetic_judgment, "Some risk.");
    assert!(response.search_metadata.degraded.is_empty());
    let calls = script.calls.lock().unwrap();
    assert!(calls.contains(&"narrative:pro-model:quota".to_string()));
    assert!(calls.contains(&"narrative:flash-model".to_string()));
}

#[tokio::test]
async fn test_quota_on_both_tiers_is_429() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            pro_exhausted: true,
            flash_exhausted: true,
            ..Default::default()
        },
        StubRegistry::default(),
    );

    let err = pipeline
        .run(SearchRequest::new("ACME", "shoes"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 429);
}

#[tokio::test]
async fn test_rejected_credentials_is_503() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            ..Default::default()
        },
        StubRegistry {
            reject_credentials: true,
            ..Default::default()
        },
    );

    let err = pipeline
        .run(SearchRequest::new("ACME", "shoes"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Authentication(_)));
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_failed_image_analysis_degrades() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: "RISK: LOW",
            image_analysis: None,
            ..Default::default()
        },
        StubRegistry {
            word_records: vec![acme_record()],
            ..Default::default()
        },
    );

    let mut request = SearchRequest::new("ACME", "shoes");
    request.image_data = Some(logo());
    let response = pipeline.run(request).await.unwrap();

    assert_eq!(response.search_metadata.search_type, SearchType::Combined);
    assert_eq!(response.verbal_marks.len(), 1);
    assert!(response.figurative_marks.is_empty());
    assert!(response
        .search_metadata
        .degraded
        .contains(&"image_analysis".to_string()));
    assert!(!pipeline
        .registry()
        .calls
        .lock()
        .unwrap()
        .contains(&"search_figurative"));
}

#[tokio::test]
async fn test_figurative_search_with_visual_comparison() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: r#"{"riskLevel": "LOW", "analysis": "Different overall impression."}"#,
            image_analysis: Some(
                r#"{"description": "a five-pointed star", "viennaCodes": ["01.01"], "verbalElements": []}"#,
            ),
            comparison: Some(
                r#"{"visualSimilarity": 82, "confusionRisk": "HIGH", "reasoning": "same star"}"#,
            ),
            ..Default::default()
        },
        StubRegistry {
            figurative_records: vec![json!({
                "applicationNumber": "017000009",
                "status": "REGISTERED",
                "niceClasses": [25],
                "markFeature": "FIGURATIVE",
                "imageUrl": "https://registry.example/img/017000009"
            })],
            ..Default::default()
        },
    );

    let request = SearchRequest {
        product_description: Some("shoes".into()),
        image_data: Some(logo()),
        search_type: Some(SearchType::Figurative),
        ..Default::default()
    };
    let response = pipeline.run(request).await.unwrap();

    assert!(response.verbal_marks.is_empty());
    assert_eq!(response.figurative_marks.len(), 1);
    let mark = &response.figurative_marks[0];
    assert_eq!(mark.similarity, 0);
    let comparison = mark.visual_comparison.as_ref().unwrap();
    assert_eq!(comparison.visual_similarity, 82);
    assert_eq!(comparison.confusion_risk, ConfusionRisk::High);

    // 90 - 5 (active) - 8 (confusing figurative mark) + 5 (low)
    assert_eq!(response.brand_score, 82);
    assert!(response.search_metadata.degraded.is_empty());

    let calls = pipeline.registry().calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec!["authenticate", "search_figurative", "fetch_image"]
    );
}

#[tokio::test]
async fn test_mark_found_by_both_searches_keeps_visual_evidence() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: LOW_VERDICT,
            image_analysis: Some(STAR_ANALYSIS),
            comparison: Some(HIGH_COMPARISON),
            ..Default::default()
        },
        StubRegistry {
            word_records: vec![combined_acme_record()],
            figurative_records: vec![combined_acme_record()],
            ..Default::default()
        },
    );

    let mut request = SearchRequest::new("ACME", "shoes");
    request.image_data = Some(logo());
    let response = pipeline.run(request).await.unwrap();

    assert_eq!(response.search_metadata.search_type, SearchType::Combined);
    assert_eq!(response.verbal_marks.len(), 1);
    assert_eq!(response.figurative_marks.len(), 1);
    assert!(response.verbal_marks[0].visual_comparison.is_none());
    assert_eq!(
        response.figurative_marks[0]
            .visual_comparison
            .as_ref()
            .map(|v| v.confusion_risk),
        Some(ConfusionRisk::High)
    );

    // 90 - 5 (one active mark) - 10 (similarity > 70) - 8 (confusing figurative) + 5 (low)
    assert_eq!(response.brand_score, 72);
}

#[tokio::test]
async fn test_visual_comparison_limited_to_top_three() {
    let (pipeline, script) = pipeline(
        Script {
            classes: Some("25"),
            narrative: LOW_VERDICT,
            image_analysis: Some(STAR_ANALYSIS),
            comparison: Some(HIGH_COMPARISON),
            ..Default::default()
        },
        StubRegistry {
            figurative_records: (1..=4)
                .map(|i| figurative_record(&format!("01700000{}", i), "FIGURATIVE"))
                .collect(),
            ..Default::default()
        },
    );

    let request = SearchRequest {
        product_description: Some("shoes".into()),
        image_data: Some(logo()),
        search_type: Some(SearchType::Figurative),
        ..Default::default()
    };
    let response = pipeline.run(request).await.unwrap();

    assert_eq!(response.figurative_marks.len(), 4);
    let compared = response
        .figurative_marks
        .iter()
        .filter(|m| m.visual_comparison.is_some())
        .count();
    assert_eq!(compared, 3);
    assert!(response.figurative_marks[3].visual_comparison.is_none());

    let fetches = pipeline
        .registry()
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| **c == "fetch_image")
        .count();
    assert_eq!(fetches, 3);
    let comparisons = script
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.starts_with("compare:"))
        .count();
    assert_eq!(comparisons, 3);

    // 90 - 20 (four active marks) - 24 (three confusing figurative) + 5 (low)
    assert_eq!(response.brand_score, 51);
}

#[tokio::test]
async fn test_failed_figurative_search_keeps_word_results() {
    let (pipeline, _) = pipeline(
        Script {
            classes: Some("25"),
            narrative: LOW_VERDICT,
            image_analysis: Some(STAR_ANALYSIS),
            comparison: Some(HIGH_COMPARISON),
            ..Default::default()
        },
        StubRegistry {
            word_records: vec![acme_record()],
            figurative_records: vec![figurative_record("017000009", "FIGURATIVE")],
            fail_figurative: true,
            ..Default::default()
        },
    );

    let mut request = SearchRequest::new("ACME", "shoes");
    request.image_data = Some(logo());
    let response = pipeline.run(request).await.unwrap();

    assert_eq!(response.verbal_marks.len(), 1);
    assert!(response.figurative_marks.is_empty());
    assert_eq!(response.search_metadata.total_results, 1);

    let calls = pipeline.registry().calls.lock().unwrap();
    assert_eq!(*calls, vec!["authenticate", "search_word", "search_figurative"]);
}
