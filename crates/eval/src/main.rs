//! Operator CLI for checking classification, similarity and live searches.
//!
//! Usage:
//!     eval classify "running shoes and sports bags"
//!     eval similarity NIKE NYKE
//!     eval search --brand ACME --description "running shoes" --countries IT,FR
//!     eval health

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use brandcheck_backend_euipo::{Credentials, EuipoBackend, EuipoConfig, RegistryBackend};
use brandcheck_classify::{FallbackClassifier, LexicalIndex, Taxonomy};
use brandcheck_features::{compute_phonetics, edit_distance, phonetic_match, similarity};
use brandcheck_generation::{GeminiClient, GeminiConfig};
use brandcheck_model::{CandidateMark, ImageData, SearchRequest, SearchResponse};
use brandcheck_pipeline::{GenerativeClassifier, Pipeline, PipelineConfig};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Inspect trademark clearance behaviour")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry OAuth client id
    #[arg(long, env = "EUIPO_CLIENT_ID", hide_env_values = true, global = true)]
    euipo_client_id: Option<String>,

    /// Registry OAuth client secret
    #[arg(long, env = "EUIPO_CLIENT_SECRET", hide_env_values = true, global = true)]
    euipo_client_secret: Option<String>,

    /// Generation API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a description with the offline lexical index
    Classify {
        /// Product or service description
        description: String,
    },

    /// Compare two mark texts
    Similarity { first: String, second: String },

    /// Run a full live search
    Search {
        /// Proposed brand name
        #[arg(short, long)]
        brand: Option<String>,

        /// Product or service description
        #[arg(short, long)]
        description: String,

        /// Target countries (comma-separated)
        #[arg(short, long)]
        countries: Option<String>,

        /// Logo file to search figuratively
        #[arg(short, long)]
        image: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that the registry accepts the credentials
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Classify { description } => run_classify(description)?,
        Commands::Similarity { first, second } => run_similarity(first, second),
        Commands::Search {
            brand,
            description,
            countries,
            image,
            format,
        } => {
            let mut request = SearchRequest {
                brand_name: brand.clone(),
                product_description: Some(description.clone()),
                ..Default::default()
            };
            request.selected_countries = countries
                .as_deref()
                .map(|s| s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
                .unwrap_or_default();
            if let Some(path) = image {
                request.image_data = Some(load_image(Path::new(path))?);
            }
            run_search(&cli, request, format).await?;
        }
        Commands::Health => run_health(&cli).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "brandcheck=debug" } else { "brandcheck=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn credentials(cli: &Cli) -> Result<Credentials> {
    match (&cli.euipo_client_id, &cli.euipo_client_secret) {
        (Some(id), Some(secret)) => Ok(Credentials::new(id.clone(), secret.clone())),
        _ => bail!("EUIPO_CLIENT_ID and EUIPO_CLIENT_SECRET must be set"),
    }
}

fn run_classify(description: &str) -> Result<()> {
    let taxonomy = Taxonomy::builtin()?;
    let index = LexicalIndex::build(&taxonomy);
    let codes = index.classify(description);

    println!("Description: {}", description);
    println!("---");
    if codes.is_empty() {
        println!("No class matched");
        return Ok(());
    }
    for info in taxonomy.annotate(&codes).classes {
        println!("Class {:>2}: {}", info.number, info.title);
    }
    Ok(())
}

fn run_similarity(first: &str, second: &str) {
    println!("{} vs {}", first, second);
    println!("---");
    println!("Similarity:    {}", similarity(first, second));
    println!("Edit distance: {}", edit_distance(&first.to_uppercase(), &second.to_uppercase()));

    let (a, b) = (compute_phonetics(first), compute_phonetics(second));
    println!("Soundex:       {:?} / {:?}", a.soundex, b.soundex);
    println!("Metaphone:     {:?} / {:?}", a.metaphone, b.metaphone);
    match phonetic_match(first, second) {
        Some((algorithm, code)) => println!("Phonetic match ({}): {}", algorithm, code),
        None => println!("No phonetic match"),
    }
}

fn load_image(path: &Path) -> Result<ImageData> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        other => bail!("unsupported image extension: {:?}", other),
    };
    debug!(path = %path.display(), bytes = bytes.len(), mime_type, "Loaded logo");

    Ok(ImageData {
        base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type: mime_type.to_string(),
    })
}

async fn run_search(cli: &Cli, request: SearchRequest, format: &str) -> Result<()> {
    let credentials = credentials(cli)?;
    let Some(api_key) = cli.gemini_api_key.clone() else {
        bail!("GEMINI_API_KEY must be set");
    };

    let taxonomy = Taxonomy::builtin()?;
    let gemini = GeminiClient::new(api_key, GeminiConfig::default())?;
    let classifier = FallbackClassifier::new(
        GenerativeClassifier::new(gemini.clone(), &taxonomy),
        LexicalIndex::build(&taxonomy),
    );
    let pipeline = Pipeline::new(
        classifier,
        EuipoBackend::new(EuipoConfig::default())?,
        gemini,
        taxonomy,
        credentials,
        PipelineConfig::default(),
    );

    let response = pipeline.run(request).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    println!(
        "Score: {} | Risk: {}",
        response.brand_score,
        response.risk_level.label()
    );
    let classes: Vec<u16> = response.identified_classes.iter().map(|c| c.number).collect();
    println!("Classes: {:?} ({})", classes, response.search_metadata.classifier);
    if !response.search_metadata.degraded.is_empty() {
        println!("Degraded: {:?}", response.search_metadata.degraded);
    }

    print_marks("Word marks", &response.verbal_marks);
    print_marks("Figurative marks", &response.figurative_marks);

    println!("\n--- Analysis ({})", response.search_metadata.analysis_model);
    println!("{}", response.synthetic_judgment);
    println!("\n---");
    println!("Total: {} results", response.search_metadata.total_results);
}

fn print_marks(heading: &str, marks: &[CandidateMark]) {
    println!("\n{} ({})", heading, marks.len());
    for (i, mark) in marks.iter().enumerate() {
        println!(
            "{}. {} (Application: {})",
            i + 1,
            mark.display_name(),
            mark.application_number
        );
        println!(
            "   Owner: {} | Status: {} | Classes: {:?} | Similarity: {}",
            mark.owner,
            mark.status.label(),
            mark.classes,
            mark.similarity
        );
        if let Some(comparison) = &mark.visual_comparison {
            println!(
                "   Visual: {} ({:?})",
                comparison.visual_similarity, comparison.confusion_risk
            );
        }
    }
}

async fn run_health(cli: &Cli) -> Result<()> {
    let credentials = credentials(cli)?;
    let backend = EuipoBackend::new(EuipoConfig::default())?;
    print!("Checking {} registry... ", backend.name());

    match backend.authenticate(&credentials).await {
        Ok(_) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
