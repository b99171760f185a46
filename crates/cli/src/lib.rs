use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::{ChunkPreset, ModelMode, RaglineConfig};
use handlers::{HandlerRequest, Handlers};
use ragline_chain::{
    templates, ChatSession, GenerationChain, PromptTemplate, PromptVariables, RagAnswer,
};
use ragline_vector_store::{
    ContentUnit, EmbeddingProvider, Ingestor, RetrievalResult, VectorStore,
};
use runtime::Runtime;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub mod config;
pub mod handlers;
mod http_api;
mod runtime;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented generation over hosted foundation models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $XDG_CONFIG_HOME/ragline/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Override the model backend in this process
    #[arg(long, global = true, value_enum)]
    model_mode: Option<ModelMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question from documents and facts
    Ask(AskArgs),

    /// Rank facts or images by similarity to a query
    Similar(SimilarArgs),

    /// Print the embedding of a text or an image as JSON
    Embed(EmbedArgs),

    /// Generate text from a prompt or a bundled template
    Generate(GenerateArgs),

    /// Interactive quality-assurance chat over stdin
    Chat(ChatArgs),

    /// Summarize a text in N points
    Summarize(SummarizeArgs),

    /// Generate an image and print a signed URL to it
    Image(ImageArgs),

    /// Serve the summarize and image handlers over HTTP
    ServeHttp(ServeArgs),
}

#[derive(Args)]
struct AskArgs {
    /// Question to answer
    #[arg(short, long)]
    question: String,

    /// Text documents to chunk and index
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Facts to index as-is
    #[arg(long = "fact")]
    facts: Vec<String>,

    /// Number of context units to retrieve
    #[arg(short, long)]
    k: Option<usize>,

    /// Chunking preset (default: [chunking] from config)
    #[arg(long, value_enum)]
    chunking: Option<ChunkPreset>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SimilarArgs {
    /// Text query compared against --fact
    #[arg(long, requires = "facts", conflicts_with_all = ["images", "query_image"])]
    query: Option<String>,

    /// Facts to rank
    #[arg(long = "fact")]
    facts: Vec<String>,

    /// Images to rank
    #[arg(long = "image", requires = "query_image")]
    images: Vec<PathBuf>,

    /// Image query compared against --image
    #[arg(long, requires = "images")]
    query_image: Option<PathBuf>,

    /// Limit the listing to the top K (default: all)
    #[arg(short, long)]
    k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EmbedArgs {
    #[arg(long, conflicts_with = "image", required_unless_present = "image")]
    text: Option<String>,

    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    /// Prompt text
    #[arg(short, long, conflicts_with = "template", required_unless_present = "template")]
    prompt: Option<String>,

    /// Bundled template name (rag-answer, product-description, summarize-points, qa-report)
    #[arg(short, long)]
    template: Option<String>,

    /// Template variable as name=value (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Override the text model
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    temperature: Option<f64>,

    /// Stop sequence (repeatable)
    #[arg(long = "stop")]
    stop_sequences: Vec<String>,
}

#[derive(Args)]
struct ChatArgs {
    /// Keep no history between messages
    #[arg(long)]
    stateless: bool,

    /// Send input as typed instead of framing it as a QA observation
    #[arg(long)]
    raw: bool,
}

#[derive(Args)]
struct SummarizeArgs {
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    text: Option<String>,

    /// Read the text from a file
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(long)]
    points: u32,
}

#[derive(Args)]
struct ImageArgs {
    #[arg(short, long)]
    description: String,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:7800")]
    bind: String,
}

fn parse_var(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Ask(args) => args.json,
        Commands::Similar(args) => args.json,
        Commands::Embed(_) => true,
        _ => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !cli.verbose {
        for noisy in ["reqwest", "hyper", "hyper_util"] {
            builder.filter_module(noisy, log::LevelFilter::Warn);
        }
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = RaglineConfig::load(cli.config.as_deref())?;
    if let Some(mode) = cli.model_mode {
        config.mode = mode;
    }
    let runtime = Runtime::new(config)?;

    match cli.command {
        Commands::Ask(args) => run_ask(&runtime, args).await?,
        Commands::Similar(args) => run_similar(&runtime, args).await?,
        Commands::Embed(args) => run_embed(&runtime, args).await?,
        Commands::Generate(args) => run_generate(&runtime, args).await?,
        Commands::Chat(args) => run_chat(&runtime, args).await?,
        Commands::Summarize(args) => run_summarize(&runtime, args).await?,
        Commands::Image(args) => run_image(&runtime, args).await?,
        Commands::ServeHttp(args) => serve_http(&runtime, args).await?,
    }

    Ok(())
}

async fn run_ask(runtime: &Runtime, args: AskArgs) -> Result<()> {
    let chunking = args
        .chunking
        .map_or_else(|| runtime.config.chunking.clone(), ChunkPreset::config);
    let k = args.k.unwrap_or(runtime.config.retrieval.k);
    let rag = runtime.pipeline(chunking, k)?;

    for path in &args.files {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source = path.display().to_string();
        let added = rag.ingest_document(&document, Some(&source)).await?;
        log::info!("Indexed {added} chunks from {source}");
    }
    if !args.facts.is_empty() {
        let added = rag.ingest_facts(args.facts.iter().cloned()).await?;
        log::info!("Indexed {added} facts");
    }
    if rag.store().is_empty() {
        log::warn!("Nothing indexed; answering without context");
    }

    let answer: RagAnswer = rag.answer(&args.question).await?;
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&answer)?)?;
    } else {
        print_stdout(answer.text.trim())?;
    }
    Ok(())
}

#[derive(Serialize)]
struct SimilarityLine {
    input: String,
    similarity: f32,
}

async fn run_similar(runtime: &Runtime, args: SimilarArgs) -> Result<()> {
    let (provider, units, query, label): (Arc<dyn EmbeddingProvider>, Vec<ContentUnit>, _, _) =
        match (args.query, args.query_image) {
            (Some(query), None) => {
                let units = args.facts.iter().map(ContentUnit::text).collect();
                (runtime.text_embedder()?, units, ContentUnit::text(&query), query)
            }
            (None, Some(query_image)) => {
                let mut units = Vec::with_capacity(args.images.len());
                for path in &args.images {
                    units.push(read_image(path)?.with_source(path.display().to_string()));
                }
                let label = query_image.display().to_string();
                (runtime.image_embedder()?, units, read_image(&query_image)?, label)
            }
            _ => anyhow::bail!("Pass --query with --fact, or --query-image with --image"),
        };

    let store = VectorStore::for_model(provider.model_id());
    Ingestor::new(Arc::clone(&provider))
        .with_concurrency(runtime.config.retrieval.concurrency)
        .ingest(&store, units)
        .await?;
    let query_vector = provider.embed(&query).await?;
    let k = args.k.unwrap_or_else(|| store.len()).max(1);
    let hits = store.query(&query_vector, k)?;

    let lines: Vec<SimilarityLine> = hits.into_iter().map(similarity_line).collect();
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&lines)?)?;
        return Ok(());
    }
    print_stdout(&format!("Similarity of {label} with:"))?;
    for line in &lines {
        print_stdout(&format!(
            "{}: {}",
            line.input,
            to_precision(line.similarity, 2)
        ))?;
    }
    Ok(())
}

fn similarity_line(hit: RetrievalResult) -> SimilarityLine {
    let input = match (hit.unit.as_text(), &hit.unit.metadata.source) {
        (Some(text), _) => text.to_string(),
        (None, Some(source)) => source.clone(),
        (None, None) => format!("#{}", hit.position),
    };
    SimilarityLine {
        input,
        similarity: hit.score,
    }
}

fn read_image(path: &std::path::Path) -> Result<ContentUnit> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(ContentUnit::image(bytes))
}

/// Format with `digits` significant digits
fn to_precision(value: f32, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{:.*}", digits.saturating_sub(1), value);
    }
    let decimals_for = |v: f64| {
        let magnitude = v.abs().log10().floor() as i64;
        (digits as i64 - 1 - magnitude).max(0) as usize
    };
    let value = f64::from(value);
    // Rounding can carry into the next power of ten (0.999 -> 1.00)
    let rounded: f64 = format!("{:.*}", decimals_for(value), value)
        .parse()
        .unwrap_or(value);
    let decimals = if rounded == 0.0 {
        decimals_for(value)
    } else {
        decimals_for(rounded)
    };
    format!("{rounded:.decimals$}")
}

async fn run_embed(runtime: &Runtime, args: EmbedArgs) -> Result<()> {
    let (provider, unit) = match (args.text, args.image) {
        (Some(text), _) => (runtime.text_embedder()?, ContentUnit::text(text)),
        (None, Some(path)) => (runtime.image_embedder()?, read_image(&path)?),
        (None, None) => anyhow::bail!("Pass --text or --image"),
    };
    let vector = provider.embed(&unit).await?;
    print_stdout(&serde_json::to_string(vector.values())?)?;
    Ok(())
}

async fn run_generate(runtime: &Runtime, args: GenerateArgs) -> Result<()> {
    let mut params = runtime.config.sampling.clone();
    if let Some(max_tokens) = args.max_tokens {
        params = params.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        params = params.with_temperature(temperature);
    }
    if !args.stop_sequences.is_empty() {
        params = params.with_stop_sequences(args.stop_sequences);
    }
    let mut chain = runtime.generation().with_params(params);
    if let Some(model) = args.model {
        chain = GenerationChain::new(
            Arc::clone(&runtime.invoker),
            model,
            chain.params().clone(),
        );
    }

    let text = match (args.prompt, args.template) {
        (Some(prompt), _) => chain.generate_text(&prompt).await?,
        (None, Some(name)) => {
            let template: PromptTemplate = templates::by_name(&name)
                .with_context(|| format!("Unknown template '{name}'"))?;
            let vars = args
                .vars
                .into_iter()
                .fold(PromptVariables::new(), |vars, (name, value)| {
                    vars.with(name, value)
                });
            chain.invoke(&template, &vars).await?
        }
        (None, None) => anyhow::bail!("Pass --prompt or --template"),
    };
    print_stdout(text.trim())?;
    Ok(())
}

async fn run_chat(runtime: &Runtime, args: ChatArgs) -> Result<()> {
    let chain = runtime.generation();
    let mut session = if args.stateless {
        ChatSession::stateless(chain)
    } else {
        ChatSession::new(chain, runtime.config.chat.policy())
    };
    if !args.raw {
        session = session.with_frame(templates::qa_report(), "observation")?;
    }

    print_stdout("Quality Assurance Bot is ready. Type your observation to generate a report.")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match session.send(&line).await {
            Ok(reply) => print_stdout(reply.trim())?,
            Err(err) => log::error!("Generation failed: {err}"),
        }
    }
    log::debug!("Chat ended with {} retained turns", session.history().len());
    Ok(())
}

fn build_handlers(runtime: &Runtime) -> Handlers {
    let config = &runtime.config;
    Handlers::new(
        Arc::clone(&runtime.invoker),
        Arc::clone(&runtime.objects),
        config.models.text_model.clone(),
        config.models.image_model.clone(),
    )
    .with_bucket(config.storage.bucket.clone())
    .with_url_ttl(config.storage.url_ttl_secs)
}

async fn run_summarize(runtime: &Runtime, args: SummarizeArgs) -> Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Pass --text or --file"),
    };
    let request = HandlerRequest {
        text: Some(text),
        points: Some(args.points),
        ..HandlerRequest::default()
    };
    let response = build_handlers(runtime).summarize(&request).await;
    if !response.is_success() {
        anyhow::bail!("Summarize failed ({}): {}", response.status_code, response.body);
    }
    let summary = response.body["summary"].as_str().unwrap_or_default();
    print_stdout(summary.trim())?;
    Ok(())
}

async fn run_image(runtime: &Runtime, args: ImageArgs) -> Result<()> {
    let request = HandlerRequest {
        description: Some(args.description),
        ..HandlerRequest::default()
    };
    let response = build_handlers(runtime).generate_image(&request).await;
    if !response.is_success() {
        anyhow::bail!("Image generation failed ({}): {}", response.status_code, response.body);
    }
    print_stdout(response.body["url"].as_str().unwrap_or_default())?;
    Ok(())
}

async fn serve_http(runtime: &Runtime, args: ServeArgs) -> Result<()> {
    let app = http_api::router(build_handlers(runtime));
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let base_url = format!("http://{}", listener.local_addr()?);

    print_stdout(&format!("Serving handlers: {base_url}/summarize, {base_url}/image"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    print_stdout(&format!(
        "Try: curl -X POST '{base_url}/summarize?points=3' -H 'Content-Type: application/json' -d '{{\"text\":\"...\"}}'"
    ))?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn precision_matches_two_significant_digits() {
        assert_eq!(to_precision(0.288_67, 2), "0.29");
        assert_eq!(to_precision(1.0, 2), "1.0");
        assert_eq!(to_precision(0.0, 2), "0.0");
        assert_eq!(to_precision(-0.043_2, 2), "-0.043");
        assert_eq!(to_precision(0.5, 2), "0.50");
        assert_eq!(to_precision(0.999_999_94, 2), "1.0");
        assert_eq!(to_precision(0.099_9, 2), "0.10");
    }

    #[test]
    fn vars_split_on_first_equals() {
        assert_eq!(
            parse_var("product_name=a=b").unwrap(),
            ("product_name".to_string(), "a=b".to_string())
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
