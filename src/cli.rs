//! Command-line interface for the `spv` binary

use clap::{ArgAction, Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use crate::atlas::{AssetFetcher, FileFetcher};
use crate::category::Category;
use crate::config::{merge_cli_overrides, read_config, validated, CliOverrides, ConfigError, EngineConfig};
use crate::context::EngineContext;
use crate::engine::{rasterize, CanvasOptions, SpriteEngine, SpriteRequest};
use crate::host::HeadlessProvider;
use crate::logging;
use crate::output::{default_output_path, save_png, MAX_SCALE};
use crate::variant::{VariantBuilder, VariantMode};

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// spv - Composite sprite variants from texture atlases
#[derive(Parser)]
#[command(name = "spv")]
#[command(about = "Composite mutated sprite variants from texture atlases")]
#[command(version)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to spv.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sprite ids available in the atlas
    List {
        /// Directory or URL holding manifest.json (overrides spv.toml)
        #[arg(long)]
        assets: Option<String>,

        /// Only list this category (plant, tall-plant, crop, decor, item, pet, seed, ...)
        #[arg(long, default_value = "any")]
        category: Category,
    },
    /// Render a sprite with mutations applied to PNG
    Render {
        /// Directory or URL holding manifest.json (overrides spv.toml)
        #[arg(long)]
        assets: Option<String>,

        /// Category to search
        #[arg(long, default_value = "any")]
        category: Category,

        /// Sprite id, e.g. "Carrot"
        #[arg(long)]
        id: String,

        /// Comma-separated mutation names
        #[arg(short, long, value_delimiter = ',')]
        mutations: Vec<String>,

        /// Output PNG (default: {id}_{mutations}.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Animation frame to write
        #[arg(long, default_value = "0")]
        frame: usize,

        /// Integer scale factor
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=MAX_SCALE as i64))]
        scale: u32,

        /// Print a PNG data URL instead of writing a file
        #[arg(long)]
        data_url: bool,

        /// Fail when an overlay or icon texture is missing
        #[arg(long)]
        strict: bool,
    },
    /// Print the canonical variant signature for a mutation set
    Signature {
        /// Use tall-sprite rules (overlays instead of tints)
        #[arg(long)]
        tall: bool,

        /// Mutation names
        mutations: Vec<String>,
    },
}

/// Main entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::setup_logger(logging::level_for(cli.verbose, cli.quiet));

    match cli.command {
        Commands::List { assets, category } => {
            let overrides = CliOverrides { base_url: assets, ..Default::default() };
            match build_config(cli.config.as_deref(), &overrides) {
                Ok(config) => run_list(config, category),
                Err(code) => code,
            }
        }
        Commands::Render { assets, category, id, mutations, output, frame, scale, data_url, strict } => {
            let overrides = CliOverrides { base_url: assets, strict_assets: strict.then_some(true), ..Default::default() };
            let config = match build_config(cli.config.as_deref(), &overrides) {
                Ok(config) => config,
                Err(code) => return code,
            };
            let request = SpriteRequest::new(category, id).with_mutations(mutations);
            let options = CanvasOptions { frame, scale };
            run_render(config, &request, &options, output.as_deref(), data_url)
        }
        Commands::Signature { tall, mutations } => run_signature(tall, &mutations),
    }
}

fn build_config(path: Option<&Path>, overrides: &CliOverrides) -> Result<EngineConfig, ExitCode> {
    resolve_config(path, overrides).map_err(|e| {
        eprintln!("Error: {}", e);
        match e {
            ConfigError::Validation(_) => ExitCode::from(EXIT_INVALID_ARGS),
            _ => ExitCode::from(EXIT_ERROR),
        }
    })
}

/// Config file and environment, then command-line overrides, validated as a whole.
fn resolve_config(path: Option<&Path>, overrides: &CliOverrides) -> Result<EngineConfig, ConfigError> {
    let mut config = read_config(path)?;
    merge_cli_overrides(&mut config, overrides);
    validated(config)
}

/// Build an engine over the configured assets and run `start`.
fn start_engine(config: EngineConfig) -> Result<SpriteEngine, String> {
    let fetcher = fetcher_for(&config.assets.base_url)?;
    let ctx = EngineContext::new(Rc::new(HeadlessProvider::new()), fetcher);
    let engine = SpriteEngine::new(ctx, config);

    let report = block_on(engine.start())?.map_err(|e| e.to_string())?;
    if report.descriptors_failed > 0 || report.images_failed > 0 {
        log::warn!(
            "{} descriptor(s) and {} image(s) failed to load",
            report.descriptors_failed,
            report.images_failed
        );
    }
    log::info!("loaded {} frame(s)", report.frames_loaded);
    Ok(engine)
}

fn run_list(config: EngineConfig, category: Category) -> ExitCode {
    let engine = match start_engine(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    for id in engine.list(category) {
        println!("{}", id);
    }
    ExitCode::from(EXIT_SUCCESS)
}

fn run_render(
    config: EngineConfig,
    request: &SpriteRequest,
    options: &CanvasOptions,
    output: Option<&Path>,
    data_url: bool,
) -> ExitCode {
    let engine = match start_engine(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if data_url {
        return match block_on(engine.render_to_data_url(request, options)) {
            Ok(Ok(url)) => {
                println!("{}", url);
                ExitCode::from(EXIT_SUCCESS)
            }
            Ok(Err(e)) => fail(e),
            Err(e) => fail(e),
        };
    }

    let image = match block_on(engine.render_variant(request)) {
        Ok(Ok(item)) => match rasterize(&item, options) {
            Ok(image) => image,
            Err(e) => return fail(e),
        },
        Ok(Err(e)) => return fail(e),
        Err(e) => return fail(e),
    };

    let path = output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(&request.id, &request.mutations));
    if let Err(e) = save_png(&image, &path) {
        eprintln!("Error: Failed to save '{}': {}", path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {}", path.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_signature(tall: bool, mutations: &[String]) -> ExitCode {
    let mode = if tall { VariantMode::Tall } else { VariantMode::Normal };
    let variant = VariantBuilder::build(mutations, mode);
    println!("{}", variant.signature);
    ExitCode::from(EXIT_SUCCESS)
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    eprintln!("Error: {}", e);
    ExitCode::from(EXIT_ERROR)
}

fn is_remote(base_url: &str) -> bool {
    base_url.contains("://") && !base_url.starts_with("file://")
}

fn fetcher_for(base_url: &str) -> Result<Rc<dyn AssetFetcher>, String> {
    if is_remote(base_url) {
        return remote_fetcher(base_url);
    }
    Ok(Rc::new(FileFetcher::new(".")))
}

#[cfg(feature = "http")]
fn remote_fetcher(_base_url: &str) -> Result<Rc<dyn AssetFetcher>, String> {
    Ok(Rc::new(crate::atlas::HttpFetcher::new()))
}

#[cfg(not(feature = "http"))]
fn remote_fetcher(base_url: &str) -> Result<Rc<dyn AssetFetcher>, String> {
    Err(format!("'{}' is a remote URL; rebuild spv with the 'http' feature", base_url))
}

#[cfg(feature = "http")]
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|e| e.to_string())?;
    Ok(runtime.block_on(future))
}

#[cfg(not(feature = "http"))]
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    Ok(smol::block_on(future))
}
