//! cinefind - movie search and favorites over TMDB.

/// Application configuration (TOML).
mod config;
/// Interactive page navigation.
mod pager;
/// Table output.
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crate::config::{AppConfig, TmdbConfig, resolve_config_path, resolve_data_dir};
use crate::pager::{movie_from_record, run_pager};
use crate::render::{render_genres, render_movies, render_page};
use cinefind_api::tmdb::{Credential, LocalTmdbTransport, TmdbClient};
use cinefind_db::{clear_favorites, load_favorites, open_db, remove_favorite};
use cinefind_search::{
    Favorites, GenreCatalog, MAX_PAGE, MovieFilterer, PaginationController, QueryBuilder,
    ResultPage, SearchCriteria, SearchError, VoteThreshold, YearFilter,
};

/// File name of the cached genre list inside the data directory.
const GENRE_SNAPSHOT: &str = "genres.json";

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Search movies by title or by filters.
    Search(SearchArgs),
    /// Browse popular movies, optionally narrowed locally.
    Popular(PopularArgs),
    /// List the movie genres known to TMDB.
    Genres(GenresArgs),
    /// Manage the favorites list.
    Favorites(FavoritesCommand),
    /// Inspect or create the config file.
    Config(ConfigCommand),
    /// Print a shell completion script.
    Completions(CompletionsArgs),
}

/// Title and filter flags shared by `search` and `popular`.
#[derive(clap::Args)]
struct CriteriaArgs {
    /// Title text (matches original or localized title).
    #[arg(long)]
    title: Option<String>,

    /// Exact release year.
    #[arg(long, conflicts_with_all = ["min_year", "max_year"])]
    year: Option<String>,

    /// Earliest release year (inclusive).
    #[arg(long)]
    min_year: Option<String>,

    /// Latest release year (inclusive).
    #[arg(long)]
    max_year: Option<String>,

    /// Minimum vote average (0-10).
    #[arg(long)]
    min_vote: Option<String>,

    /// Genre names (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',')]
    genre: Vec<String>,
}

impl CriteriaArgs {
    /// Validates everything that does not need the genre catalog.
    fn base_criteria(&self) -> Result<SearchCriteria, SearchError> {
        let years = match &self.year {
            Some(year) => YearFilter::parse_single(year)?,
            None => YearFilter::parse_range(
                self.min_year.as_deref().unwrap_or_default(),
                self.max_year.as_deref().unwrap_or_default(),
            )?,
        };
        let min_vote = VoteThreshold::parse(self.min_vote.as_deref().unwrap_or_default())?;

        Ok(SearchCriteria::new()
            .with_title(self.title.clone().unwrap_or_default())
            .with_years(years)
            .with_min_vote(min_vote))
    }

    /// Whether no title or filter was given at all.
    fn is_empty(&self) -> Result<bool, SearchError> {
        Ok(self.base_criteria()?.is_empty() && self.genre.iter().all(|g| g.trim().is_empty()))
    }

    /// Full criteria with genre names resolved against `catalog`.
    fn criteria(&self, catalog: &GenreCatalog) -> Result<SearchCriteria, SearchError> {
        self.base_criteria()?
            .with_genre_names(catalog, self.genre.iter().map(String::as_str))
    }
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Search criteria.
    #[command(flatten)]
    criteria: CriteriaArgs,

    /// Page to show first.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE)))]
    page: u32,

    /// Keep the session open and navigate pages from stdin.
    #[arg(long, short)]
    interactive: bool,
}

/// Arguments for the `popular` subcommand.
#[derive(clap::Args)]
struct PopularArgs {
    /// Local filters applied to each fetched page.
    #[command(flatten)]
    criteria: CriteriaArgs,

    /// Page to show first.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE)))]
    page: u32,

    /// Keep the session open and navigate pages from stdin.
    #[arg(long, short)]
    interactive: bool,
}

/// Arguments for the `genres` subcommand.
#[derive(clap::Args)]
struct GenresArgs {
    /// Ignore the cached list and fetch it again.
    #[arg(long)]
    refresh: bool,
}

/// Arguments for the `favorites` subcommand.
#[derive(clap::Args)]
struct FavoritesCommand {
    /// Favorites subcommand to run.
    #[command(subcommand)]
    command: FavoritesSubcommands,
}

/// Available favorites subcommands.
#[derive(Subcommand)]
enum FavoritesSubcommands {
    /// Show saved favorites in the order they were added.
    List,
    /// Remove one favorite.
    Remove(FavoritesRemoveArgs),
    /// Remove every favorite.
    Clear,
}

/// Arguments for the `favorites remove` subcommand.
#[derive(clap::Args)]
struct FavoritesRemoveArgs {
    /// TMDB movie ID.
    #[arg(long)]
    id: u64,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args)]
struct ConfigCommand {
    /// Config subcommand to run.
    #[command(subcommand)]
    command: ConfigSubcommands,
}

/// Available config subcommands.
#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show the effective settings (API key redacted).
    Show,
    /// Write a default config file if none exists.
    Init,
}

/// Arguments for the `completions` subcommand.
#[derive(clap::Args)]
struct CompletionsArgs {
    /// Target shell.
    shell: clap_complete::Shell,
}

/// Picks the TMDB credential: `TMDB_API_TOKEN`, then `TMDB_API_KEY`, then
/// the config file's `api_key`. Blank values are ignored.
fn resolve_credential(
    env_token: Option<String>,
    env_key: Option<String>,
    config_key: Option<&str>,
) -> Option<Credential> {
    let present = |v: &String| !v.trim().is_empty();
    env_token
        .filter(present)
        .map(Credential::BearerToken)
        .or_else(|| env_key.filter(present).map(Credential::ApiKey))
        .or_else(|| {
            config_key
                .filter(|k| !k.trim().is_empty())
                .map(|k| Credential::ApiKey(String::from(k)))
        })
}

/// Builds a TMDB client from config and environment.
///
/// # Errors
///
/// Returns an error if no credential is available, `base_url` is not a
/// valid URL, or the client fails to build.
#[instrument(skip_all)]
fn build_tmdb_client(config: &TmdbConfig) -> Result<TmdbClient> {
    let credential = resolve_credential(
        std::env::var("TMDB_API_TOKEN").ok(),
        std::env::var("TMDB_API_KEY").ok(),
        config.api_key.as_deref(),
    )
    .context(
        "a TMDB credential is required: set TMDB_API_TOKEN, TMDB_API_KEY, or [tmdb] api_key",
    )?;

    let mut builder = TmdbClient::builder()
        .credential(credential)
        .min_interval(config.min_interval())
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
    if let Some(raw) = &config.base_url {
        let url = Url::parse(raw).with_context(|| format!("invalid [tmdb] base_url: {raw}"))?;
        builder = builder.base_url(url);
    }

    builder.build().context("failed to build TMDB client")
}

/// Loads the config file for `dir`.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let path = resolve_config_path(dir)?;
    AppConfig::load(&path)
}

/// Reads the genre snapshot if present; a corrupt file is reported and
/// treated as missing.
fn cached_catalog(path: &Path) -> Option<GenreCatalog> {
    if !path.exists() {
        return None;
    }
    let mut catalog = GenreCatalog::new();
    match catalog.load_from_snapshot(path, false) {
        Ok(_) => Some(catalog),
        Err(e) => {
            tracing::warn!("{e}; fetching genres again");
            None
        }
    }
}

/// Returns the cached genre catalog, or fetches and caches it.
///
/// # Errors
///
/// Returns an error if the remote fetch fails or the snapshot cannot be
/// written.
#[instrument(skip_all)]
async fn load_catalog<T: LocalTmdbTransport>(
    transport: &T,
    builder: &QueryBuilder,
    data_dir: &Path,
    refresh: bool,
) -> Result<GenreCatalog> {
    let path = data_dir.join(GENRE_SNAPSHOT);
    if !refresh && let Some(catalog) = cached_catalog(&path) {
        return Ok(catalog);
    }

    let mut catalog = GenreCatalog::new();
    catalog
        .load_from_remote(transport, builder, true)
        .await
        .context("failed to fetch genre list")?;
    catalog.save_snapshot(&path)?;
    tracing::debug!("Genre list cached at {}", path.display());
    Ok(catalog)
}

/// Opens a session on page 1 and, when asked, jumps to `page`.
async fn open_session<T: LocalTmdbTransport>(
    controller: &PaginationController<T>,
    criteria: Option<&SearchCriteria>,
    page: u32,
) -> Result<ResultPage> {
    let first = match criteria {
        Some(criteria) => controller.start(criteria).await?,
        None => controller.start_popular().await?,
    };
    if page <= 1 {
        return Ok(first);
    }
    Ok(controller.go_to(page).await?)
}

/// Shows one page, or hands the session to the pager.
async fn present<T: LocalTmdbTransport>(
    controller: &PaginationController<T>,
    first: &ResultPage,
    filter: Option<&MovieFilterer<'_>>,
    interactive: bool,
    data_dir: &Path,
) -> Result<()> {
    if !interactive {
        render_page(first, filter, controller.catalog());
        return Ok(());
    }
    let conn = open_db(data_dir)?;
    let stdin = std::io::stdin();
    run_pager(controller, first, filter, &conn, stdin.lock()).await
}

/// Runs the `search` subcommand.
///
/// # Errors
///
/// Returns an error if the criteria are invalid, no credential is
/// configured, or the request fails.
#[instrument(skip_all)]
async fn run_search(args: &SearchArgs, dir: Option<&PathBuf>) -> Result<()> {
    if args.criteria.is_empty()? {
        return Err(SearchError::EmptyQuery.into());
    }

    let config = load_config(dir)?;
    let data_dir = resolve_data_dir(dir)?;
    let client = build_tmdb_client(&config.tmdb)?;
    let builder = QueryBuilder::new(config.tmdb.language.clone());
    let catalog = load_catalog(&client, &builder, &data_dir, false).await?;
    let criteria = args.criteria.criteria(&catalog)?;

    let controller = PaginationController::new(client, builder, Arc::new(catalog))
        .with_timeout(config.tmdb.timeout());
    let first = open_session(&controller, Some(&criteria), args.page).await?;
    present(&controller, &first, None, args.interactive, &data_dir).await
}

/// Runs the `popular` subcommand.
///
/// # Errors
///
/// Returns an error if a filter is invalid, no credential is configured,
/// or the request fails.
#[instrument(skip_all)]
async fn run_popular(args: &PopularArgs, dir: Option<&PathBuf>) -> Result<()> {
    // Validate flags before touching the network.
    args.criteria.base_criteria()?;

    let config = load_config(dir)?;
    let data_dir = resolve_data_dir(dir)?;
    let client = build_tmdb_client(&config.tmdb)?;
    let builder = QueryBuilder::new(config.tmdb.language.clone());
    let catalog = load_catalog(&client, &builder, &data_dir, false).await?;
    let criteria = args.criteria.criteria(&catalog)?;
    let filterer = MovieFilterer::new(&criteria);
    let filter = (!criteria.is_empty()).then_some(&filterer);

    let controller = PaginationController::new(client, builder, Arc::new(catalog))
        .with_timeout(config.tmdb.timeout());
    let first = open_session(&controller, None, args.page).await?;
    present(&controller, &first, filter, args.interactive, &data_dir).await
}

/// Runs the `genres` subcommand.
///
/// # Errors
///
/// Returns an error if the list has to be fetched and the request fails.
#[instrument(skip_all)]
async fn run_genres(args: &GenresArgs, dir: Option<&PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(dir)?;
    let cached = if args.refresh {
        None
    } else {
        cached_catalog(&data_dir.join(GENRE_SNAPSHOT))
    };

    let catalog = match cached {
        Some(catalog) => catalog,
        None => {
            let config = load_config(dir)?;
            let client = build_tmdb_client(&config.tmdb)?;
            let builder = QueryBuilder::new(config.tmdb.language.clone());
            load_catalog(&client, &builder, &data_dir, true).await?
        }
    };

    render_genres(&catalog);
    Ok(())
}

/// Runs the `favorites list` subcommand.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or read.
#[instrument(skip_all)]
fn run_favorites_list(dir: Option<&PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(dir)?;
    let conn = open_db(&data_dir)?;
    let favorites: Favorites = load_favorites(&conn)?
        .into_iter()
        .map(movie_from_record)
        .collect();

    if favorites.is_empty() {
        tracing::info!("{favorites}");
        return Ok(());
    }

    let catalog =
        cached_catalog(&data_dir.join(GENRE_SNAPSHOT)).unwrap_or_else(GenreCatalog::new);
    let movies: Vec<_> = favorites.iter().cloned().collect();
    render_movies(&movies, &catalog);
    tracing::info!("Total: {} favorites", favorites.len());
    Ok(())
}

/// Runs the `favorites remove` subcommand.
///
/// # Errors
///
/// Returns an error if the database operation fails.
#[instrument(skip_all)]
fn run_favorites_remove(args: &FavoritesRemoveArgs, dir: Option<&PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(dir)?;
    let conn = open_db(&data_dir)?;
    if remove_favorite(&conn, args.id)? {
        tracing::info!("Removed movie {} from favorites", args.id);
    } else {
        tracing::warn!("Movie {} is not in favorites", args.id);
    }
    Ok(())
}

/// Runs the `favorites clear` subcommand.
///
/// # Errors
///
/// Returns an error if the database operation fails.
#[instrument(skip_all)]
fn run_favorites_clear(dir: Option<&PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(dir)?;
    let conn = open_db(&data_dir)?;
    let removed = clear_favorites(&conn)?;
    tracing::info!("Removed {removed} favorites");
    Ok(())
}

/// Runs the `config show` subcommand.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
#[instrument(skip_all)]
fn run_config_show(dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    let config = AppConfig::load(&path)?;
    let tmdb = &config.tmdb;
    let credential = resolve_credential(
        std::env::var("TMDB_API_TOKEN").ok(),
        std::env::var("TMDB_API_KEY").ok(),
        tmdb.api_key.as_deref(),
    );

    tracing::info!("Config file\t{}", path.display());
    tracing::info!("Data dir\t{}", resolve_data_dir(dir)?.display());
    tracing::info!("language\t{}", tmdb.language);
    tracing::info!(
        "base_url\t{}",
        tmdb.base_url.as_deref().unwrap_or("(default)")
    );
    tracing::info!("timeout_secs\t{}", tmdb.timeout_secs);
    tracing::info!("min_interval_ms\t{}", tmdb.min_interval_ms);
    tracing::info!(
        "credential\t{}",
        credential.map_or("(none)", |c| match c {
            Credential::ApiKey(_) => "api key",
            Credential::BearerToken(_) => "bearer token",
        })
    );
    Ok(())
}

/// Runs the `config init` subcommand.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
#[instrument(skip_all)]
fn run_config_init(dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    if path.exists() {
        tracing::warn!("{} already exists; leaving it unchanged", path.display());
        return Ok(());
    }
    AppConfig::default().save(&path)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Writes a completion script for `args.shell` to stdout.
fn run_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_owned();
    clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    let dir = cli.dir.as_ref();
    match cli.command {
        Commands::Search(args) => run_search(&args, dir).await,
        Commands::Popular(args) => run_popular(&args, dir).await,
        Commands::Genres(args) => run_genres(&args, dir).await,
        Commands::Favorites(fav) => match fav.command {
            FavoritesSubcommands::List => run_favorites_list(dir),
            FavoritesSubcommands::Remove(args) => run_favorites_remove(&args, dir),
            FavoritesSubcommands::Clear => run_favorites_clear(dir),
        },
        Commands::Config(cfg) => match cfg.command {
            ConfigSubcommands::Show => run_config_show(dir),
            ConfigSubcommands::Init => run_config_init(dir),
        },
        Commands::Completions(args) => {
            run_completions(&args);
            Ok(())
        }
    }
}
