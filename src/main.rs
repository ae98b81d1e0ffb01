use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use albumshelf::config::{AppConfig, CliConfig, FileConfig};
use albumshelf::context::RunContext;
use albumshelf::discogs::{HttpMetadataSource, RequestPacer, RetryPolicy};
use albumshelf::export::{build_statements, prepare_batch, write_statement_file, ExportVariant};
use albumshelf::reconcile::{CommitMode, ReconciliationEngine};
use albumshelf::sheet::{AlbumRecord, RowTransport, SheetRow, TsvRowTransport};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(
    name = "albumshelf",
    about = "Keep an album worksheet reconciled with canonical metadata and export it to SQL."
)]
struct CliArgs {
    /// Directory holding the durable caches (and default locations for the
    /// worksheet and SQL files).
    #[clap(long, value_parser = parse_path)]
    data_dir: Option<PathBuf>,

    /// Path to the worksheet file.
    #[clap(long, value_parser = parse_path)]
    sheet: Option<PathBuf>,

    /// Directory with the SQL schema templates and statement outputs.
    #[clap(long, value_parser = parse_path)]
    sql_dir: Option<PathBuf>,

    /// Optional TOML config file; its values override the CLI flags.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    /// Personal access token for the metadata service.
    #[clap(long)]
    discogs_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch canonical metadata and reconcile worksheet rows.
    Sync {
        /// Resolve release references up to their master before fetching.
        #[clap(long)]
        resolve_masters: bool,

        /// How change-sets are committed.
        #[clap(long, value_enum, default_value = "confirm")]
        commit: CommitMode,
    },
    /// Print the parsed worksheet batch as JSON.
    ExportJson {
        /// Fail on the first row error instead of reporting and continuing.
        #[clap(long)]
        strict: bool,
    },
    /// Generate the scored and public SQL statement files.
    ExportSql,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        data_dir: cli_args.data_dir.clone(),
        sheet_path: cli_args.sheet.clone(),
        sql_dir: cli_args.sql_dir.clone(),
        discogs_token: cli_args.discogs_token.clone(),
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    match cli_args.command {
        Command::Sync {
            resolve_masters,
            commit,
        } => run_sync(&config, resolve_masters, commit),
        Command::ExportJson { strict } => run_export_json(&config, strict),
        Command::ExportSql => run_export_sql(&config),
    }
}

fn metadata_source(config: &AppConfig) -> HttpMetadataSource {
    HttpMetadataSource::new(
        config.discogs_base_url.clone(),
        config.discogs_token.clone(),
        &config.user_agent,
        RequestPacer::new(config.request_delay),
        RetryPolicy::new(config.retry_max_attempts, config.retry_interval),
    )
}

/// Reads the worksheet, returning the header row and the batch rows.
fn read_batch(config: &AppConfig, transport: &TsvRowTransport) -> Result<(Vec<String>, Vec<SheetRow>)> {
    let mut rows = transport.read_rows()?;
    if rows.is_empty() {
        bail!("worksheet at {:?} is empty", config.sheet_path);
    }
    let header = rows.remove(0);
    let sheet_rows = rows.iter().map(|cells| SheetRow::from_cells(cells)).collect();
    Ok((header, sheet_rows))
}

fn run_sync(config: &AppConfig, resolve_masters: bool, commit: CommitMode) -> Result<()> {
    let transport = TsvRowTransport::new(config.sheet_path.clone());
    let (header, mut rows) = read_batch(config, &transport)?;
    info!("reconciling {} row(s) from {:?}", rows.len(), config.sheet_path);

    let ctx = RunContext::initialize(config)?;
    let source = metadata_source(config);
    let engine = ReconciliationEngine::new(
        &ctx.metadata_cache,
        &source,
        commit.strategy(),
        config.separators.clone(),
        resolve_masters,
    );
    let stats = engine.process_batch(&mut rows)?;

    let mut out_rows = Vec::with_capacity(rows.len() + 1);
    out_rows.push(header);
    out_rows.extend(rows.iter().map(SheetRow::to_cells));
    transport.write_rows(&out_rows)?;
    info!(
        "sync finished: {} reconciled, {} tidied, {} unchanged, {} declined",
        stats.reconciled, stats.tidied, stats.unchanged, stats.declined
    );
    Ok(())
}

/// Parses the batch, reporting row errors on stderr and keeping the good
/// rows. Row numbers in messages are worksheet positions (header is row 1).
fn parse_batch(rows: &[SheetRow], config: &AppConfig, strict: bool) -> Result<Vec<AlbumRecord>> {
    let mut records = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match AlbumRecord::parse(row, &config.separators) {
            Ok(record) => records.push(record),
            Err(error) if strict => {
                return Err(error).with_context(|| format!("worksheet row {}", index + 2))
            }
            Err(error) => warn!("worksheet row {}: {error}", index + 2),
        }
    }
    Ok(records)
}

fn run_export_json(config: &AppConfig, strict: bool) -> Result<()> {
    let transport = TsvRowTransport::new(config.sheet_path.clone());
    let (_, rows) = read_batch(config, &transport)?;
    let records = parse_batch(&rows, config, strict)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_export_sql(config: &AppConfig) -> Result<()> {
    let transport = TsvRowTransport::new(config.sheet_path.clone());
    let (_, rows) = read_batch(config, &transport)?;
    let records = parse_batch(&rows, config, false)?;
    info!("exporting {} album(s)", records.len());

    let mut ctx = RunContext::initialize(config)?;
    let source = metadata_source(config);

    for variant in [ExportVariant::Scored, ExportVariant::Public] {
        ctx.reset_registries();
        let batch = prepare_batch(
            &records,
            variant,
            &mut ctx.reasons,
            &mut ctx.genres,
            &mut ctx.styles,
            &mut ctx.artist_names,
            &source,
        )?;
        let statements = build_statements(
            &batch,
            &ctx.artist_names,
            &ctx.reasons,
            &ctx.genres,
            &ctx.styles,
        )?;
        let (template, output) = match variant {
            ExportVariant::Scored => (config.scored_template_path(), config.scored_output_path()),
            ExportVariant::Public => (config.public_template_path(), config.public_output_path()),
        };
        write_statement_file(&template, &output, &statements)?;
    }
    ctx.artist_names.flush()?;
    Ok(())
}
