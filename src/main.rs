//! vtiles CLI entrypoint.
//!
//! This is the main entrypoint for the vtiles command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vtiles_deploy::cli::{Cli, Commands, DeployArgs, OutputFormatter};
use vtiles_deploy::config::{
    find_config_file, ConfigParser, ConfigValidator, DeployConfig, StorageBackend,
};
use vtiles_deploy::error::{ResolveError, Result, VtilesError};
use vtiles_deploy::launch::{select_server_version, StackLauncher, StackRequest};
use vtiles_deploy::resolver::{default_name, validate_name, DeploymentResolver};
use vtiles_deploy::store::{
    LayerSource, LocalObjectStore, ObjectStore, S3ObjectStore, TileRepository,
};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Repository over whichever backend the configuration selects.
type Repository = TileRepository<Box<dyn ObjectStore>>;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Catalog => cmd_catalog(config_path, &formatter).await,
        Commands::Deployments => cmd_deployments(config_path, &formatter).await,
        Commands::Show { name } => cmd_show(config_path, &name, &formatter).await,
        Commands::Deploy(args) => cmd_deploy(config_path, &args, &formatter).await,
        Commands::Publish { layers, source_dir } => {
            cmd_publish(config_path, &layers, &source_dir, &formatter).await
        }
        Commands::Fetch { name, dest } => cmd_fetch(config_path, &name, &dest, &formatter).await,
        Commands::Launch {
            name,
            server_version,
            yes,
        } => cmd_launch(config_path, &name, server_version.as_deref(), yes, &formatter).await,
    }
}

/// Write a configuration template.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing vtiles project in: {}", path.display());

    let config_path = path.join("vtiles.deploy.yaml");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let files = [
        (config_path, include_str!("../templates/vtiles.deploy.yaml")),
        (path.join(".env.example"), include_str!("../templates/.env.example")),
        (path.join("user-data"), include_str!("../templates/user-data")),
        (
            path.join("aws-template.json"),
            include_str!("../templates/aws-template.json"),
        ),
    ];

    for (file, content) in &files {
        if file.exists() && !force {
            eprintln!("Skipped existing: {}", file.display());
            continue;
        }
        std::fs::write(file, content)?;
        eprintln!("Created: {}", file.display());
    }

    // Write/update .gitignore
    let gitignore_path = path.join(".gitignore");
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# vtiles\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit vtiles.deploy.yaml with your bucket");
    eprintln!("  2. Run 'vtiles validate' to check your configuration");
    eprintln!("  3. Run 'vtiles catalog' to list published layers");
    eprintln!("  4. Run 'vtiles deploy --latest' to compose a deployment");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let config = load_config(&config_file)?;
    let result = ConfigValidator::new().validate(&config)?;

    emit(&formatter.format_validation(&config, &result, show_warnings))
}

/// List published layers.
async fn cmd_catalog(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (_config, repository) = load_config_and_store(config_path).await?;
    let catalog = repository.scan_catalog().await?;

    emit(&formatter.format_catalog(&catalog))
}

/// List stored deployments.
async fn cmd_deployments(
    config_path: Option<&PathBuf>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, repository) = load_config_and_store(config_path).await?;
    let names = repository.list_deployments().await?;

    emit(&formatter.format_deployments(&names))
}

/// Show a stored deployment.
async fn cmd_show(
    config_path: Option<&PathBuf>,
    name: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, repository) = load_config_and_store(config_path).await?;
    let manifest = repository
        .load_manifest(name)
        .await?
        .ok_or_else(|| ResolveError::not_found(name))?;

    emit(&formatter.format_manifest(name, &manifest))
}

/// Resolve, store and optionally launch a deployment.
async fn cmd_deploy(
    config_path: Option<&PathBuf>,
    args: &DeployArgs,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mode = args.mode()?;
    let (config, repository) = load_config_and_store(config_path).await?;

    let name = match &args.name {
        Some(name) => name.clone(),
        None => default_name(&config.deployment.name_format)?,
    };
    validate_name(&name)?;

    let catalog = repository.scan_catalog().await?;
    let previous = match mode.base() {
        Some(base) => repository.load_manifest(base).await?,
        None => None,
    };

    let resolution = DeploymentResolver::new().resolve(&catalog, &mode, previous.as_ref())?;
    emit(&formatter.format_resolution(&name, &resolution))?;

    if args.dry_run {
        if !formatter.is_json() {
            eprintln!("Dry run: deployment {name} not stored.");
        }
        return Ok(());
    }

    if repository.load_manifest(&name).await?.is_some() {
        eprintln!(
            "{}",
            formatter.warning(&format!("Deployment {name} already exists and will be replaced"))
        );
    }

    if !args.yes && !confirm(&format!("Store deployment {name}?"))? {
        eprintln!("Deployment cancelled.");
        return Ok(());
    }

    let key = repository.save_manifest(&name, &resolution.manifest).await?;
    emit(&formatter.format_saved(&name, &key))?;

    if args.launch {
        launch_stack(
            &config,
            &repository,
            &name,
            args.server_version.as_deref(),
            args.yes,
            formatter,
        )
        .await?;
    }

    Ok(())
}

/// Publish layers.
async fn cmd_publish(
    config_path: Option<&PathBuf>,
    layers: &[String],
    source_dir: &Path,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, repository) = load_config_and_store(config_path).await?;

    let sources: Vec<LayerSource> = layers
        .iter()
        .map(|layer| LayerSource::from_dir(source_dir, layer))
        .collect();

    let published = repository.publish(&sources).await?;

    emit(&formatter.format_published(&published))
}

/// Fetch a deployment to local disk.
async fn cmd_fetch(
    config_path: Option<&PathBuf>,
    name: &str,
    dest: &Path,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, repository) = load_config_and_store(config_path).await?;
    let report = repository.fetch(name, dest).await?;

    emit(&formatter.format_fetch(name, &report))
}

/// Launch a stack for a stored deployment.
async fn cmd_launch(
    config_path: Option<&PathBuf>,
    name: &str,
    server_version: Option<&str>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, repository) = load_config_and_store(config_path).await?;

    if repository.load_manifest(name).await?.is_none() {
        return Err(ResolveError::not_found(name).into());
    }

    launch_stack(
        &config,
        &repository,
        name,
        server_version,
        auto_approve,
        formatter,
    )
    .await
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Renders and creates the stack serving `name`.
async fn launch_stack(
    config: &DeployConfig,
    repository: &Repository,
    name: &str,
    server_version: Option<&str>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let available = repository.list_server_versions().await?;
    let version = select_server_version(&available, server_version)?;
    debug!("Using server version {version}");

    let request = StackRequest::prepare(&config.launch, name, &version).await?;

    if !auto_approve
        && !confirm(&format!(
            "Create stack {name} with server {version} in {}?",
            config.launch.region
        ))?
    {
        eprintln!("Launch cancelled.");
        return Ok(());
    }

    let launcher = StackLauncher::new(&config.launch.region).await;
    let stack_id = launcher.create(&request).await?;

    emit(&formatter.format_launch(&stack_id, &version))
}

/// Asks a yes/no question on the terminal.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads `.env` and the configuration file with environment overrides.
fn load_config(config_file: &Path) -> Result<DeployConfig> {
    let parser = ConfigParser::new().with_base_path(config_dir(config_file));
    parser.load_dotenv()?;
    parser.load_with_env(config_file)
}

fn config_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads configuration and creates the configured object store.
async fn load_config_and_store(
    config_path: Option<&PathBuf>,
) -> Result<(DeployConfig, Repository)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let config = load_config(&config_file)?;

    // Validate
    let validation = ConfigValidator::new().validate(&config)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let store: Box<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let path = config
                .storage
                .path
                .as_deref()
                .ok_or_else(|| VtilesError::internal("Local store path not configured"))?;
            Box::new(LocalObjectStore::with_base_dir(
                config_dir(&config_file).join(path),
            ))
        }
        StorageBackend::S3 => {
            let bucket = config
                .storage
                .bucket
                .as_deref()
                .ok_or_else(|| VtilesError::internal("S3 bucket not configured"))?;
            let prefix = config.storage.prefix.as_deref();
            let region = config.storage.region.as_deref();
            Box::new(S3ObjectStore::new(bucket, prefix, region).await?)
        }
    };

    info!("Using {} store at {}", store.backend_type(), config.storage.location());

    Ok((config, TileRepository::new(store)))
}
