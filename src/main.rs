use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use dist_tags::config::{self, AppConfig, FETCH_TIMEOUT_MS};
use dist_tags::render::{package_view, render_json, render_table};
use dist_tags::version::cache::{Cache, DistTagStore};
use dist_tags::version::registries::NpmRegistry;
use dist_tags::version::resolver::DistTagResolver;
use dist_tags::version::semver::PrereleaseOrdering;

#[derive(Parser)]
#[command(name = "dist-tags")]
#[command(version, about = "Show npm dist-tags grouped by the version they point at")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show dist-tags for one or more packages, newest version first
    Show(ShowArgs),
    /// Manage the local dist-tag cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
struct ShowArgs {
    /// Package names, e.g. react or @types/node
    #[arg(required = true)]
    packages: Vec<String>,

    /// Hide a tag from the listing (repeatable)
    #[arg(long = "exclude", value_name = "TAG")]
    excluded: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Ignore cached data and fetch from the registry
    #[arg(long)]
    refresh: bool,

    /// Registry base URL, overriding the configured one
    #[arg(long, value_name = "URL")]
    registry: Option<String>,

    /// Rank prereleases by semver precedence instead of plain string order
    #[arg(long)]
    semver_prerelease: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached package
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = dist_tags::log::init()?;
    let config = AppConfig::load(&config::config_path())?;
    let cache = Arc::new(Cache::new(
        &config::db_path(),
        config.cache.refresh_interval,
    )?);

    match cli.command {
        Command::Show(args) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(show(args, config, cache)),
        Command::Cache {
            action: CacheAction::Clear,
        } => {
            let removed = cache.clear()?;
            println!("Removed {} cached packages", removed);
            Ok(())
        }
    }
}

async fn show(args: ShowArgs, config: AppConfig, cache: Arc<Cache>) -> anyhow::Result<()> {
    let registry_url = args.registry.unwrap_or(config.registry.url);
    let registry = NpmRegistry::new(&registry_url, Duration::from_millis(FETCH_TIMEOUT_MS))?;
    let resolver = DistTagResolver::new(cache, Arc::new(registry));

    let mut excluded = config.display.excluded_tags;
    excluded.extend(args.excluded);
    let ordering = if args.semver_prerelease {
        PrereleaseOrdering::Semver
    } else {
        config.display.prerelease_ordering
    };

    info!("Showing dist-tags for {} packages", args.packages.len());

    let mut views = Vec::new();
    let mut failed = 0;
    for (name, result) in resolver.resolve_all(&args.packages, args.refresh).await {
        match result {
            Ok(package) => views.push(package_view(&package, &excluded, ordering)),
            Err(e) => {
                eprintln!("{}: {}", name, e);
                failed += 1;
            }
        }
    }

    if args.json {
        println!("{}", render_json(&views)?);
    } else {
        let tables: Vec<String> = views.iter().map(render_table).collect();
        print!("{}", tables.join("\n"));
    }

    if failed > 0 {
        anyhow::bail!("{} of {} packages could not be resolved", failed, args.packages.len());
    }
    Ok(())
}
