use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use proxy_harvester::{
    config::{validate_test_url, AppConfig},
    proxy::{
        builtin_sources, filter_by_type, load_records, save_records, source_by_name,
        CheckerConfig, Proxy, ProxyChecker, ProxyCrawler, ProxyParser, ProxySource, ProxyType,
    },
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Harvest proxies from public proxy lists and keep the ones that work
#[derive(Parser)]
#[command(name = "proxy-harvester")]
#[command(about = "Harvest proxies from public proxy lists and keep the ones that work")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in proxy sources
    Sources,
    /// Crawl proxy sources and save the raw records
    Crawl {
        #[command(flatten)]
        sources: SourceArgs,
        /// Output file for crawled records (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate saved records and keep the working ones
    Validate {
        /// Input file with records (JSON)
        input: PathBuf,
        /// Output file for working records (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        check: CheckArgs,
    },
    /// Crawl, then validate, in one run
    Harvest {
        #[command(flatten)]
        sources: SourceArgs,
        /// Output file for working records (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        check: CheckArgs,
    },
    /// Convert a plain-text proxy list into the record format
    Import {
        /// Input file with one proxy per line
        input: PathBuf,
        /// Proxy type for lines without a scheme (http, https, socks4, socks5, socks)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
        /// Output file for records (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Source to crawl by name (can specify multiple)
    #[arg(short, long)]
    source: Vec<String>,
    /// Crawl every built-in source (default when no --source is given)
    #[arg(long)]
    all: bool,
    /// Timeout in seconds for page requests
    #[arg(long)]
    crawl_timeout: Option<u64>,
}

#[derive(Args)]
struct CheckArgs {
    /// Only check this proxy type (socks matches socks4 and socks5 too)
    #[arg(short = 't', long)]
    proxy_type: Option<String>,
    /// Maximum number of concurrent checks
    #[arg(short = 'n', long)]
    threads: Option<usize>,
    /// Timeout in seconds for each proxy check
    #[arg(long)]
    timeout: Option<u64>,
    /// URL to test proxies against
    #[arg(long)]
    test_url: Option<String>,
    /// MMDB file used to fill in proxy locations
    #[arg(long)]
    mmdb: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let app_config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Sources => {
            for source in builtin_sources() {
                println!("{}", source.name());
                for seed in source.seeds() {
                    println!("  {}", seed);
                }
            }
        }
        Commands::Crawl { sources, output } => {
            let proxies = crawl(&app_config, &sources).await?;
            println!("Crawled {} proxies", proxies.len());
            write_or_print(&proxies, output)?;
        }
        Commands::Validate {
            input,
            output,
            check,
        } => {
            let proxies = load_records(&input)?;
            println!("Loaded {} proxies from {:?}", proxies.len(), input);
            let good = validate(&app_config, &check, proxies).await?;
            write_or_print(&good, output)?;
        }
        Commands::Harvest {
            sources,
            output,
            check,
        } => {
            let proxies = crawl(&app_config, &sources).await?;
            println!("Crawled {} proxies", proxies.len());
            let good = validate(&app_config, &check, proxies).await?;
            write_or_print(&good, output)?;
        }
        Commands::Import {
            input,
            proxy_type,
            output,
        } => {
            let ptype: ProxyType = proxy_type.parse()?;
            let proxies: Vec<Proxy> = ProxyParser::parse_file(&input, ptype)?
                .into_iter()
                .map(|p| p.with_source(&input.to_string_lossy()))
                .collect();
            println!("Parsed {} proxies from {:?}", proxies.len(), input);
            write_or_print(&proxies, output)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "proxy_harvester=info,warn",
            1 => "proxy_harvester=debug,info",
            2 => "proxy_harvester=trace,debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn select_sources(args: &SourceArgs) -> Result<Vec<Box<dyn ProxySource>>> {
    if args.all || args.source.is_empty() {
        return Ok(builtin_sources());
    }
    args.source
        .iter()
        .map(|name| {
            source_by_name(name).ok_or_else(|| {
                anyhow!("Unknown source: {}. Run `proxy-harvester sources` to list them", name)
            })
        })
        .collect()
}

async fn crawl(app_config: &AppConfig, args: &SourceArgs) -> Result<Vec<Proxy>> {
    let sources = select_sources(args)?;
    let mut config = app_config.crawler_config();
    if let Some(secs) = args.crawl_timeout {
        config = config.with_timeout(timeout_from_secs("--crawl-timeout", secs)?);
    }

    let crawler = ProxyCrawler::with_config(config)?;
    let reports = crawler.crawl_with_reports(&sources).await?;
    for report in &reports {
        println!(
            "Found {} proxies from {} ({} pages, {} failed, {} bad status)",
            report.proxies.len(),
            report.source,
            report.pages_fetched,
            report.pages_failed,
            report.pages_bad_status
        );
    }
    Ok(reports.into_iter().flat_map(|r| r.proxies).collect())
}

/// A zero timeout would fail every request immediately
fn timeout_from_secs(flag: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(anyhow!("{} must be at least 1 second", flag));
    }
    Ok(Duration::from_secs(secs))
}

fn checker_config(app_config: &AppConfig, args: &CheckArgs) -> Result<CheckerConfig> {
    let mut config = app_config.checker_config();
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(anyhow!("--threads must be at least 1"));
        }
        config = config.with_concurrency(threads);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(timeout_from_secs("--timeout", secs)?);
    }
    if let Some(test_url) = &args.test_url {
        validate_test_url(test_url)?;
        config = config.with_test_url(test_url.clone());
    }
    if let Some(path) = &args.mmdb {
        config = config.with_mmdb_path(path.clone());
    }
    Ok(config)
}

async fn validate(
    app_config: &AppConfig,
    args: &CheckArgs,
    proxies: Vec<Proxy>,
) -> Result<Vec<Proxy>> {
    let proxies = match &args.proxy_type {
        Some(t) => filter_by_type(proxies, t.parse()?),
        None => proxies,
    };
    let config = checker_config(app_config, args)?;

    println!(
        "Checking {} proxies with {} threads, timeout: {}s",
        proxies.len(),
        config.concurrency,
        config.timeout.as_secs()
    );
    println!("Test URL: {}", config.test_url);

    let checker = ProxyChecker::with_config(config);
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let good = checker.validate_until(proxies, shutdown).await;

    println!("\nWorking proxies: {}", good.len());
    for proxy in &good {
        match &proxy.location {
            Some(location) => println!("  {} ({}ms, {})", proxy, proxy.speed, location),
            None => println!("  {} ({}ms)", proxy, proxy.speed),
        }
    }
    Ok(good)
}

fn write_or_print(proxies: &[Proxy], output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            save_records(proxies, &path)?;
            println!("Saved {} proxies to {:?}", proxies.len(), path);
        }
        None => {
            for proxy in proxies {
                println!("{}", proxy);
            }
        }
    }
    Ok(())
}
