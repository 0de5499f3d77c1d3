//! pixcache - command-line front end for the tiered image cache
//!
//! Fetches, prefetches and inspects cached images. Results are printed as JSON.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use pixcache::cache::{combined_size, DiskStore, EvictionPolicy};
use pixcache::{CacheConfig, ImageCache, SizeBudget, StorageLocation, TargetSize};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Fetch one image through the cache
    Fetch {
        url: String,
        location: StorageLocation,
        size: Option<TargetSize>,
        out: Option<PathBuf>,
    },
    /// Warm a tier for several images
    Prefetch {
        urls: Vec<String>,
        location: StorageLocation,
        size: Option<TargetSize>,
    },
    /// Report the owned files in a cache directory
    Usage { directory: Option<PathBuf> },
    /// Apply a budget to a cache directory
    Evict {
        directory: PathBuf,
        budget: SizeBudget,
        policy: EvictionPolicy,
    },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"pixcache - Tiered image cache

USAGE:
    pixcache fetch <url> [--disk [DIR]] [--size WxH] [--budget SIZE] [--out FILE]
    pixcache prefetch <url>... [--disk [DIR]] [--size WxH]
    pixcache usage [DIR]
    pixcache evict <DIR> <SIZE> [--all]
    pixcache help

COMMANDS:
    fetch     Fetch an image, serving it from cache when possible
    prefetch  Populate the cache for several images concurrently
    usage     List cached files and their combined size
    evict     Delete the oldest cached file if DIR exceeds SIZE
              (--all keeps deleting until DIR is within SIZE)
    help      Show this help message

OPTIONS:
    --disk [DIR]    Use the disk tier (default directory unless DIR given)
    --size WxH      Fit the image inside W x H pixels
    --budget SIZE   Disk budget for this request, e.g. 500KB, 10MB, 1GB
    --out FILE      Save the decoded image; format follows the extension

EXAMPLES:
    pixcache fetch https://example.com/cat.png --disk --size 128x128
    pixcache prefetch https://example.com/a.png https://example.com/b.png
    pixcache evict ~/.cache/pixcache 50MB --all

ENVIRONMENT:
    PIXCACHE_DIR                   Default disk directory
    PIXCACHE_MEMORY_CAPACITY       Decoded images kept in memory
    PIXCACHE_DISK_BUDGET           Default disk budget
    PIXCACHE_EVICTION              oldest | until-under-budget
    PIXCACHE_PREFETCH_CONCURRENCY  Cap on in-flight prefetches
    PIXCACHE_TIMEOUT_SECS          HTTP request timeout
    RUST_LOG                       Log level (trace, debug, info, warn, error)
"#
    );
}

/// Options shared by fetch and prefetch
#[derive(Default)]
struct RequestOptions {
    positional: Vec<String>,
    disk: Option<Option<PathBuf>>,
    size: Option<TargetSize>,
    budget: Option<SizeBudget>,
    out: Option<PathBuf>,
}

impl RequestOptions {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = RequestOptions::default();
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--disk" => {
                    let dir = iter
                        .next_if(|next| !next.starts_with("--"))
                        .map(PathBuf::from);
                    options.disk = Some(dir);
                }
                "--size" => {
                    let raw = iter.next().ok_or_else(|| anyhow!("--size needs WxH"))?;
                    options.size = Some(raw.parse::<TargetSize>().map_err(|e| anyhow!("{}", e))?);
                }
                "--budget" => {
                    let raw = iter.next().ok_or_else(|| anyhow!("--budget needs a size"))?;
                    options.budget = Some(raw.parse::<SizeBudget>().map_err(|e| anyhow!("{}", e))?);
                }
                "--out" => {
                    let raw = iter.next().ok_or_else(|| anyhow!("--out needs a file"))?;
                    options.out = Some(PathBuf::from(raw));
                }
                flag if flag.starts_with("--") => return Err(anyhow!("Unknown option: {}", flag)),
                _ => options.positional.push(arg.clone()),
            }
        }

        Ok(options)
    }

    fn location(&self) -> StorageLocation {
        match &self.disk {
            None => StorageLocation::Memory,
            Some(dir) => {
                let location = match dir {
                    Some(dir) => StorageLocation::disk_in(dir),
                    None => StorageLocation::disk(),
                };
                match self.budget {
                    Some(budget) => location.with_budget(budget),
                    None => location,
                }
            }
        }
    }
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "fetch" => {
            let options = RequestOptions::parse(&args[2..])?;
            let url = match options.positional.as_slice() {
                [url] => url.clone(),
                _ => return Err(anyhow!("Usage: pixcache fetch <url> [options]")),
            };
            Ok(Command::Fetch {
                url,
                location: options.location(),
                size: options.size,
                out: options.out.clone(),
            })
        }
        "prefetch" => {
            let options = RequestOptions::parse(&args[2..])?;
            if options.positional.is_empty() {
                return Err(anyhow!("Usage: pixcache prefetch <url>... [options]"));
            }
            Ok(Command::Prefetch {
                location: options.location(),
                size: options.size,
                urls: options.positional,
            })
        }
        "usage" => Ok(Command::Usage {
            directory: args.get(2).map(PathBuf::from),
        }),
        "evict" => {
            if args.len() < 4 {
                return Err(anyhow!("Usage: pixcache evict <DIR> <SIZE> [--all]"));
            }
            let budget = args[3].parse::<SizeBudget>().map_err(|e| anyhow!("{}", e))?;
            let policy = if args[4..].iter().any(|a| a == "--all") {
                EvictionPolicy::UntilUnderBudget
            } else {
                EvictionPolicy::SingleOldest
            };
            Ok(Command::Evict {
                directory: PathBuf::from(&args[2]),
                budget,
                policy,
            })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            Ok(Command::Help)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let config = CacheConfig::from_env();

    match command {
        Command::Fetch {
            url,
            location,
            size,
            out,
        } => {
            let cache = ImageCache::new(config)?;
            let fetched = match cache.fetch_image(&url, &location, size).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    error!(url = %url, error = %e, "Fetch failed");
                    return Err(e.into());
                }
            };

            if let Some(out) = &out {
                let image = fetched
                    .image
                    .as_ref()
                    .ok_or_else(|| anyhow!("{} is not a decodable image", url))?;
                image
                    .save(out)
                    .with_context(|| format!("Failed to save image to {}", out.display()))?;
                info!(file = %out.display(), "Image saved");
            }

            let output = json!({
                "key": fetched.key,
                "origin": fetched.origin,
                "dimensions": fetched.dimensions(),
                "filePath": fetched.file_path,
                "saved": out,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Prefetch {
            urls,
            location,
            size,
        } => {
            let cache = ImageCache::new(config)?;
            let summary = cache.prefetch_into(&urls, &location, size).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            cache.log_metrics();
        }
        Command::Usage { directory } => {
            let directory = directory.unwrap_or(config.directory);
            let store = DiskStore::open(&directory)
                .with_context(|| format!("Failed to open {}", directory.display()))?;
            let mut files = store.list_owned()?;
            files.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.file_name.cmp(&b.file_name)));

            let output = json!({
                "directory": store.dir(),
                "fileCount": files.len(),
                "totalBytes": combined_size(&files),
                "files": files,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Evict {
            directory,
            budget,
            policy,
        } => {
            let store = DiskStore::open(&directory)
                .with_context(|| format!("Failed to open {}", directory.display()))?;
            let evicted = store.enforce_budget(budget, policy);
            let remaining = store.list_owned()?;

            let output = json!({
                "directory": store.dir(),
                "budget": budget.to_string(),
                "policy": policy,
                "evicted": evicted,
                "remainingBytes": combined_size(&remaining),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Help => {
            print_help();
        }
    }

    Ok(())
}
