//! Command-line entry point: crawl, search, list and serve.

mod app;
mod commands;
mod output;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::search::{SearchArgs, SortByArg, SortOrderArg};
use crate::output::{ListFormat, SearchFormat};

#[derive(Parser, Debug)]
#[command(name = "trawler", version)]
#[command(about = "A web crawler and full-text search engine")]
#[command(
    long_about = "Trawler crawls websites into a local full-text index and answers \
structured search queries (phrases, AND/NOT, fielded and fuzzy terms) against it."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a website into the index
    Crawl {
        /// Starting URL for crawling (required)
        #[arg(short = 'u', long)]
        url: String,

        /// Maximum crawl depth
        #[arg(short = 'd', long, default_value_t = 1)]
        depth: usize,

        /// Enable debug logging
        #[arg(short = 'v', long)]
        debug: bool,
    },

    /// Search indexed documents
    #[command(long_about = "Search through crawled and indexed documents.\n\n\
Examples:\n  \
trawler search -q \"rust programming\"          # phrase search\n  \
trawler search -q \"web AND crawler\"            # boolean AND\n  \
trawler search -q \"go NOT java\" --format json  # exclusion, JSON output\n  \
trawler search -q \"title:python\" --limit 20    # fielded search")]
    Search {
        /// Search query (required)
        #[arg(short = 'q', long)]
        query: String,

        /// Page number
        #[arg(short = 'p', long, default_value_t = 1)]
        page: usize,

        /// Results per page
        #[arg(short = 'l', long, default_value_t = 10)]
        limit: usize,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: SearchFormat,

        /// Sort results by
        #[arg(long = "sort-by", value_enum, default_value = "score")]
        sort_by: SortByArg,

        /// Sort order
        #[arg(long = "sort-order", value_enum, default_value = "desc")]
        sort_order: SortOrderArg,

        /// Enable debug logging
        #[arg(short = 'v', long)]
        debug: bool,
    },

    /// List all indexed documents
    List {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "table")]
        format: ListFormat,

        /// Enable debug logging
        #[arg(short = 'v', long)]
        debug: bool,
    },

    /// Start the metrics dashboard server
    Serve {
        /// Port to listen on
        #[arg(short = 'p', long, default_value_t = 8080)]
        port: u16,

        /// Enable debug logging
        #[arg(short = 'v', long)]
        debug: bool,
    },
}

impl Command {
    fn debug(&self) -> bool {
        match self {
            Command::Crawl { debug, .. }
            | Command::Search { debug, .. }
            | Command::List { debug, .. }
            | Command::Serve { debug, .. } => *debug,
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.debug());

    match cli.command {
        Command::Crawl { url, depth, .. } => commands::crawl::run(&url, depth).await,
        Command::Search {
            query,
            page,
            limit,
            format,
            sort_by,
            sort_order,
            ..
        } => {
            commands::search::run(SearchArgs {
                query,
                page,
                limit,
                format,
                sort_by,
                sort_order,
            })
            .await
        }
        Command::List { format, .. } => commands::list::run(format).await,
        Command::Serve { port, .. } => server::run(port).await,
    }
}
