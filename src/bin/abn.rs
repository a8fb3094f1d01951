//! abn - business registry lookup CLI
//!
//! Search the registry, show one business, ask the AI search, or resolve a
//! results-page address.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing::info;

use abn_lookup::view::{ResultsDisplay, ResultsView, group_thousands, page_numbers};
use abn_lookup::{
    AbnLookup, AbnLookupBuilder, AbnStatus, ApiPayload, AustralianState, Business, Config,
    EntityType, SearchFilters, SearchResponse, SearchState, Technique, url_state,
};

/// ABN lookup CLI
#[derive(Parser)]
#[command(name = "abn")]
#[command(version = abn_lookup::PKG_VERSION)]
#[command(about = "Search the Australian Business Register")]
struct Args {
    /// Config file (default: ~/.config/abn-lookup/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long, env = "ABN_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search businesses
    Search {
        /// Free-text query (omit to list all businesses)
        query: Option<String>,
        /// State or territory code (e.g. NSW)
        #[arg(long)]
        state: Option<AustralianState>,
        /// Entity type code (e.g. PRV)
        #[arg(long)]
        entity_type: Option<EntityType>,
        /// ABN status code (ACT or CAN)
        #[arg(long)]
        abn_status: Option<AbnStatus>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = abn_lookup::types::DEFAULT_PAGE_SIZE)]
        limit: u32,
        /// Search technique (native or optimized)
        #[arg(long, default_value_t = Technique::Native)]
        technique: Technique,
    },

    /// Show one business by ABN
    Show {
        /// ABN (spaces allowed)
        abn: String,
    },

    /// Ask the AI search
    Ask {
        /// Question in plain language
        text: String,
    },

    /// Resolve a results-page query string
    Link {
        /// Query string, e.g. "q=bakery&state=NSW&page=3"
        query_string: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        // Commands that don't touch the network
        Command::Link { query_string } => print_link(&query_string),
        command => {
            let lookup = build_lookup(args.config.as_deref(), args.base_url)?;
            run(&lookup, command).await?;
        }
    }

    Ok(())
}

fn build_lookup(
    config_path: Option<&std::path::Path>,
    base_url: Option<String>,
) -> abn_lookup::Result<AbnLookup> {
    let config = Config::load(config_path)?.with_base_url_override(base_url);
    config.validate()?;
    AbnLookupBuilder::from_config(&config).build()
}

async fn run(lookup: &AbnLookup, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Search {
            query,
            state,
            entity_type,
            abn_status,
            page,
            limit,
            technique,
        } => {
            let mut filters = SearchFilters::new().technique(technique);
            filters.state = state;
            filters.entity_type = entity_type;
            filters.abn_status = abn_status;
            let search = SearchState::new()
                .with_query(query.unwrap_or_default())
                .with_filters(filters)
                .with_limit(limit)
                .with_page(page);
            run_search(lookup, &search).await?;
        }

        Command::Show { abn } => {
            let detail = lookup.business_once(&abn).await?;
            print_business(&detail.data);
        }

        Command::Ask { text } => {
            let response = lookup.ai_search_once(&text).await?;
            println!(
                "{}",
                abn_lookup::chat::assistant_reply(text.trim(), response.pagination.total)
            );
            print_rows(&response);
        }

        Command::Link { query_string } => print_link(&query_string),
    }
    Ok(())
}

async fn run_search(
    lookup: &AbnLookup,
    search: &SearchState,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", search.page_title());

    let subscription = lookup.search(search);
    let mut view: ResultsView<ApiPayload> = ResultsView::new();
    let mut updates = subscription.updates();
    while let Some(state) = updates.next().await {
        view.apply(&state);
        if !state.is_fetching {
            break;
        }
    }

    match view.display() {
        ResultsDisplay::Results { rows } => {
            let Some(response) = view.data().and_then(|p| p.as_search()) else {
                return Ok(());
            };
            info!(rows, total = response.pagination.total, "search complete");
            println!("{} results", group_thousands(response.pagination.total));
            if let Some(ms) = response.meta.as_ref().and_then(|m| m.total_time_ms) {
                println!("total time: {ms}ms");
            }
            print_rows(response);
            let bar: Vec<String> = page_numbers(
                response.pagination.page,
                response.pagination.total_pages,
            )
            .iter()
            .map(ToString::to_string)
            .collect();
            if !bar.is_empty() {
                println!("pages: {}", bar.join(" "));
            }
        }
        ResultsDisplay::Empty => println!("no businesses found"),
        ResultsDisplay::NotFound => println!("not found"),
        ResultsDisplay::Failed { message, retryable } => {
            let hint = if retryable { " (retry later)" } else { "" };
            return Err(format!("search failed: {message}{hint}").into());
        }
        ResultsDisplay::Idle | ResultsDisplay::Loading | ResultsDisplay::Refreshing => {
            return Err("search did not complete".into());
        }
    }
    Ok(())
}

fn print_rows(response: &SearchResponse) {
    for business in &response.data {
        println!(
            "{}  {:<4} {:<4} {}",
            business.abn,
            business.abn_status,
            business.state.as_deref().unwrap_or("-"),
            business.display_name()
        );
    }
}

fn print_business(business: &Business) {
    println!("ABN:         {}", business.abn);
    println!("name:        {}", business.display_name());
    println!(
        "status:      {}",
        business
            .status()
            .map(|s| s.label())
            .unwrap_or(business.abn_status.as_str())
    );
    println!("entity type: {}", business.entity_type_text);
    if let Some(state) = business.australian_state() {
        let postcode = business.postcode.as_deref().unwrap_or("");
        println!("location:    {} {postcode}", state.label());
    }
    if let Some(acn) = &business.acn {
        println!("ACN:         {acn}");
    }
    if let Some(gst) = &business.gst_status {
        println!("GST:         {gst}");
    }
    let names = business.names();
    if !names.is_empty() {
        println!("business names:");
        for name in names {
            println!("  {:<12} {}", name.name_type, name.name_text);
        }
    }
}

fn print_link(query_string: &str) {
    let state = url_state::decode(query_string);
    println!("address:   ?{}", url_state::encode(&state));
    println!("title:     {}", state.page_title());
    println!(
        "query:     {}",
        if state.query().is_empty() {
            "-"
        } else {
            state.query()
        }
    );
    for key in abn_lookup::FilterKey::ALL {
        println!(
            "{:<10} {}",
            format!("{key}:"),
            state.filters.get(*key).unwrap_or("-")
        );
    }
    println!(
        "page:      {} (limit {})",
        state.pagination.page(),
        state.pagination.limit()
    );
    println!("mode:      {}", state.mode);
}
