use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use equitynav::metrics::investor_profile;
use equitynav::model::{OwnershipNode, NOT_AVAILABLE};
use equitynav::session::SessionState;
use equitynav::{
    AnalysisOutcome, Config, Direction, EquityNavError, Explorer, MetricKind, NeighborView,
    SearchOutcome,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "equitynav", version, about = "Navigate an ownership graph and its equity penetration")]
struct Cli {
    /// Config file (defaults to $EQUITYNAV_CONFIG, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Whole-graph statistics and rankings
    Stats,
    /// Search an entity by name; an exact match is opened
    Search { query: String },
    /// Show an entity with its normalized neighbors
    Node {
        id: String,
        /// List investees instead of investors
        #[arg(long)]
        investees: bool,
    },
    /// Equity penetration analysis for an entity
    Analyze {
        id: String,
        /// Only build the one-hop tree from the entity's loaded relationships
        #[arg(long)]
        local: bool,
    },
    /// Recenter hop by hop through the given ids, analysing each one
    Walk {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };

    // Initialize logger from RUST_LOG or the configured level; logs go to stderr
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.session.log_level),
    )
    .init();

    log::debug!("Graph service: {}", config.service.base_url);
    let explorer = Explorer::from_config(&config)?;

    match cli.command {
        Command::Stats => run_stats(&explorer, cli.json).await,
        Command::Search { query } => run_search(&explorer, &query, cli.json).await,
        Command::Node { id, investees } => {
            if investees {
                explorer.set_neighbor_view(NeighborView::Investees);
            }
            explorer.center_on(&id).await?;
            // Rankings only enrich the output; a stats outage is not fatal here
            if let Err(e) = explorer.load_graph_stats().await {
                log::warn!("{}", e);
            }
            print_context(&explorer, &explorer.snapshot(), cli.json)
        }
        Command::Analyze { id, local } => run_analyze(&explorer, &id, local, cli.json).await,
        Command::Walk { ids } => {
            for id in &ids {
                let outcome = explorer
                    .recenter(id)
                    .await
                    .with_context(|| format!("walk stopped at {}", id))?;
                if let AnalysisOutcome::Applied { .. } = outcome {
                    print_analysis(&explorer.snapshot(), cli.json)?;
                }
            }
            Ok(())
        }
    }
}

async fn run_stats(explorer: &Explorer, json: bool) -> Result<()> {
    let stats = explorer.load_graph_stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("\n╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║ Ownership Graph Statistics                                                   ║");
    println!("╚══════════════════════════════════════════════════════════════════════════════╝");
    println!("Nodes: {}", count_label(stats.node_count));
    println!("Edges: {}", count_label(stats.edge_count));

    for (title, list) in [
        ("Top PageRank", &stats.top_pagerank),
        ("Top degree centrality", &stats.top_degree_centrality),
    ] {
        println!("\n{}:", title);
        for entry in list.as_deref().unwrap_or_default() {
            println!(
                "  {:<40} {:<20} {:>10.6}",
                entry.name.as_deref().unwrap_or(NOT_AVAILABLE),
                entry.id,
                entry.score
            );
        }
    }

    for (title, list) in [
        ("Top in-degree", &stats.top_in_degree),
        ("Top out-degree", &stats.top_out_degree),
    ] {
        println!("\n{}:", title);
        for entry in list.as_deref().unwrap_or_default() {
            println!(
                "  {:<40} {:<20} {:>10}",
                entry.name.as_deref().unwrap_or(NOT_AVAILABLE),
                entry.id,
                entry.degree
            );
        }
    }

    if let Some(cycles) = &stats.cycles {
        println!("\nOwnership cycles:");
        for cycle in cycles {
            println!("  {}", cycle.join(" -> "));
        }
    }

    for error in [&stats.centrality_error, &stats.cycles_error].into_iter().flatten() {
        println!("\n⚠️  {}", error);
    }

    Ok(())
}

async fn run_search(explorer: &Explorer, query: &str, json: bool) -> Result<()> {
    match explorer.search_by_name(query).await {
        Ok(SearchOutcome::Exact(_)) => {
            if let Err(e) = explorer.load_graph_stats().await {
                log::warn!("{}", e);
            }
            print_context(explorer, &explorer.snapshot(), json)
        }
        Ok(SearchOutcome::Partial(hits)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
                return Ok(());
            }
            println!("No exact match for \"{}\"; candidates:\n", query);
            println!("{:<20} {:<40} {:<12} {:<8}", "ID", "Name", "Type", "Level");
            println!("{:-<80}", "");
            for hit in &hits {
                println!(
                    "{:<20} {:<40} {:<12} {:<8}",
                    hit.id,
                    hit.name,
                    hit.entity_type,
                    hit.level.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Ok(SearchOutcome::NotFound(message)) | Err(EquityNavError::SearchNotFound { message, .. }) => {
            println!("No entity matches \"{}\": {}", query, message);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_analyze(explorer: &Explorer, id: &str, local: bool, json: bool) -> Result<()> {
    if local {
        explorer.center_on(id).await?;
        for direction in [Direction::Upstream, Direction::Downstream] {
            if let Some(tree) = explorer.build_local_tree(direction) {
                if json {
                    println!("{}", serde_json::to_string_pretty(&tree)?);
                } else {
                    println!("\n{:?} (local, one hop):", direction);
                    print_rows(tree.first_level());
                }
            }
        }
        return Ok(());
    }

    match explorer.recenter(id).await? {
        AnalysisOutcome::Applied { .. } => print_analysis(&explorer.snapshot(), json),
        other => {
            log::warn!("Analysis for {} not applied: {:?}", id, other);
            Ok(())
        }
    }
}

fn print_context(explorer: &Explorer, state: &SessionState, json: bool) -> Result<()> {
    let context = state.context();
    let Some(entity) = context.centered() else {
        return Ok(());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "entity": entity,
                "profile": investor_profile(entity),
                "neighbors": context.neighbors(),
            }))?
        );
        return Ok(());
    }

    let profile = investor_profile(entity);
    println!("\n╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║ {:<76} ║", entity.name);
    println!("╚══════════════════════════════════════════════════════════════════════════════╝");
    println!("ID: {}", entity.id);
    println!("Type: {}", profile.entity_type);
    if !profile.level.is_empty() {
        println!("Level: {}", profile.level);
    }
    println!("Investors: {}  Investees: {}", profile.indegree, profile.outdegree);
    println!("PageRank: {}", metric_label(profile.pagerank));
    if let Some(rank) = explorer.lookup_ranked_metric(&entity.id, MetricKind::PageRank) {
        println!("  (top-ranked PageRank score {:.6})", rank);
    }
    println!("Degree centrality: {}", metric_label(profile.degree_centrality));
    println!("Betweenness centrality: {}", metric_label(profile.betweenness_centrality));

    let title = match context.view() {
        NeighborView::Investors => "Investors",
        NeighborView::Investees => "Investees",
    };
    println!("\n{}:", title);
    println!(
        "  {:<40} {:<10} {:>10} {:>10} {:>10} {:>5} {:>5}",
        "Name", "Percent", "PageRank", "Degree", "Between", "In", "Out"
    );
    println!("{:-<100}", "");
    for neighbor in context.neighbors() {
        let marker = if context.row_highlight_key(&neighbor.relationship) { ">" } else { " " };
        let m = &neighbor.metrics;
        println!(
            "{} {:<40} {:<10} {:>10} {:>10} {:>10} {:>5} {:>5}",
            marker,
            neighbor.relationship.display_name(),
            neighbor.relationship.percent_label(),
            metric_label(m.pagerank),
            metric_label(m.degree_centrality),
            metric_label(m.betweenness_centrality),
            m.indegree,
            m.outdegree
        );
    }

    Ok(())
}

fn print_analysis(state: &SessionState, json: bool) -> Result<()> {
    let analysis = state.analysis();

    if json {
        println!("{}", serde_json::to_string_pretty(analysis.result())?);
        return Ok(());
    }

    println!("\n╔══════════════════════════════════════════════════════════════════════════════╗");
    println!(
        "║ Equity penetration: {:<56} ║",
        analysis.anchor().unwrap_or(NOT_AVAILABLE)
    );
    println!("╚══════════════════════════════════════════════════════════════════════════════╝");

    println!("\nUpstream shareholders:");
    print_rows(analysis.upstream_rows());
    println!("\nDownstream holdings:");
    print_rows(analysis.downstream_rows());

    println!("\nDirect upstream shareholders (service cross-check):");
    if analysis.direct_shareholders().is_empty() {
        println!("  No direct upstream shareholder data returned.");
    }
    for row in analysis.direct_shareholders() {
        println!(
            "  {:<40} {:<12} {:>10}",
            row.name_label(),
            row.type_label(),
            row.percent_label()
        );
    }

    Ok(())
}

fn print_rows(rows: &[OwnershipNode]) {
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    for row in rows {
        let nested = if row.children.is_empty() {
            String::new()
        } else {
            format!("  [+{} more]", row.children.len())
        };
        println!(
            "  {:<40} {:<12} {:>10}{}",
            row.display_name(),
            row.entity_type,
            row.percent_label(),
            nested
        );
    }
}

fn metric_label(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.6}", v))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn count_label(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
