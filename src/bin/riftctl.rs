use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use riftstats::database_ops::aggregate::{Aggregator, BuildAggregateConfig};
use riftstats::util::db::Db;
use riftstats::database_ops::matches::{matches_per_patch, table_counts, PgMatchStore};
use riftstats::database_ops::query::{champion_stats, StatsFilter};
use riftstats::database_ops::tracked::{remove_tracked, upsert_tracked};
use riftstats::ingest::seeder::{BatchSeeder, SeedConfig};
use riftstats::ingest::{IngestConfig, MatchIngester};
use riftstats::normalization::RankBracket;
use riftstats::riot::{
    with_rate_limit_retry, Platform, RateLimitConfig, RateLimiter, RiotApi, RiotClient,
    RiotConfig, MAX_RATE_LIMIT_RETRIES,
};
use riftstats::util::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "riftctl", version, about = "riftstats admin CLI")]
struct Cli {
    /// Optional override for the database URL
    #[arg(long, global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Apply pending SQL migrations
    Migrate {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
    /// Crawl the ladder once and ingest recent matches
    Seed {
        /// Comma separated platforms (defaults to SEED_REGIONS)
        #[arg(long, value_delimiter = ',')]
        regions: Option<Vec<String>>,
        #[arg(long)]
        players_per_bucket: Option<usize>,
        #[arg(long)]
        matches_per_player: Option<u32>,
    },
    /// Recompute champion stats, and build stats with --builds
    Aggregate {
        #[arg(long, default_value_t = false)]
        builds: bool,
    },
    /// Ingest a single match by id, e.g. EUW1_6812345678
    IngestMatch {
        match_id: String,
        /// Rank bracket to file the match under
        #[arg(long, default_value = "emerald")]
        rank: String,
        /// Platform; derived from the match id prefix when omitted
        #[arg(long)]
        region: Option<String>,
    },
    /// Print table counts, or champion stats with --champions
    Stats {
        #[arg(long, default_value_t = false)]
        champions: bool,
        #[arg(long)]
        rank: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        patch: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Start (or with --remove stop) live tracking of a summoner
    Track {
        region: String,
        /// Riot ID as `name#tag`, or a raw puuid with --puuid
        riot_id: String,
        #[arg(long, default_value_t = false)]
        puuid: bool,
        #[arg(long, default_value_t = false)]
        remove: bool,
    },
}

fn parse_platform(raw: &str) -> Result<Platform> {
    Platform::parse(raw).ok_or_else(|| anyhow!("unknown region '{raw}'"))
}

fn riot_client() -> Result<Arc<RiotClient>> {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::from_env()));
    Ok(Arc::new(RiotClient::new(RiotConfig::from_env()?, limiter)?))
}

async fn connect(db_url: Option<String>) -> Result<Db> {
    let url = match db_url {
        Some(url) => url,
        None => env::db_url()?,
    };
    Db::connect_no_migrate(&url, env::env_parse("DB_MAX_CONNS", 5u32)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    riftstats::tracing::bootstrap("riftctl")?;
    let cli = Cli::parse();
    let db = connect(cli.db_url).await?;

    match cli.command {
        Commands::Migrate { dir } => {
            let applied = db.migrate(&dir).await?;
            info!(applied, dir = %dir.display(), "migrations complete");
        }
        Commands::Seed {
            regions,
            players_per_bucket,
            matches_per_player,
        } => {
            let mut cfg = SeedConfig::from_env();
            if let Some(regions) = regions {
                cfg.platforms = regions
                    .iter()
                    .map(|r| parse_platform(r))
                    .collect::<Result<_>>()?;
            }
            if let Some(n) = players_per_bucket {
                cfg.players_per_bucket = n;
            }
            if let Some(n) = matches_per_player {
                cfg.matches_per_player = n;
            }
            let seeder = BatchSeeder::new(
                riot_client()?,
                Arc::new(PgMatchStore::new(db.clone())),
                IngestConfig::from_env(),
                cfg,
            );
            let progress = seeder.run().await?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Commands::Aggregate { builds } => {
            let aggregator = Aggregator::new(db.clone(), BuildAggregateConfig::from_env());
            let stats = aggregator.run().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            if builds {
                let builds = aggregator.run_builds().await?;
                println!("{}", serde_json::to_string_pretty(&builds)?);
            }
        }
        Commands::IngestMatch {
            match_id,
            rank,
            region,
        } => {
            let platform = match region {
                Some(r) => parse_platform(&r)?,
                None => Platform::from_match_id(&match_id)
                    .ok_or_else(|| anyhow!("cannot derive region from '{match_id}'; pass --region"))?,
            };
            let bracket = RankBracket::normalize(&rank)
                .ok_or_else(|| anyhow!("unknown rank bracket '{rank}'"))?;
            let ingester = MatchIngester::new(
                riot_client()?,
                Arc::new(PgMatchStore::new(db.clone())),
                IngestConfig::from_env(),
            );
            let outcome = ingester.ingest(platform, &match_id, bracket).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Stats {
            champions,
            rank,
            role,
            patch,
            region,
            limit,
        } => {
            if champions {
                let filter = StatsFilter::from_params(
                    rank.as_deref(),
                    role.as_deref(),
                    patch.as_deref(),
                    region.as_deref(),
                    None,
                )
                .map_err(|e| anyhow!(e))?;
                let mut page = champion_stats(&db, &filter).await?;
                page.champions.truncate(limit);
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                for (table, n) in table_counts(&db).await? {
                    println!("{table:<28} {n:>10}");
                }
                println!();
                for (patch, n) in matches_per_patch(&db).await? {
                    println!("patch {patch:<10} {n:>10} matches");
                }
            }
        }
        Commands::Track {
            region,
            riot_id,
            puuid,
            remove,
        } => {
            let platform = parse_platform(&region)?;
            let (puuid, game_name, tag_line) = if puuid {
                (riot_id, None, None)
            } else {
                let Some((name, tag)) = riot_id.split_once('#') else {
                    bail!("expected a Riot ID like 'name#tag', got '{riot_id}'");
                };
                let riot = riot_client()?;
                let account = with_rate_limit_retry(riot.limiter(), MAX_RATE_LIMIT_RETRIES, || {
                    riot.account_by_riot_id(platform.regional(), name, tag)
                })
                .await
                .with_context(|| format!("resolving {riot_id}"))?;
                (account.puuid, Some(name.to_string()), Some(tag.to_string()))
            };

            if remove {
                let removed = remove_tracked(&db, &puuid).await?;
                info!(%puuid, removed, "tracking removed");
            } else {
                let row = upsert_tracked(
                    &db,
                    &puuid,
                    platform.as_str(),
                    game_name.as_deref(),
                    tag_line.as_deref(),
                )
                .await?;
                println!("{}", serde_json::to_string_pretty(&row)?);
            }
        }
    }
    Ok(())
}
