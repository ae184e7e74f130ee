//! NFL gateway CLI
//!
//! Local execution entry point. For AWS Lambda, use `nfl-gateway-lambda`.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nfl_gateway::{
    error::Result,
    gateway::{Gateway, GatewayResponse, Operation, sdk_config, tool_list},
    models::Config,
    services::{
        GameDetailsArgs, GameListArgs, HeadToHeadArgs, QueryDatabaseArgs, RecentGamesArgs,
        ResolveTeamArgs, SearchKnowledgeArgs, WriteLearningArgs, render_report,
    },
    storage::{LocalStore, ObjectStore},
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

/// NFL gateway - stats, game files and knowledge search for an AI agent
#[derive(Parser, Debug)]
#[command(name = "nfl-gateway", version, about = "NFL agent tool gateway")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// AWS profile to use
    #[arg(short, long)]
    profile: Option<String>,

    /// Serve game files, datasets and learnings from this directory instead of S3
    #[arg(long)]
    local: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a read-only SQL statement
    Query {
        sql: String,

        /// Database to run in
        #[arg(short, long)]
        database: Option<String>,

        /// Print the JSON payload instead of a text table
        #[arg(long)]
        json: bool,
    },

    /// Show the input and output files of a game
    Game {
        /// Game ID, e.g. 2024_2_08_WSH_CHI
        game_id: String,

        #[arg(long)]
        no_inputs: bool,

        #[arg(long)]
        no_outputs: bool,
    },

    /// Search the knowledge base
    Search {
        query: String,

        #[arg(short = 'n', long)]
        max_results: Option<u32>,
    },

    /// Write a query learning
    Learn {
        filename: String,

        /// Markdown file with the learning content
        content: PathBuf,

        #[arg(long)]
        category: Option<String>,
    },

    /// Resolve a team name to its team ID
    Team { name: String },

    /// List games matching filters
    Games {
        #[arg(long)]
        season: Option<u16>,

        #[arg(long)]
        week: Option<u8>,

        #[arg(long)]
        team: Option<String>,

        #[arg(long)]
        game_id: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Games between two teams, most recent first
    H2h {
        team1: String,
        team2: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Each team's last games before a selected game
    Recent {
        game_id: String,

        #[arg(short = 'n', long)]
        games_per_team: Option<usize>,
    },

    /// Print the tool catalog
    Tools,

    /// Handle a raw gateway event read from a file or stdin
    Invoke { event: Option<PathBuf> },

    /// Validate configuration
    Validate,

    /// Interactive session: SQL or raw events, `quit` to leave
    Shell,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Print a response; returns whether it succeeded.
fn print_response(response: &GatewayResponse) -> bool {
    let text = response.text().unwrap_or_else(|| response.body.clone());
    if response.is_success() {
        println!("{text}");
    } else {
        eprintln!("Error ({}): {}", response.status_code, text);
    }
    response.is_success()
}

async fn run_sql(gateway: &Gateway, sql: &str, database: Option<&str>) {
    match gateway.data().run(sql, database).await {
        Ok(result) => println!("{}", render_report(&result)),
        Err(e) => eprintln!("Error: {e}"),
    }
}

async fn shell(gateway: &Gateway) -> Result<()> {
    println!("NFL gateway shell. Enter SQL or a JSON event; 'quit' to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("nfl> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" | "q" => break,
            _ if line.starts_with('{') => match serde_json::from_str::<Value>(line) {
                Ok(event) => {
                    print_response(&gateway.handle(event).await);
                }
                Err(e) => eprintln!("Invalid JSON: {e}"),
            },
            sql => run_sql(gateway, sql, None).await,
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn read_event(path: Option<PathBuf>) -> Result<Value> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = cli.config.as_deref().map(Config::load);
    let level = match &loaded {
        Some(Ok(config)) => config.logging.level.clone(),
        _ => "info".to_string(),
    };
    init_logging(cli.verbose, &level);

    let mut config = match loaded {
        Some(Ok(config)) => {
            log::info!("Loaded configuration from {:?}", cli.config);
            config
        }
        Some(Err(e)) => {
            log::warn!("Config load failed from {:?}: {}. Using defaults.", cli.config, e);
            Config::default()
        }
        None => Config::default(),
    };

    let connect = |config: Config| {
        let profile = cli.profile.clone();
        let local = cli.local.clone();
        async move {
            let sdk = sdk_config(profile.as_deref()).await;
            let store = local.map(|dir| {
                log::info!("Using local store at {}", dir.display());
                Arc::new(LocalStore::new(dir)) as Arc<dyn ObjectStore>
            });
            Gateway::connect(&sdk, config, store).map(|(gateway, _)| gateway)
        }
    };

    let operation = match cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            config.apply_env();
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK: database={}, bucket={}",
                config.query.database,
                config.storage.bucket
            );
            return Ok(ExitCode::SUCCESS);
        }
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&tool_list())?);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Invoke { event } => {
            let event = read_event(event).await?;
            let response = connect(config).await?.handle(event).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(exit_code(response.is_success()));
        }
        Command::Shell => {
            shell(&connect(config).await?).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Query {
            sql,
            database,
            json,
        } => {
            if !json {
                let gateway = connect(config).await?;
                let result = gateway.data().run(&sql, database.as_deref()).await?;
                println!("{}", render_report(&result));
                return Ok(ExitCode::SUCCESS);
            }
            Operation::QueryDatabase(QueryDatabaseArgs { sql, database })
        }
        Command::Game {
            game_id,
            no_inputs,
            no_outputs,
        } => Operation::GetGameDetails(GameDetailsArgs {
            game_id,
            include_inputs: !no_inputs,
            include_outputs: !no_outputs,
        }),
        Command::Search { query, max_results } => {
            Operation::SearchKnowledge(SearchKnowledgeArgs { query, max_results })
        }
        Command::Learn {
            filename,
            content,
            category,
        } => Operation::WriteLearning(WriteLearningArgs {
            category,
            filename,
            content: tokio::fs::read_to_string(&content).await?,
        }),
        Command::Team { name } => Operation::ResolveTeamName(ResolveTeamArgs { team_name: name }),
        Command::Games {
            season,
            week,
            team,
            game_id,
            limit,
        } => Operation::GetGameList(GameListArgs {
            season,
            week,
            team,
            pbp_game_id: game_id,
            limit,
        }),
        Command::H2h {
            team1,
            team2,
            limit,
        } => Operation::GetHeadToHead(HeadToHeadArgs {
            team1,
            team2,
            limit,
        }),
        Command::Recent {
            game_id,
            games_per_team,
        } => Operation::GetRecentGames(RecentGamesArgs {
            pbp_game_id: game_id,
            games_per_team,
        }),
    };

    let gateway = connect(config).await?;
    let response = match gateway.dispatch(operation).await {
        Ok(payload) => GatewayResponse::content(&payload),
        Err(e) => GatewayResponse::error(&e),
    };
    Ok(exit_code(print_response(&response)))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
