//! Tool catalog and typed operations.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::{
    GameDetailsArgs, GameListArgs, HeadToHeadArgs, QueryDatabaseArgs, RecentGamesArgs,
    ResolveTeamArgs, SearchKnowledgeArgs, WriteLearningArgs,
};

/// One gateway operation with its arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    QueryDatabase(QueryDatabaseArgs),
    GetGameDetails(GameDetailsArgs),
    SearchKnowledge(SearchKnowledgeArgs),
    WriteLearning(WriteLearningArgs),
    ResolveTeamName(ResolveTeamArgs),
    GetGameList(GameListArgs),
    GetHeadToHead(HeadToHeadArgs),
    GetRecentGames(RecentGamesArgs),
}

impl Operation {
    pub const NAMES: [&'static str; 8] = [
        "query_database",
        "get_game_details",
        "search_knowledge",
        "write_learning",
        "resolve_team_name",
        "get_game_list",
        "get_head_to_head",
        "get_recent_games",
    ];

    /// Decode an operation object such as `{"operation": "query_database", "sql": ...}`.
    pub fn from_value(value: Value) -> Result<Self> {
        let name = match value.get("operation") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => return Err(AppError::UnknownOperation(other.to_string())),
            None => return Err(AppError::UnknownOperation("<missing>".to_string())),
        };
        if !Self::NAMES.contains(&name.as_str()) {
            return Err(AppError::UnknownOperation(name));
        }

        serde_json::from_value(value)
            .map_err(|e| AppError::validation(format!("Invalid arguments for {name}: {e}")))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::QueryDatabase(_) => "query_database",
            Self::GetGameDetails(_) => "get_game_details",
            Self::SearchKnowledge(_) => "search_knowledge",
            Self::WriteLearning(_) => "write_learning",
            Self::ResolveTeamName(_) => "resolve_team_name",
            Self::GetGameList(_) => "get_game_list",
            Self::GetHeadToHead(_) => "get_head_to_head",
            Self::GetRecentGames(_) => "get_recent_games",
        }
    }

    /// The tool this operation is published under.
    pub fn tool(&self) -> Tool {
        match self {
            Self::QueryDatabase(_) => Tool::NflDataService,
            Self::GetGameDetails(_) => Tool::NflGameService,
            Self::SearchKnowledge(_) => Tool::NflKnowledgeService,
            Self::WriteLearning(_) => Tool::NflQueryLearningService,
            Self::ResolveTeamName(_)
            | Self::GetGameList(_)
            | Self::GetHeadToHead(_)
            | Self::GetRecentGames(_) => Tool::NflCatalogService,
        }
    }
}

/// Tools published by `tools/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    NflDataService,
    NflGameService,
    NflKnowledgeService,
    NflQueryLearningService,
    NflCatalogService,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::NflDataService,
        Tool::NflGameService,
        Tool::NflKnowledgeService,
        Tool::NflQueryLearningService,
        Tool::NflCatalogService,
    ];

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| AppError::UnknownTool(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NflDataService => "nfl_data_service",
            Self::NflGameService => "nfl_game_service",
            Self::NflKnowledgeService => "nfl_knowledge_service",
            Self::NflQueryLearningService => "nfl_query_learning_service",
            Self::NflCatalogService => "nfl_catalog_service",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NflDataService => {
                "Execute SQL queries against the NFL Athena database for statistical analysis"
            }
            Self::NflGameService => {
                "Retrieve complete game data including inputs and outputs for specific NFL games"
            }
            Self::NflKnowledgeService => {
                "Search NFL knowledge base for rules, historical facts, and contextual information"
            }
            Self::NflQueryLearningService => {
                "Write successful query patterns and learnings to S3 for knowledge base"
            }
            Self::NflCatalogService => {
                "Resolve team names to team IDs, list games by season, week, team or game ID, find head-to-head matchups and the recent games of both teams before a game"
            }
        }
    }

    pub fn operations(self) -> &'static [&'static str] {
        match self {
            Self::NflDataService => &["query_database"],
            Self::NflGameService => &["get_game_details"],
            Self::NflKnowledgeService => &["search_knowledge"],
            Self::NflQueryLearningService => &["write_learning"],
            Self::NflCatalogService => &[
                "resolve_team_name",
                "get_game_list",
                "get_head_to_head",
                "get_recent_games",
            ],
        }
    }

    /// JSON schema of the tool's arguments.
    pub fn input_schema(self) -> Value {
        let operation = json!({
            "type": "string",
            "enum": self.operations(),
            "description": "The operation to perform"
        });

        match self {
            Self::NflDataService => json!({
                "type": "object",
                "properties": {
                    "operation": operation,
                    "sql": {
                        "type": "string",
                        "description": "The SQL query to execute (SELECT statements only)"
                    },
                    "database": {
                        "type": "string",
                        "description": "The database name (default: nfl_stats_database)",
                        "default": "nfl_stats_database"
                    }
                },
                "required": ["operation", "sql"]
            }),
            Self::NflGameService => json!({
                "type": "object",
                "properties": {
                    "operation": operation,
                    "game_id": {
                        "type": "string",
                        "description": "The unique game ID (e.g., '2024_2_08_WSH_CHI')"
                    },
                    "include_inputs": {
                        "type": "boolean",
                        "description": "Whether to include input data files",
                        "default": true
                    },
                    "include_outputs": {
                        "type": "boolean",
                        "description": "Whether to include output data files",
                        "default": true
                    }
                },
                "required": ["operation", "game_id"]
            }),
            Self::NflKnowledgeService => json!({
                "type": "object",
                "properties": {
                    "operation": operation,
                    "query": {
                        "type": "string",
                        "description": "The search query to find relevant information"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return (1-20)",
                        "minimum": 1,
                        "maximum": 20
                    }
                },
                "required": ["operation", "query"]
            }),
            Self::NflQueryLearningService => json!({
                "type": "object",
                "properties": {
                    "operation": operation,
                    "category": {
                        "type": "string",
                        "description": "Category: player_queries, team_stats, casting_solutions, failed_queries, or general"
                    },
                    "filename": {
                        "type": "string",
                        "description": "Filename for the learning document (e.g., 'jayden_daniels_passing_pattern.md')"
                    },
                    "content": {
                        "type": "string",
                        "description": "Markdown content with query pattern, SQL, and learnings"
                    }
                },
                "required": ["operation", "filename", "content"]
            }),
            Self::NflCatalogService => json!({
                "type": "object",
                "properties": {
                    "operation": operation,
                    "team_name": {
                        "type": "string",
                        "description": "Team name, city, or abbreviation to resolve (resolve_team_name)"
                    },
                    "season": {
                        "type": "integer",
                        "description": "NFL season year, e.g. 2024 (get_game_list)"
                    },
                    "week": {
                        "type": "integer",
                        "description": "Week number, 1-18 regular season, 19+ playoffs (get_game_list)"
                    },
                    "team": {
                        "type": "string",
                        "description": "Team name, city, or abbreviation to filter by (get_game_list)"
                    },
                    "pbp_game_id": {
                        "type": "string",
                        "description": "Play-by-play game ID to filter by (get_game_list) or the selected game (get_recent_games)"
                    },
                    "team1": {
                        "type": "string",
                        "description": "First team name, city, or abbreviation (get_head_to_head)"
                    },
                    "team2": {
                        "type": "string",
                        "description": "Second team name, city, or abbreviation (get_head_to_head)"
                    },
                    "games_per_team": {
                        "type": "integer",
                        "description": "Recent games to return per team (get_recent_games, default 3)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum games to return (get_game_list, get_head_to_head; default 10)"
                    }
                },
                "required": ["operation"]
            }),
        }
    }

    /// Entry of the `tools/list` document.
    pub fn descriptor(self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// The `tools/list` response document.
pub fn tool_list() -> Value {
    json!({ "tools": Tool::ALL.iter().map(|t| t.descriptor()).collect::<Vec<_>>() })
}
