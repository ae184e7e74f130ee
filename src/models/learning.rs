//! Categories for query learnings written back to the knowledge base.

use serde::Serialize;

/// Folder a learning is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningCategory {
    PlayerQueries,
    TeamStats,
    CastingSolutions,
    FailedQueries,
    General,
}

impl LearningCategory {
    /// Parse a category name; anything unrecognised files under `General`.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("player_queries") => Self::PlayerQueries,
            Some("team_stats") => Self::TeamStats,
            Some("casting_solutions") => Self::CastingSolutions,
            Some("failed_queries") => Self::FailedQueries,
            _ => Self::General,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlayerQueries => "player_queries",
            Self::TeamStats => "team_stats",
            Self::CastingSolutions => "casting_solutions",
            Self::FailedQueries => "failed_queries",
            Self::General => "general",
        }
    }

    /// Storage folder relative to the learnings prefix.
    pub fn folder(self) -> &'static str {
        match self {
            Self::PlayerQueries => "query_patterns/successful_player_queries",
            Self::TeamStats => "query_patterns/team_stats_patterns",
            Self::CastingSolutions => "query_patterns/common_casting_solutions",
            Self::FailedQueries => "query_patterns/failed_queries_to_avoid",
            Self::General => "query_patterns/general_patterns",
        }
    }
}
