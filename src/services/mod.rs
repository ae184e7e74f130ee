//! Service layer behind the gateway operations.
//!
//! - Read-only SQL (`DataService`)
//! - Game files (`GameService`)
//! - Knowledge base search (`KnowledgeService`)
//! - Query learnings (`LearningService`)
//! - Team and schedule lookups (`CatalogService`)

mod catalog;
mod data;
mod game;
mod knowledge;
mod learning;

pub use catalog::{
    CatalogService, GameListArgs, GameListPayload, HeadToHeadArgs, HeadToHeadPayload,
    RecentGamesArgs, RecentGamesPayload, ResolveTeamArgs, TeamMatch, TeamRecentGames,
};
pub use data::{DataService, QueryDatabaseArgs, QueryPayload, render_report};
pub use game::{GameDetails, GameDetailsArgs, GameDetailsPayload, GameMetadata, GameService};
pub use knowledge::{KnowledgePayload, KnowledgeService, SearchKnowledgeArgs};
pub use learning::{LearningPayload, LearningService, WriteLearningArgs, learning_key};
