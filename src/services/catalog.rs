// src/services/catalog.rs

//! Team and schedule lookups over the CSV reference datasets.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::StorageConfig;
use crate::storage::ObjectStore;

const DEFAULT_GAME_LIMIT: usize = 10;

const DEFAULT_GAMES_PER_TEAM: usize = 3;

/// Date columns of the game list, in order of preference.
const DATE_COLUMNS: [&str; 2] = ["game_date", "date"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

const TEAM_COLUMNS: [&str; 6] = [
    "home_team",
    "away_team",
    "home_team_city",
    "away_team_city",
    "home_team_abbrv",
    "away_team_abbrv",
];

/// Arguments of the `resolve_team_name` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveTeamArgs {
    #[serde(default)]
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMatch {
    pub success: bool,
    pub input: String,
    pub team_id: String,

    /// Space-separated name variants of the matched team
    pub variants: String,
}

/// Arguments of the `get_game_list` operation. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GameListArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u8>,

    /// Team name, city or abbreviation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbp_game_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameListPayload {
    pub success: bool,
    pub message: String,
    pub total: usize,
    pub returned: usize,
    pub filters: GameListArgs,
    pub games: Vec<Map<String, Value>>,
}

/// Arguments of the `get_head_to_head` operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadToHeadArgs {
    #[serde(default)]
    pub team1: String,

    #[serde(default)]
    pub team2: String,

    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadToHeadPayload {
    pub success: bool,
    pub message: String,
    pub team1: String,
    pub team2: String,
    pub total: usize,
    pub returned: usize,
    pub games: Vec<Map<String, Value>>,
}

/// Arguments of the `get_recent_games` operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentGamesArgs {
    #[serde(default)]
    pub pbp_game_id: String,

    #[serde(default)]
    pub games_per_team: Option<usize>,
}

/// Games a team played before the selected game, most recent first.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRecentGames {
    pub team: String,
    pub games: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentGamesPayload {
    pub success: bool,
    pub message: String,
    pub pbp_game_id: String,
    pub game_date: String,
    pub games_per_team: usize,
    pub home: TeamRecentGames,
    pub away: TeamRecentGames,
}

/// A CSV dataset held in memory.
struct Table {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);
        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of the team name columns present in the dataset.
    fn team_columns(&self) -> Result<Vec<usize>> {
        let cols: Vec<usize> = TEAM_COLUMNS.iter().filter_map(|c| self.column(c)).collect();
        if cols.is_empty() {
            return Err(AppError::upstream(
                "game list",
                format!(
                    "no team columns found; available columns: {}",
                    self.headers.iter().collect::<Vec<_>>().join(", ")
                ),
            ));
        }
        Ok(cols)
    }

    fn date_column(&self) -> Option<usize> {
        DATE_COLUMNS.iter().find_map(|c| self.column(c))
    }

    fn to_object(&self, record: &StringRecord) -> Map<String, Value> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = record
                    .get(i)
                    .filter(|cell| !cell.is_empty())
                    .map_or(Value::Null, |cell| Value::String(cell.to_string()));
                (header.to_string(), value)
            })
            .collect()
    }
}

/// Whether any of `cols` contains `needle` (already lower-cased).
fn mentions(record: &StringRecord, cols: &[usize], needle: &str) -> bool {
    cols.iter().any(|&c| {
        record
            .get(c)
            .is_some_and(|cell| cell.to_lowercase().contains(needle))
    })
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    // Timestamps keep only their date part.
    let day = cell.split(['T', ' ']).next().unwrap_or(cell);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Service behind the catalog operations: team resolution, game lists,
/// head-to-head matchups and recent form.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    async fn load_table(&self, key: &str) -> Result<Table> {
        let bytes = self.store.get_bytes(key).await?.ok_or_else(|| {
            AppError::config(format!("Dataset not found: {}", self.store.location(key)))
        })?;
        Table::parse(&bytes)
    }

    pub async fn resolve_team_name(&self, args: ResolveTeamArgs) -> Result<TeamMatch> {
        let input = args.team_name.trim();
        if input.is_empty() {
            return Err(AppError::validation("Team name is required"));
        }

        let table = self.load_table(&self.config.team_map_key).await?;
        let (Some(id_col), Some(names_col)) = (table.column("team_id"), table.column("team_names"))
        else {
            return Err(AppError::upstream(
                "team map",
                "expected team_id and team_names columns",
            ));
        };

        let needle = input.to_lowercase();
        let teams: Vec<(&str, &str, String)> = table
            .records
            .iter()
            .map(|r| {
                let names = r.get(names_col).unwrap_or_default();
                (r.get(id_col).unwrap_or_default(), names, names.to_lowercase())
            })
            .collect();

        let exact = |lower: &str| lower.split_whitespace().any(|v| v == needle);
        let overlap = |lower: &str| {
            lower
                .split_whitespace()
                .any(|v| v.contains(needle.as_str()) || needle.contains(v))
        };
        let substring = |lower: &str| lower.contains(needle.as_str());

        let found = teams
            .iter()
            .find(|t| exact(t.2.as_str()))
            .or_else(|| teams.iter().find(|t| overlap(t.2.as_str())))
            .or_else(|| teams.iter().find(|t| substring(t.2.as_str())));

        match found {
            Some((team_id, variants, _)) => {
                log::debug!("Resolved team '{}' to {}", input, team_id);
                Ok(TeamMatch {
                    success: true,
                    input: input.to_string(),
                    team_id: team_id.to_string(),
                    variants: variants.to_string(),
                })
            }
            None => Err(AppError::not_found(format!(
                "No team matches '{input}'. Try a city, nickname or abbreviation (e.g. 'Patriots', 'New England', 'NE')"
            ))),
        }
    }

    pub async fn get_game_list(&self, args: GameListArgs) -> Result<GameListPayload> {
        let table = self.load_table(&self.config.game_list_key).await?;
        let mut rows: Vec<&StringRecord> = table.records.iter().collect();

        if let Some(season) = args.season {
            let col = required_column(&table, "season")?;
            rows.retain(|r| r.get(col) == Some(season.to_string().as_str()));
        }
        if let Some(week) = args.week {
            let col = required_column(&table, "week")?;
            rows.retain(|r| r.get(col) == Some(week.to_string().as_str()));
        }
        if let Some(team) = args.team.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let cols = table.team_columns()?;
            let needle = team.to_lowercase();
            rows.retain(|r| mentions(r, &cols, &needle));
        }
        if let Some(id) = args.pbp_game_id.as_deref().map(str::trim) {
            let col = required_column(&table, "pbp_game_id")?;
            rows.retain(|r| r.get(col) == Some(id));
        }

        let total = rows.len();
        let limit = args.limit.unwrap_or(DEFAULT_GAME_LIMIT);
        let games: Vec<_> = rows.iter().take(limit).map(|r| table.to_object(r)).collect();
        let message = match total {
            0 => "No games found matching the specified criteria.".to_string(),
            n if n > games.len() => format!(
                "Found {n} game(s). Showing first {}; use more specific filters to narrow results.",
                games.len()
            ),
            n => format!("Found {n} game(s)."),
        };

        Ok(GameListPayload {
            success: true,
            message,
            total,
            returned: games.len(),
            filters: args,
            games,
        })
    }

    /// Games where both teams appear, in either home/away order, most
    /// recent first when the dataset has a date column.
    pub async fn get_head_to_head(&self, args: HeadToHeadArgs) -> Result<HeadToHeadPayload> {
        let team1 = args.team1.trim();
        let team2 = args.team2.trim();
        if team1.is_empty() || team2.is_empty() {
            return Err(AppError::validation("Both team1 and team2 are required"));
        }

        let table = self.load_table(&self.config.game_list_key).await?;
        let cols = table.team_columns()?;
        let (needle1, needle2) = (team1.to_lowercase(), team2.to_lowercase());
        let mut rows: Vec<&StringRecord> = table
            .records
            .iter()
            .filter(|r| mentions(r, &cols, &needle1) && mentions(r, &cols, &needle2))
            .collect();

        if let Some(col) = table.date_column() {
            rows.sort_by_key(|r| Reverse(r.get(col).and_then(parse_date)));
        }

        let total = rows.len();
        let limit = args.limit.unwrap_or(DEFAULT_GAME_LIMIT);
        let games: Vec<_> = rows.iter().take(limit).map(|r| table.to_object(r)).collect();
        let message = match games.len() {
            0 => format!("No head-to-head matchups found between {team1} and {team2}."),
            n => format!("Found {n} head-to-head matchup(s) between {team1} and {team2}."),
        };
        log::debug!("{} of {} matchups returned", games.len(), total);

        Ok(HeadToHeadPayload {
            success: true,
            message,
            team1: team1.to_string(),
            team2: team2.to_string(),
            total,
            returned: games.len(),
            games,
        })
    }

    /// The last games each team of the selected game played before it.
    pub async fn get_recent_games(&self, args: RecentGamesArgs) -> Result<RecentGamesPayload> {
        let game_id = args.pbp_game_id.trim();
        if game_id.is_empty() {
            return Err(AppError::validation("pbp_game_id is required"));
        }
        let per_team = args.games_per_team.unwrap_or(DEFAULT_GAMES_PER_TEAM);

        let table = self.load_table(&self.config.game_list_key).await?;
        let id_col = required_column(&table, "pbp_game_id")?;
        let home_col = required_column(&table, "home_team")?;
        let away_col = required_column(&table, "away_team")?;
        let date_col = table
            .date_column()
            .ok_or_else(|| AppError::upstream("game list", "game_date column not found"))?;

        let selected = table
            .records
            .iter()
            .find(|r| r.get(id_col) == Some(game_id))
            .ok_or_else(|| AppError::not_found(format!("Selected game with ID {game_id} not found")))?;

        let home = selected.get(home_col).unwrap_or_default();
        let away = selected.get(away_col).unwrap_or_default();
        if home.is_empty() || away.is_empty() {
            return Err(AppError::upstream(
                "game list",
                format!("could not identify home and away teams of {game_id}"),
            ));
        }
        let raw_date = selected.get(date_col).unwrap_or_default();
        let before = parse_date(raw_date).ok_or_else(|| {
            AppError::upstream("game list", format!("could not parse game date '{raw_date}'"))
        })?;

        let recent = |team: &str| {
            let mut games: Vec<(NaiveDate, &StringRecord)> = table
                .records
                .iter()
                .filter(|r| r.get(home_col) == Some(team) || r.get(away_col) == Some(team))
                .filter_map(|r| r.get(date_col).and_then(parse_date).map(|d| (d, r)))
                .filter(|(date, _)| *date < before)
                .collect();
            games.sort_by_key(|(date, _)| Reverse(*date));
            TeamRecentGames {
                team: team.to_string(),
                games: games
                    .into_iter()
                    .take(per_team)
                    .map(|(_, r)| table.to_object(r))
                    .collect(),
            }
        };
        let (home, away) = (recent(home), recent(away));

        Ok(RecentGamesPayload {
            success: true,
            message: format!(
                "Recent games before {game_id} ({} vs {}): {} for {}, {} for {}",
                home.team,
                away.team,
                home.games.len(),
                home.team,
                away.games.len(),
                away.team
            ),
            pbp_game_id: game_id.to_string(),
            game_date: before.to_string(),
            games_per_team: per_team,
            home,
            away,
        })
    }
}

fn required_column(table: &Table, name: &str) -> Result<usize> {
    table
        .column(name)
        .ok_or_else(|| AppError::upstream("game list", format!("{name} column not found")))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::LocalStore;

    const TEAM_MAP: &str = "team_id,team_names\n\
        KC,kansas city chiefs kc\n\
        NE,new england patriots ne pats\n\
        NYG,new york giants nyg\n\
        NYJ,new york jets nyj\n";

    const GAME_LIST: &str = "pbp_game_id,season,week,home_team,away_team,home_team_abbrv,away_team_abbrv\n\
        2024_01_BAL_KC,2024,1,Chiefs,Ravens,KC,BAL\n\
        2024_02_KC_CIN,2024,2,Bengals,Chiefs,CIN,KC\n\
        2024_02_NE_SEA,2024,2,Patriots,Seahawks,NE,SEA\n\
        2023_01_DET_KC,2023,1,Chiefs,Lions,KC,DET\n";

    async fn service(team_map: &str, game_list: &str) -> (TempDir, CatalogService) {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let config = StorageConfig::default();
        store
            .put_bytes(&config.team_map_key, team_map.as_bytes().to_vec(), "text/csv")
            .await
            .unwrap();
        store
            .put_bytes(&config.game_list_key, game_list.as_bytes().to_vec(), "text/csv")
            .await
            .unwrap();
        (tmp, CatalogService::new(Arc::new(store), config))
    }

    const SEASON: &str = "pbp_game_id,season,week,game_date,home_team,away_team,home_team_abbrv,away_team_abbrv\n\
        2024_01_BAL_KC,2024,1,2024-09-05,Chiefs,Ravens,KC,BAL\n\
        2024_02_KC_CIN,2024,2,2024-09-15,Bengals,Chiefs,CIN,KC\n\
        2024_03_ATL_KC,2024,3,2024-09-22,Falcons,Chiefs,ATL,KC\n\
        2024_04_LAC_KC,2024,4,2024-09-29,Chiefs,Chargers,KC,LAC\n\
        2024_03_BAL_DAL,2024,3,2024-09-22,Cowboys,Ravens,DAL,BAL\n\
        2024_04_BUF_BAL,2024,4,2024-09-29,Ravens,Bills,BAL,BUF\n\
        2024_20_BAL_KC,2024,20,2025-01-26,Ravens,Chiefs,BAL,KC\n\
        2023_20_KC_BAL,2023,20,2024-01-28,Ravens,Chiefs,BAL,KC\n";

    async fn resolve(service: &CatalogService, name: &str) -> Result<TeamMatch> {
        service
            .resolve_team_name(ResolveTeamArgs {
                team_name: name.into(),
            })
            .await
    }

    #[tokio::test]
    async fn test_resolve_team_variants() {
        let (_tmp, service) = service(TEAM_MAP, GAME_LIST).await;

        assert_eq!(resolve(&service, "Patriots").await.unwrap().team_id, "NE");
        assert_eq!(resolve(&service, " KC ").await.unwrap().team_id, "KC");
        assert_eq!(resolve(&service, "jets").await.unwrap().team_id, "NYJ");
        // Exact variant wins over an earlier containment hit.
        assert_eq!(resolve(&service, "nyg").await.unwrap().team_id, "NYG");
        assert_eq!(
            resolve(&service, "New England").await.unwrap().variants,
            "new england patriots ne pats"
        );
    }

    #[tokio::test]
    async fn test_resolve_team_misses() {
        let (_tmp, service) = service(TEAM_MAP, GAME_LIST).await;

        let err = resolve(&service, "Sharks").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status_code(), 400);

        let err = resolve(&service, "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_game_list_filters() {
        let (_tmp, service) = service(TEAM_MAP, GAME_LIST).await;

        let payload = service
            .get_game_list(GameListArgs {
                season: Some(2024),
                team: Some("kc".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(payload.total, 2);
        assert_eq!(payload.games[0]["pbp_game_id"], "2024_01_BAL_KC");
        assert_eq!(payload.games[1]["pbp_game_id"], "2024_02_KC_CIN");

        let payload = service
            .get_game_list(GameListArgs {
                week: Some(2),
                team: Some("patriots".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(payload.total, 1);
        assert_eq!(payload.games[0]["away_team"], "Seahawks");
    }

    #[tokio::test]
    async fn test_game_list_limit_and_column_order() {
        let (_tmp, service) = service(TEAM_MAP, GAME_LIST).await;

        let payload = service
            .get_game_list(GameListArgs {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(payload.total, 4);
        assert_eq!(payload.returned, 1);
        let keys: Vec<&String> = payload.games[0].keys().collect();
        assert_eq!(keys[0], "pbp_game_id");
        assert_eq!(keys[2], "week");
    }

    #[tokio::test]
    async fn test_game_list_missing_column_or_dataset() {
        let (_tmp, service) = service(TEAM_MAP, "pbp_game_id,season\nx,2024\n").await;
        let err = service
            .get_game_list(GameListArgs {
                team: Some("KC".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));

        let tmp = TempDir::new().unwrap();
        let empty = CatalogService::new(
            Arc::new(LocalStore::new(tmp.path())),
            StorageConfig::default(),
        );
        let err = empty.get_game_list(GameListArgs::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_head_to_head_either_order() {
        let (_tmp, service) = service(TEAM_MAP, SEASON).await;

        let payload = service
            .get_head_to_head(HeadToHeadArgs {
                team1: "Ravens".into(),
                team2: "kc".into(),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(payload.total, 3);
        let ids: Vec<&Value> = payload.games.iter().map(|g| &g["pbp_game_id"]).collect();
        assert_eq!(ids, ["2024_20_BAL_KC", "2024_01_BAL_KC", "2023_20_KC_BAL"]);

        let payload = service
            .get_head_to_head(HeadToHeadArgs {
                team1: "Chiefs".into(),
                team2: "Ravens".into(),
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!((payload.total, payload.returned), (3, 1));
        assert_eq!(payload.games[0]["game_date"], "2025-01-26");
    }

    #[tokio::test]
    async fn test_head_to_head_requires_both_teams() {
        let (_tmp, service) = service(TEAM_MAP, SEASON).await;

        let err = service
            .get_head_to_head(HeadToHeadArgs {
                team1: "Chiefs".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let payload = service
            .get_head_to_head(HeadToHeadArgs {
                team1: "Cowboys".into(),
                team2: "Bills".into(),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(payload.total, 0);
        assert!(payload.message.starts_with("No head-to-head"));
    }

    #[tokio::test]
    async fn test_recent_games_before_selected_game() {
        let (_tmp, service) = service(TEAM_MAP, SEASON).await;

        let payload = service
            .get_recent_games(RecentGamesArgs {
                pbp_game_id: "2024_20_BAL_KC".into(),
                games_per_team: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(payload.game_date, "2025-01-26");
        assert_eq!(payload.home.team, "Ravens");
        let home: Vec<&Value> = payload.home.games.iter().map(|g| &g["pbp_game_id"]).collect();
        assert_eq!(home, ["2024_04_BUF_BAL", "2024_03_BAL_DAL"]);
        assert_eq!(payload.away.team, "Chiefs");
        let away: Vec<&Value> = payload.away.games.iter().map(|g| &g["pbp_game_id"]).collect();
        assert_eq!(away, ["2024_04_LAC_KC", "2024_03_ATL_KC"]);
    }

    #[tokio::test]
    async fn test_recent_games_only_counts_earlier_dates() {
        let (_tmp, service) = service(TEAM_MAP, SEASON).await;

        let payload = service
            .get_recent_games(RecentGamesArgs {
                pbp_game_id: "2024_01_BAL_KC".into(),
                games_per_team: None,
            })
            .await
            .unwrap();
        assert_eq!(payload.games_per_team, 3);
        let home: Vec<&Value> = payload.home.games.iter().map(|g| &g["pbp_game_id"]).collect();
        assert_eq!(home, ["2023_20_KC_BAL"]);
        assert_eq!(payload.away.games.len(), 1);

        let err = service
            .get_recent_games(RecentGamesArgs {
                pbp_game_id: "1999_01_X_Y".into(),
                games_per_team: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // GAME_LIST has no date column.
        let (_tmp2, undated) = self::service(TEAM_MAP, GAME_LIST).await;
        let err = undated
            .get_recent_games(RecentGamesArgs {
                pbp_game_id: "2024_01_BAL_KC".into(),
                games_per_team: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[test]
    fn test_parse_date_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 5);
        assert_eq!(parse_date("2024-09-05"), day);
        assert_eq!(parse_date("09/05/2024"), day);
        assert_eq!(parse_date("2024-09-05 20:20:00"), day);
        assert_eq!(parse_date("TBD"), None);
    }
}
