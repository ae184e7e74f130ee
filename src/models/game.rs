//! Composite game identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::AppError;

/// Season phase encoded in the second segment of a game ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeasonType {
    Preseason,
    RegularSeason,
    Postseason,
}

impl SeasonType {
    /// Resolve the numeric code used in game IDs.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Preseason),
            "2" => Some(Self::RegularSeason),
            "3" => Some(Self::Postseason),
            _ => None,
        }
    }

    /// Folder name used in the game data layout.
    pub fn folder(self) -> &'static str {
        match self {
            Self::Preseason => "preseason",
            Self::RegularSeason => "regular-season",
            Self::Postseason => "postseason",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// A parsed `YYYY_T_WW_TEAM1_TEAM2` game ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameId {
    raw: String,
    pub season: u16,
    pub season_type: SeasonType,
    pub week: u8,
    pub away_team: String,
    pub home_team: String,
}

fn game_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(\d{4})_(\d)_(\d{1,2})_([A-Za-z0-9]+)_([A-Za-z0-9]+)$").ok()
        })
        .as_ref()
}

impl GameId {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Week number padded to two digits, as used in storage paths.
    pub fn week_padded(&self) -> String {
        format!("{:02}", self.week)
    }

    /// Storage prefix of the game folder, relative to the bucket.
    pub fn base_path(&self, root: &str) -> String {
        format!(
            "{}/season_{}/{}/week_{}/{}",
            root.trim_end_matches('/'),
            self.season,
            self.season_type.folder(),
            self.week_padded(),
            self.raw
        )
    }
}

impl FromStr for GameId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || {
            AppError::InvalidIdentifierFormat(format!(
                "{raw}. Expected format: YYYY_T_WW_TEAM1_TEAM2"
            ))
        };

        let caps = game_id_pattern()
            .and_then(|re| re.captures(raw))
            .ok_or_else(invalid)?;
        let season = caps[1].parse().map_err(|_| invalid())?;
        let season_type = SeasonType::from_code(&caps[2]).ok_or_else(|| {
            AppError::InvalidIdentifierFormat(format!("Invalid season type code: {}", &caps[2]))
        })?;
        let week = caps[3].parse().map_err(|_| invalid())?;

        Ok(Self {
            raw: raw.to_string(),
            season,
            season_type,
            week,
            away_team: caps[4].to_string(),
            home_team: caps[5].to_string(),
        })
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_pattern_compiles() {
        let pattern = game_id_pattern().unwrap();
        assert!(pattern.is_match("2024_2_08_WSH_CHI"));
        assert!(std::ptr::eq(pattern, game_id_pattern().unwrap()));
    }

    #[test]
    fn test_parse_regular_season_game() {
        let id: GameId = "2024_2_08_WSH_CHI".parse().unwrap();
        assert_eq!(id.season, 2024);
        assert_eq!(id.season_type, SeasonType::RegularSeason);
        assert_eq!(id.week_padded(), "08");
        assert_eq!(id.away_team, "WSH");
        assert_eq!(id.home_team, "CHI");
        assert_eq!(
            id.base_path("nfl_espn_data"),
            "nfl_espn_data/season_2024/regular-season/week_08/2024_2_08_WSH_CHI"
        );
    }

    #[test]
    fn test_single_digit_week_is_padded() {
        let id: GameId = "2023_3_1_KC_SF".parse().unwrap();
        assert_eq!(id.season_type, SeasonType::Postseason);
        assert_eq!(id.week_padded(), "01");
        assert!(id.base_path("root/").contains("/week_01/"));
    }

    #[test]
    fn test_rejects_unknown_season_type() {
        let err = "2024_7_08_WSH_CHI".parse::<GameId>().unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentifierFormat(_)));
        assert!(err.to_string().contains("season type code: 7"));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for bad in ["", "2024_2_08", "24_2_08_WSH_CHI", "2024_2_08_WSH_CHI_X", "2024-2-08-WSH-CHI"] {
            assert!(
                matches!(bad.parse::<GameId>(), Err(AppError::InvalidIdentifierFormat(_))),
                "{bad} should be rejected"
            );
        }
    }
}
