use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    common::{PollStatus, Skill},
    db::{Poll, PollTeamsCore, TeamPlayer},
};

/// An API-friendly team player snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPlayerDescription {
    pub user_id: ApiId,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub skills: Vec<Skill>,
}

impl From<TeamPlayer> for TeamPlayerDescription {
    fn from(player: TeamPlayer) -> Self {
        Self {
            user_id: player.user_id.into(),
            first_name: player.first_name,
            last_name: player.last_name,
            position: player.position,
            skills: player.skills,
        }
    }
}

/// A poll's team split together with the poll's metadata.
/// A poll without generated teams has a zero count and empty rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsDescription {
    pub yes_count: u32,
    pub team_a: Vec<TeamPlayerDescription>,
    pub team_b: Vec<TeamPlayerDescription>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generated_at: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    pub poll_date: NaiveDate,
    pub poll_ends_at: DateTime<FixedOffset>,
    pub poll_status: PollStatus,
}

impl TeamsDescription {
    pub fn new(poll: &Poll, teams: Option<PollTeamsCore>, zone: &Tz) -> Self {
        let (yes_count, team_a, team_b, generated_at, updated_at) = match teams {
            Some(teams) => (
                teams.yes_count,
                teams.team_a.into_iter().map(Into::into).collect(),
                teams.team_b.into_iter().map(Into::into).collect(),
                Some(teams.generated_at.with_timezone(zone).fixed_offset()),
                Some(teams.updated_at.with_timezone(zone).fixed_offset()),
            ),
            None => (0, Vec::new(), Vec::new(), None, None),
        };
        Self {
            yes_count,
            team_a,
            team_b,
            generated_at,
            updated_at,
            poll_date: poll.poll_date,
            poll_ends_at: poll.ends_at.with_timezone(zone).fixed_offset(),
            poll_status: poll.status,
        }
    }
}

/// A request to move one player to the other team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveRequest {
    pub user_id: String,
    /// `"A"` or `"B"`.
    pub from_team: String,
    /// `"A"` or `"B"`.
    pub to_team: String,
}
