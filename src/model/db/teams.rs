use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    common::{Skill, Team},
    mongodb::Id,
};

/// A copy of a user's profile taken when teams were generated.
/// Later profile edits do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPlayer {
    pub user_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("fromTeam and toTeam cannot be the same")]
    SameTeam,
    #[error("player not in source team")]
    NotInTeam,
}

/// Core team split data, as stored in the database. At most one exists per poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollTeamsCore {
    pub poll_id: Id,
    pub team_a: Vec<TeamPlayer>,
    pub team_b: Vec<TeamPlayer>,
    pub yes_count: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub generated_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PollTeamsCore {
    /// Shuffle the players uniformly, then deal them out alternately: even
    /// positions to team A, odd positions to team B.
    pub fn generate<R>(
        poll_id: Id,
        mut players: Vec<TeamPlayer>,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        players.shuffle(rng);
        let yes_count = u32::try_from(players.len()).unwrap_or(u32::MAX);

        let mut team_a = Vec::with_capacity(players.len() / 2 + 1);
        let mut team_b = Vec::with_capacity(players.len() / 2);
        for (i, player) in players.into_iter().enumerate() {
            if i % 2 == 0 {
                team_a.push(player);
            } else {
                team_b.push(player);
            }
        }

        Self {
            poll_id,
            team_a,
            team_b,
            yes_count,
            generated_at: now,
            updated_at: now,
        }
    }

    pub fn roster(&self, team: Team) -> &[TeamPlayer] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    fn roster_mut(&mut self, team: Team) -> &mut Vec<TeamPlayer> {
        match team {
            Team::A => &mut self.team_a,
            Team::B => &mut self.team_b,
        }
    }

    /// Move a player from one roster to the end of the other.
    /// On error, the rosters are left untouched.
    pub fn move_player(
        &mut self,
        user_id: Id,
        from: Team,
        to: Team,
        now: DateTime<Utc>,
    ) -> Result<(), MoveError> {
        if from == to {
            return Err(MoveError::SameTeam);
        }
        let source = self.roster_mut(from);
        let index = source
            .iter()
            .position(|player| player.user_id == user_id)
            .ok_or(MoveError::NotInTeam)?;
        let player = source.remove(index);
        self.roster_mut(to).push(player);
        self.updated_at = now;
        Ok(())
    }
}

/// A team split without an ID.
pub type NewPollTeams = PollTeamsCore;

/// A team split from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollTeams {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub teams: PollTeamsCore,
}

impl Deref for PollTeams {
    type Target = PollTeamsCore;

    fn deref(&self) -> &Self::Target {
        &self.teams
    }
}
