use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    common::PollStatus,
    db::{NewPlayer, NewPoll, NewPollTeams, NewUser, NewVote, Player, Poll, PollTeams, User, Vote},
    mongodb::Id,
};

use super::{Store, TeamsInsert};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    polls: Vec<Poll>,
    votes: Vec<Vote>,
    teams: Vec<PollTeams>,
    players: Vec<Player>,
}

/// An in-process store. Every operation holds a single lock, so each one is
/// atomic in the same way a single-document MongoDB write is.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        // No operation can panic half-way through a write, so a poisoned lock is still consistent.
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, user: &NewUser) -> Result<()> {
        let mut collections = self.lock();
        let existing = collections
            .users
            .iter_mut()
            .find(|u| u.first_name == user.first_name && u.last_name == user.last_name);
        match existing {
            Some(existing) => {
                existing.position = user.position.clone();
                existing.skills = user.skills.clone();
            }
            None => collections.users.push(User {
                id: Id::new(),
                user: user.clone(),
            }),
        }
        Ok(())
    }

    async fn user_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.first_name == first_name && u.last_name == last_name)
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_poll(&self, poll: &NewPoll) -> Result<Poll> {
        let poll = Poll {
            id: Id::new(),
            poll: poll.clone(),
        };
        self.lock().polls.push(poll.clone());
        Ok(poll)
    }

    async fn poll_by_id(&self, id: Id) -> Result<Option<Poll>> {
        Ok(self.lock().polls.iter().find(|p| p.id == id).cloned())
    }

    async fn current_poll(&self, now: DateTime<Utc>) -> Result<Option<Poll>> {
        Ok(self
            .lock()
            .polls
            .iter()
            .find(|p| p.status == PollStatus::Open && p.ends_at > now)
            .cloned())
    }

    async fn upsert_vote(&self, vote: &NewVote) -> Result<()> {
        let mut collections = self.lock();
        let existing = collections
            .votes
            .iter_mut()
            .find(|v| v.poll_id == vote.poll_id && v.user_id == vote.user_id);
        match existing {
            Some(existing) => {
                existing.vote.rating = vote.rating;
                existing.vote.attending = vote.attending;
                existing.vote.updated_at = vote.updated_at;
            }
            None => collections.votes.push(Vote {
                id: Id::new(),
                vote: vote.clone(),
            }),
        }
        Ok(())
    }

    async fn attending_votes(&self, poll_id: Id) -> Result<Vec<Vote>> {
        Ok(self
            .lock()
            .votes
            .iter()
            .filter(|v| v.poll_id == poll_id && v.attending)
            .cloned()
            .collect())
    }

    async fn teams_for_poll(&self, poll_id: Id) -> Result<Option<PollTeams>> {
        Ok(self
            .lock()
            .teams
            .iter()
            .find(|t| t.poll_id == poll_id)
            .cloned())
    }

    async fn insert_teams(&self, teams: &NewPollTeams) -> Result<TeamsInsert> {
        let mut collections = self.lock();
        if collections.teams.iter().any(|t| t.poll_id == teams.poll_id) {
            return Ok(TeamsInsert::AlreadyExists);
        }
        collections.teams.push(PollTeams {
            id: Id::new(),
            teams: teams.clone(),
        });
        Ok(TeamsInsert::Inserted)
    }

    async fn replace_rosters(
        &self,
        teams: &NewPollTeams,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut collections = self.lock();
        let existing = collections
            .teams
            .iter_mut()
            .find(|t| t.poll_id == teams.poll_id && t.updated_at == seen_updated_at);
        Ok(match existing {
            Some(existing) => {
                existing.teams.team_a = teams.team_a.clone();
                existing.teams.team_b = teams.team_b.clone();
                existing.teams.updated_at = teams.updated_at;
                true
            }
            None => false,
        })
    }

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player> {
        let player = Player {
            id: Id::new(),
            player: player.clone(),
        };
        self.lock().players.push(player.clone());
        Ok(player)
    }

    async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.lock().players.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::model::db::{PollTeamsCore, TeamPlayer, UserCore, VoteCore};

    #[rocket::async_test]
    async fn user_upsert_keeps_secret_and_creation_time() {
        let store = MemoryStore::new();
        let original = UserCore::example();
        store.upsert_user(&original).await.unwrap();

        let mut changed = original.clone();
        changed.position = "keeper".to_string();
        changed.secret_hash = "something else".to_string();
        changed.created_at = original.created_at + Duration::days(3);
        store.upsert_user(&changed).await.unwrap();

        let user = store
            .user_by_name(&original.first_name, &original.last_name)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.position, "keeper");
        assert_eq!(user.secret_hash, original.secret_hash);
        assert_eq!(user.created_at, original.created_at);
        assert_eq!(store.lock().users.len(), 1);
    }

    #[rocket::async_test]
    async fn vote_upsert_keeps_creation_time() {
        let store = MemoryStore::new();
        let (poll_id, user_id) = (Id::new(), Id::new());
        let first = Utc::now();
        store
            .upsert_vote(&VoteCore::new(poll_id, user_id, 5, true, first))
            .await
            .unwrap();
        let second = first + Duration::minutes(1);
        store
            .upsert_vote(&VoteCore::new(poll_id, user_id, 8, false, second))
            .await
            .unwrap();

        let votes = store.lock().votes.clone();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].rating, 8);
        assert!(!votes[0].attending);
        assert_eq!(votes[0].created_at, first);
        assert_eq!(votes[0].updated_at, second);
        assert!(store.attending_votes(poll_id).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn teams_insert_is_unique_per_poll() {
        let store = MemoryStore::new();
        let poll_id = Id::new();
        let mut rng = StdRng::seed_from_u64(9);
        let players = (0..4).map(TeamPlayer::example).collect::<Vec<_>>();
        let first = PollTeamsCore::generate(poll_id, players.clone(), &mut rng, Utc::now());
        let second = PollTeamsCore::generate(poll_id, players, &mut rng, Utc::now());

        assert_eq!(store.insert_teams(&first).await.unwrap(), TeamsInsert::Inserted);
        assert_eq!(
            store.insert_teams(&second).await.unwrap(),
            TeamsInsert::AlreadyExists
        );
        let stored = store.teams_for_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(stored.teams, first);
    }

    #[rocket::async_test]
    async fn stale_roster_replacement_is_refused() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(2);
        let generated = Utc::now();
        let players = (0..2).map(TeamPlayer::example).collect::<Vec<_>>();
        let teams = PollTeamsCore::generate(Id::new(), players, &mut rng, generated);
        store.insert_teams(&teams).await.unwrap();

        let mut moved = teams.clone();
        moved.updated_at = generated + Duration::seconds(1);
        assert!(!store
            .replace_rosters(&moved, generated - Duration::seconds(1))
            .await
            .unwrap());
        assert!(store.replace_rosters(&moved, generated).await.unwrap());
        assert!(!store.replace_rosters(&moved, generated).await.unwrap());
    }
}
