use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, to_bson, DateTime as BsonDateTime, Document},
    error::Error as DbError,
    options::{FindOptions, UpdateOptions},
    Database,
};
use rocket::{futures::TryStreamExt, tokio::time::timeout};

use crate::error::{Error, Result};
use crate::model::{
    common::PollStatus,
    db::{NewPlayer, NewPoll, NewPollTeams, NewUser, NewVote, Player, Poll, PollTeams, User, Vote},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{Store, TeamsInsert};

/// The MongoDB-backed store. Every call is bounded by `timeout`.
pub struct MongoStore {
    db: Database,
    timeout: Duration,
}

impl MongoStore {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    fn coll<T: crate::model::mongodb::MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// Run a database operation, giving up after the configured timeout.
    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, DbError>> + Send,
    {
        match timeout(self.timeout, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
        }
    }
}

fn name_filter(first_name: &str, last_name: &str) -> Document {
    doc! {
        "firstName": first_name,
        "lastName": last_name,
    }
}

fn vote_filter(poll_id: Id, user_id: Id) -> Document {
    doc! {
        "pollId": poll_id,
        "userId": user_id,
    }
}

fn current_poll_filter(now: DateTime<Utc>) -> Document {
    doc! {
        "status": PollStatus::Open,
        "endsAt": { "$gt": BsonDateTime::from_chrono(now) },
    }
}

fn upsert() -> UpdateOptions {
    UpdateOptions::builder().upsert(true).build()
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn upsert_user(&self, user: &NewUser) -> Result<()> {
        let update = doc! {
            "$setOnInsert": {
                "secretHash": &user.secret_hash,
                "createdAt": BsonDateTime::from_chrono(user.created_at),
            },
            "$set": {
                "position": &user.position,
                "skills": to_bson(&user.skills)?,
            },
        };
        let users = self.coll::<User>();
        self.bounded(users.update_one(
            name_filter(&user.first_name, &user.last_name),
            update,
            upsert(),
        ))
        .await?;
        Ok(())
    }

    async fn user_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<User>> {
        let users = self.coll::<User>();
        self.bounded(users.find_one(name_filter(first_name, last_name), None))
            .await
    }

    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>> {
        let users = self.coll::<User>();
        let ids: Vec<_> = ids.iter().copied().map(mongodb::bson::Bson::from).collect();
        let filter = doc! { "_id": { "$in": ids } };
        self.bounded(async move { users.find(filter, None).await?.try_collect().await })
            .await
    }

    async fn insert_poll(&self, poll: &NewPoll) -> Result<Poll> {
        let new_polls = self.coll::<NewPoll>();
        let inserted = self.bounded(new_polls.insert_one(poll, None)).await?;
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .unwrap() // Safe because the ID comes directly from the database.
            .into();
        Ok(Poll {
            id,
            poll: poll.clone(),
        })
    }

    async fn poll_by_id(&self, id: Id) -> Result<Option<Poll>> {
        let polls = self.coll::<Poll>();
        self.bounded(polls.find_one(id.as_doc(), None)).await
    }

    async fn current_poll(&self, now: DateTime<Utc>) -> Result<Option<Poll>> {
        let polls = self.coll::<Poll>();
        self.bounded(polls.find_one(current_poll_filter(now), None))
            .await
    }

    async fn upsert_vote(&self, vote: &NewVote) -> Result<()> {
        let update = doc! {
            "$setOnInsert": {
                "createdAt": BsonDateTime::from_chrono(vote.created_at),
            },
            "$set": {
                "rating": vote.rating,
                "attending": vote.attending,
                "updatedAt": BsonDateTime::from_chrono(vote.updated_at),
            },
        };
        let votes = self.coll::<Vote>();
        self.bounded(votes.update_one(vote_filter(vote.poll_id, vote.user_id), update, upsert()))
            .await?;
        Ok(())
    }

    async fn attending_votes(&self, poll_id: Id) -> Result<Vec<Vote>> {
        let votes = self.coll::<Vote>();
        let filter = doc! {
            "pollId": poll_id,
            "attending": true,
        };
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        self.bounded(async move { votes.find(filter, options).await?.try_collect().await })
            .await
    }

    async fn teams_for_poll(&self, poll_id: Id) -> Result<Option<PollTeams>> {
        let teams = self.coll::<PollTeams>();
        self.bounded(teams.find_one(doc! {"pollId": poll_id}, None))
            .await
    }

    async fn insert_teams(&self, teams: &NewPollTeams) -> Result<TeamsInsert> {
        let new_teams = self.coll::<NewPollTeams>();
        match self.bounded(new_teams.insert_one(teams, None)).await {
            Ok(_) => Ok(TeamsInsert::Inserted),
            // The unique index on `pollId` turned away a second split.
            Err(Error::Db(err)) if is_duplicate_key_error(&err) => Ok(TeamsInsert::AlreadyExists),
            Err(err) => Err(err),
        }
    }

    async fn replace_rosters(
        &self,
        teams: &NewPollTeams,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let filter = doc! {
            "pollId": teams.poll_id,
            "updatedAt": BsonDateTime::from_chrono(seen_updated_at),
        };
        let update = doc! {
            "$set": {
                "teamA": to_bson(&teams.team_a)?,
                "teamB": to_bson(&teams.team_b)?,
                "updatedAt": BsonDateTime::from_chrono(teams.updated_at),
            },
        };
        let all_teams = self.coll::<PollTeams>();
        let result = self
            .bounded(all_teams.update_one(filter, update, None))
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player> {
        let new_players = self.coll::<NewPlayer>();
        let inserted = self.bounded(new_players.insert_one(player, None)).await?;
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .unwrap() // Safe because the ID comes directly from the database.
            .into();
        Ok(Player {
            id,
            player: player.clone(),
        })
    }

    async fn players(&self) -> Result<Vec<Player>> {
        let players = self.coll::<Player>();
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        self.bounded(async move { players.find(None, options).await?.try_collect().await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn current_poll_filter_compares_deadline() {
        let now = Utc.with_ymd_and_hms(2025, 12, 10, 12, 0, 0).unwrap();
        let filter = current_poll_filter(now);
        assert_eq!(filter.get_str("status").unwrap(), "OPEN");
        let ends_at = filter.get_document("endsAt").unwrap();
        assert_eq!(
            ends_at.get_datetime("$gt").unwrap(),
            &BsonDateTime::from_chrono(now)
        );
    }

    #[test]
    fn vote_filter_keys_on_poll_and_user() {
        let (poll_id, user_id) = (Id::new(), Id::new());
        let filter = vote_filter(poll_id, user_id);
        assert_eq!(filter.get_object_id("pollId").unwrap(), *poll_id);
        assert_eq!(filter.get_object_id("userId").unwrap(), *user_id);
        assert_eq!(filter.len(), 2);
    }
}
