use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    player::{NewPlayer, Player},
    poll::{NewPoll, Poll},
    teams::{NewPollTeams, PollTeams},
    user::{NewUser, User},
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Poll collections
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}
impl MongoCollection for NewPoll {
    const NAME: &'static str = POLLS;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Team split collections
const TEAMS: &str = "teams";
impl MongoCollection for PollTeams {
    const NAME: &'static str = TEAMS;
}
impl MongoCollection for NewPollTeams {
    const NAME: &'static str = TEAMS;
}

// Player catalog collections
const PLAYERS: &str = "players";
impl MongoCollection for Player {
    const NAME: &'static str = PLAYERS;
}
impl MongoCollection for NewPlayer {
    const NAME: &'static str = PLAYERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes are what make registration, voting and team generation
/// safe against concurrent requests. This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One user per name pair.
    let user_index = IndexModel::builder()
        .keys(doc! {"firstName": 1, "lastName": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // One vote per user per poll.
    let vote_index = IndexModel::builder()
        .keys(doc! {"pollId": 1, "userId": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // One team split per poll.
    let teams_index = IndexModel::builder()
        .keys(doc! {"pollId": 1})
        .options(unique)
        .build();
    Coll::<PollTeams>::from_db(db)
        .create_index(teams_index, None)
        .await?;

    // Current poll lookup.
    let poll_index = IndexModel::builder()
        .keys(doc! {"status": 1, "endsAt": 1})
        .build();
    Coll::<Poll>::from_db(db)
        .create_index(poll_index, None)
        .await?;

    Ok(())
}
