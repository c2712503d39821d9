//! The document store behind every component.
//!
//! Each method is one atomic operation on one collection. The invariants the
//! components rely on (one user per name pair, one vote per user per poll,
//! one team split per poll) are enforced here rather than by callers
//! checking first and writing second.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    db::{NewPlayer, NewPoll, NewPollTeams, NewUser, NewVote, Player, Poll, PollTeams, User, Vote},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// What happened to an attempt to create a poll's team split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamsInsert {
    Inserted,
    /// A split already exists for the poll; nothing was written.
    AlreadyExists,
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert the user if the name pair is new, storing the secret hash and
    /// creation time. If the pair exists, only position and skills change.
    async fn upsert_user(&self, user: &NewUser) -> Result<()>;

    async fn user_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<User>>;

    /// All users whose ID is in `ids`. Unknown IDs are skipped.
    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>>;

    async fn insert_poll(&self, poll: &NewPoll) -> Result<Poll>;

    async fn poll_by_id(&self, id: Id) -> Result<Option<Poll>>;

    /// A poll with status OPEN whose deadline is after `now`.
    async fn current_poll(&self, now: DateTime<Utc>) -> Result<Option<Poll>>;

    /// Insert or overwrite the vote keyed by `(poll_id, user_id)`. The
    /// creation time is only written on insert.
    async fn upsert_vote(&self, vote: &NewVote) -> Result<()>;

    /// Every vote on the poll with `attending = true`.
    async fn attending_votes(&self, poll_id: Id) -> Result<Vec<Vote>>;

    async fn teams_for_poll(&self, poll_id: Id) -> Result<Option<PollTeams>>;

    /// Create the poll's team split unless one already exists.
    async fn insert_teams(&self, teams: &NewPollTeams) -> Result<TeamsInsert>;

    /// Replace both rosters and `updated_at` of the poll's split, but only if
    /// its `updated_at` still equals `seen_updated_at`. Returns whether the
    /// write happened.
    async fn replace_rosters(
        &self,
        teams: &NewPollTeams,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player>;

    /// All catalog players in insertion order.
    async fn players(&self) -> Result<Vec<Player>>;
}

/// Shared handle on the store, kept in Rocket's managed state.
#[derive(Clone)]
pub struct Db(Arc<dyn Store>);

impl Db {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self(store)
    }
}

impl Deref for Db {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Db`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        request::Outcome::Success(db.inner().clone())
    }
}
