//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Field names are camelCase, matching documents written by earlier versions.

pub mod player;
pub mod poll;
pub mod teams;
pub mod user;
pub mod vote;

pub use player::{NewPlayer, Player, PlayerCore};
pub use poll::{NewPoll, Poll, PollCore};
pub use teams::{MoveError, NewPollTeams, PollTeams, PollTeamsCore, TeamPlayer};
pub use user::{hash_secret, NewUser, User, UserCore};
pub use vote::{NewVote, Vote, VoteCore};
