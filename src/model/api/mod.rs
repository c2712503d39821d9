//! API-friendly request and response types.

mod id;
pub mod player;
pub mod poll;
pub mod teams;
pub mod user;
pub mod vote;

pub use id::ApiId;
pub use player::{PlayerDescription, PlayerSpec};
pub use poll::{CreatePollRequest, PollDescription};
pub use teams::{MoveRequest, TeamPlayerDescription, TeamsDescription};
pub use user::{Credentials, Profile, RegisterRequest, Success};
pub use vote::VoteRequest;
