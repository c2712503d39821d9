//! Team generation and manual rebalancing.
//!
//! A poll moves from "no teams" to "teams generated" exactly once. After
//! that, the only change ever made to the split is moving a single player
//! from one roster to the other.

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::Team,
    db::{MoveError, NewPollTeams, Poll, PollTeamsCore},
    mongodb::Id,
};
use crate::store::{Store, TeamsInsert};

/// A poll along with its team split, if one has been generated.
#[derive(Debug, Clone)]
pub struct TeamSheet {
    pub poll: Poll,
    pub teams: Option<PollTeamsCore>,
}

/// A validated request to move a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMove {
    pub user_id: Id,
    pub from: Team,
    pub to: Team,
}

impl PlayerMove {
    /// Parse the raw request fields. Both teams must be `A` or `B` and differ.
    pub fn parse(user_id: &str, from: &str, to: &str) -> Result<Self> {
        let user_id = Id::parse_field(user_id, "user id")?;
        let parse_team = |raw: &str, field: &str| {
            raw.parse::<Team>()
                .map_err(|_| Error::bad_request(format!("{field} must be A or B")))
        };
        let from = parse_team(from, "fromTeam")?;
        let to = parse_team(to, "toTeam")?;
        if from == to {
            return Err(Error::bad_request(MoveError::SameTeam.to_string()));
        }
        Ok(Self { user_id, from, to })
    }
}

async fn poll(store: &dyn Store, poll_id: Id) -> Result<Poll> {
    store
        .poll_by_id(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll {poll_id}")))
}

/// Generate the poll's teams, or return the existing split untouched if
/// teams were already generated.
///
/// With no "yes" votes nothing is stored, so a later call can still
/// generate once votes arrive. Voters whose user record is gone are left out.
pub async fn generate(store: &dyn Store, poll_id: Id, now: DateTime<Utc>) -> Result<TeamSheet> {
    let poll = poll(store, poll_id).await?;

    if let Some(existing) = store.teams_for_poll(poll_id).await? {
        debug!("Teams for poll {poll_id} already generated");
        return Ok(TeamSheet {
            poll,
            teams: Some(existing.teams),
        });
    }

    let voter_ids = store
        .attending_votes(poll_id)
        .await?
        .into_iter()
        .map(|vote| vote.user_id)
        .collect::<Vec<_>>();
    if voter_ids.is_empty() {
        return Ok(TeamSheet { poll, teams: None });
    }

    let players = store
        .users_by_ids(&voter_ids)
        .await?
        .iter()
        .map(|user| user.snapshot())
        .collect::<Vec<_>>();
    if players.len() < voter_ids.len() {
        warn!(
            "Dropped {} voter(s) with no user record from poll {poll_id}",
            voter_ids.len() - players.len()
        );
    }

    // Millisecond precision, so the split reads back from MongoDB unchanged.
    let now = now.trunc_subsecs(3);
    let teams = NewPollTeams::generate(poll_id, players, &mut rand::thread_rng(), now);

    match store.insert_teams(&teams).await? {
        TeamsInsert::Inserted => {
            info!(
                "Generated teams for poll {poll_id}: {} vs {}",
                teams.team_a.len(),
                teams.team_b.len()
            );
            Ok(TeamSheet {
                poll,
                teams: Some(teams),
            })
        }
        TeamsInsert::AlreadyExists => {
            // A concurrent request won; its split is the only one.
            let existing = store.teams_for_poll(poll_id).await?.ok_or_else(|| {
                Error::Status(
                    rocket::http::Status::InternalServerError,
                    format!("Teams for poll {poll_id} vanished after insert conflict"),
                )
            })?;
            Ok(TeamSheet {
                poll,
                teams: Some(existing.teams),
            })
        }
    }
}

/// Read the poll's split without generating anything.
pub async fn get(store: &dyn Store, poll_id: Id) -> Result<TeamSheet> {
    let poll = poll(store, poll_id).await?;
    let teams = store.teams_for_poll(poll_id).await?.map(|t| t.teams);
    Ok(TeamSheet { poll, teams })
}

/// Move one player to the other team. Either both rosters are written or
/// neither is.
pub async fn move_player(
    store: &dyn Store,
    poll_id: Id,
    player_move: PlayerMove,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut teams = store
        .teams_for_poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Teams for poll {poll_id}")))?
        .teams;
    let seen_updated_at = teams.updated_at;
    // Every successful move must leave a new stamp behind, even within the same millisecond.
    let stamp = now
        .trunc_subsecs(3)
        .max(seen_updated_at + Duration::milliseconds(1));

    teams
        .move_player(player_move.user_id, player_move.from, player_move.to, stamp)
        .map_err(|err| match err {
            MoveError::SameTeam => Error::bad_request(err.to_string()),
            MoveError::NotInTeam => Error::conflict(err.to_string()),
        })?;

    if !store.replace_rosters(&teams, seen_updated_at).await? {
        return Err(Error::conflict("teams changed, reload and try again"));
    }
    info!(
        "Moved {} from team {} to team {} in poll {poll_id}",
        player_move.user_id, player_move.from, player_move.to
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono_tz::Tz;
    use rocket::http::Status;

    use super::*;
    use crate::logic::{identity, polls, votes};
    use crate::model::api::{CreatePollRequest, RegisterRequest, VoteRequest};
    use crate::store::MemoryStore;

    async fn open_poll(store: &MemoryStore) -> Id {
        let request = CreatePollRequest {
            poll_date: None,
            ends_at: Some((Utc::now() + Duration::hours(1)).to_rfc3339()),
        };
        polls::create(store, &request, &Tz::UTC, Utc::now())
            .await
            .unwrap()
            .id
    }

    async fn register_and_vote(
        store: &MemoryStore,
        poll_id: Id,
        registration: RegisterRequest,
        attending: bool,
    ) {
        let credentials = registration.credentials();
        identity::register(store, registration, Utc::now())
            .await
            .unwrap();
        let vote = VoteRequest {
            poll_id: poll_id.to_string(),
            credentials,
            rating: 6,
            attending,
        };
        votes::submit(store, &vote, Utc::now()).await.unwrap();
    }

    async fn user_id(store: &MemoryStore, registration: &RegisterRequest) -> Id {
        store
            .user_by_name(&registration.first_name, &registration.last_name)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[rocket::async_test]
    async fn two_yes_one_no() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        register_and_vote(&store, poll_id, RegisterRequest::example(), true).await;
        register_and_vote(&store, poll_id, RegisterRequest::example2(), true).await;
        register_and_vote(&store, poll_id, RegisterRequest::example3(), false).await;

        let sheet = generate(&store, poll_id, Utc::now()).await.unwrap();
        let teams = sheet.teams.unwrap();
        assert_eq!(teams.yes_count, 2);
        assert_eq!(teams.team_a.len(), 1);
        assert_eq!(teams.team_b.len(), 1);

        let no_voter = user_id(&store, &RegisterRequest::example3()).await;
        assert!(teams
            .team_a
            .iter()
            .chain(&teams.team_b)
            .all(|p| p.user_id != no_voter));
    }

    #[rocket::async_test]
    async fn generation_is_idempotent() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        for registration in [
            RegisterRequest::example(),
            RegisterRequest::example2(),
            RegisterRequest::example3(),
        ] {
            register_and_vote(&store, poll_id, registration, true).await;
        }

        let first = generate(&store, poll_id, Utc::now()).await.unwrap().teams;
        for _ in 0..10 {
            let again = generate(&store, poll_id, Utc::now()).await.unwrap().teams;
            assert_eq!(first, again);
        }
        assert_eq!(get(&store, poll_id).await.unwrap().teams, first);
    }

    #[rocket::async_test]
    async fn no_yes_votes_persists_nothing() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        register_and_vote(&store, poll_id, RegisterRequest::example(), false).await;

        let sheet = generate(&store, poll_id, Utc::now()).await.unwrap();
        assert!(sheet.teams.is_none());
        assert!(store.teams_for_poll(poll_id).await.unwrap().is_none());

        // A later "yes" still allows generation.
        register_and_vote(&store, poll_id, RegisterRequest::example2(), true).await;
        let sheet = generate(&store, poll_id, Utc::now()).await.unwrap();
        assert_eq!(sheet.teams.unwrap().yes_count, 1);
    }

    #[rocket::async_test]
    async fn unknown_voters_are_dropped() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        register_and_vote(&store, poll_id, RegisterRequest::example(), true).await;
        // A vote whose user record no longer exists.
        store
            .upsert_vote(&crate::model::db::NewVote::new(
                poll_id,
                Id::new(),
                5,
                true,
                Utc::now(),
            ))
            .await
            .unwrap();

        let teams = generate(&store, poll_id, Utc::now())
            .await
            .unwrap()
            .teams
            .unwrap();
        assert_eq!(teams.yes_count, 1);
        assert_eq!(teams.team_a.len() + teams.team_b.len(), 1);
    }

    #[rocket::async_test]
    async fn snapshots_ignore_later_profile_edits() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        register_and_vote(&store, poll_id, RegisterRequest::example(), true).await;
        generate(&store, poll_id, Utc::now()).await.unwrap();

        let mut edit = RegisterRequest::example();
        edit.position = "keeper".into();
        identity::register(&store, edit, Utc::now()).await.unwrap();

        let teams = get(&store, poll_id).await.unwrap().teams.unwrap();
        assert_eq!(teams.team_a[0].position, "forward");
    }

    #[rocket::async_test]
    async fn missing_poll_is_not_found() {
        let store = MemoryStore::new();
        let err = generate(&store, Id::new(), Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        let err = get(&store, Id::new()).await.unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn existing_split_is_never_regenerated() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        for registration in [RegisterRequest::example(), RegisterRequest::example2()] {
            register_and_vote(&store, poll_id, registration, true).await;
        }
        // Another request already stored a lopsided split.
        let users = store
            .users_by_ids(&[
                user_id(&store, &RegisterRequest::example()).await,
                user_id(&store, &RegisterRequest::example2()).await,
            ])
            .await
            .unwrap();
        let stamp = Utc::now().trunc_subsecs(3);
        let winner = PollTeamsCore {
            poll_id,
            team_a: users.iter().map(|u| u.snapshot()).collect(),
            team_b: Vec::new(),
            yes_count: 2,
            generated_at: stamp,
            updated_at: stamp,
        };
        store.insert_teams(&winner).await.unwrap();

        let teams = generate(&store, poll_id, Utc::now()).await.unwrap().teams;
        assert_eq!(teams, Some(winner));
    }

    #[rocket::async_test]
    async fn move_player_round_trip() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        for registration in [
            RegisterRequest::example(),
            RegisterRequest::example2(),
            RegisterRequest::example3(),
        ] {
            register_and_vote(&store, poll_id, registration, true).await;
        }
        let before = generate(&store, poll_id, Utc::now())
            .await
            .unwrap()
            .teams
            .unwrap();
        let mover = before.team_a[0].user_id;

        let player_move = PlayerMove::parse(&mover.to_string(), "A", "B").unwrap();
        move_player(&store, poll_id, player_move, Utc::now())
            .await
            .unwrap();

        let after = get(&store, poll_id).await.unwrap().teams.unwrap();
        let on_a: HashSet<Id> = after.team_a.iter().map(|p| p.user_id).collect();
        assert!(!on_a.contains(&mover));
        assert_eq!(after.team_b.last().map(|p| p.user_id), Some(mover));
        assert_eq!(after.team_a.len() + after.team_b.len(), 3);
        assert_eq!(after.yes_count, before.yes_count);
        assert_eq!(after.generated_at, before.generated_at);
    }

    #[rocket::async_test]
    async fn stale_move_is_a_conflict() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        for registration in [RegisterRequest::example(), RegisterRequest::example2()] {
            register_and_vote(&store, poll_id, registration, true).await;
        }
        let before = generate(&store, poll_id, Utc::now())
            .await
            .unwrap()
            .teams
            .unwrap();
        let on_b = before.team_b[0].user_id;

        // The client thinks the player is on A.
        let player_move = PlayerMove::parse(&on_b.to_string(), "A", "B").unwrap();
        let err = move_player(&store, poll_id, player_move, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(get(&store, poll_id).await.unwrap().teams.unwrap(), before);
    }

    #[rocket::async_test]
    async fn move_before_generation_is_not_found() {
        let store = MemoryStore::new();
        let poll_id = open_poll(&store).await;
        let player_move = PlayerMove::parse(&Id::new().to_string(), "A", "B").unwrap();
        let err = move_player(&store, poll_id, player_move, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
    }

    #[test]
    fn move_requests_are_validated() {
        let id = Id::new().to_string();
        assert!(PlayerMove::parse(&id, "A", "B").is_ok());
        assert!(PlayerMove::parse(&id, "B", "A").is_ok());
        for (user, from, to) in [
            (id.as_str(), "A", "A"),
            (id.as_str(), "A", "C"),
            (id.as_str(), "a", "B"),
            (id.as_str(), "", "B"),
            ("nope", "A", "B"),
        ] {
            let err = PlayerMove::parse(user, from, to).unwrap_err();
            assert_eq!(err.status(), Status::BadRequest);
        }
    }
}
