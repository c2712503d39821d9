//! The attendance vote ledger.

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{Error, Result};
use crate::model::{api::VoteRequest, db::NewVote, mongodb::Id};
use crate::store::Store;

use super::identity::authenticate;

/// Record the voter's decision for the poll, overwriting any earlier one.
pub async fn submit(store: &dyn Store, request: &VoteRequest, now: DateTime<Utc>) -> Result<()> {
    let poll_id = Id::parse_field(&request.poll_id, "poll id")?;

    let user = authenticate(store, &request.credentials)
        .await?
        .ok_or_else(|| Error::unauthorized("invalid credentials"))?;

    let poll = store
        .poll_by_id(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll {poll_id}")))?;
    if !poll.accepts_votes_at(now) {
        return Err(Error::forbidden("poll closed"));
    }

    let vote = NewVote::new(
        poll_id,
        user.id,
        request.rating,
        request.attending,
        now.trunc_subsecs(3),
    );
    store.upsert_vote(&vote).await?;
    debug!(
        "{} {} voted {} on poll {poll_id}",
        user.first_name,
        user.last_name,
        if request.attending { "yes" } else { "no" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono_tz::Tz;
    use rocket::http::Status;

    use super::*;
    use crate::logic::{identity, polls};
    use crate::model::api::{CreatePollRequest, RegisterRequest};
    use crate::store::MemoryStore;

    async fn setup(ends_in: Duration) -> (MemoryStore, Id, RegisterRequest) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let registration = RegisterRequest::example();
        identity::register(&store, registration.clone(), now)
            .await
            .unwrap();
        let request = CreatePollRequest {
            poll_date: None,
            ends_at: Some((now + ends_in).to_rfc3339()),
        };
        let poll = polls::create(&store, &request, &Tz::UTC, now)
            .await
            .unwrap();
        (store, poll.id, registration)
    }

    fn vote(poll_id: Id, registration: &RegisterRequest, attending: bool) -> VoteRequest {
        VoteRequest {
            poll_id: poll_id.to_string(),
            credentials: registration.credentials(),
            rating: 7,
            attending,
        }
    }

    #[rocket::async_test]
    async fn revote_overwrites() {
        let (store, poll_id, registration) = setup(Duration::hours(1)).await;
        submit(&store, &vote(poll_id, &registration, true), Utc::now())
            .await
            .unwrap();
        assert_eq!(store.attending_votes(poll_id).await.unwrap().len(), 1);

        submit(&store, &vote(poll_id, &registration, false), Utc::now())
            .await
            .unwrap();
        assert!(store.attending_votes(poll_id).await.unwrap().is_empty());

        submit(&store, &vote(poll_id, &registration, true), Utc::now())
            .await
            .unwrap();
        assert_eq!(store.attending_votes(poll_id).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn expired_poll_is_forbidden() {
        let (store, poll_id, registration) = setup(Duration::minutes(-5)).await;
        let err = submit(&store, &vote(poll_id, &registration, true), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Forbidden);
        assert!(store.attending_votes(poll_id).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn deadline_is_checked_at_submission() {
        let (store, poll_id, registration) = setup(Duration::hours(1)).await;
        let late = Utc::now() + Duration::hours(2);
        let err = submit(&store, &vote(poll_id, &registration, true), late)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn bad_credentials_are_unauthorized() {
        let (store, poll_id, registration) = setup(Duration::hours(1)).await;
        let mut request = vote(poll_id, &registration, true);
        request.credentials.secret = "wrong".into();
        let err = submit(&store, &request, Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);

        let stranger = vote(poll_id, &RegisterRequest::example2(), true);
        let err = submit(&store, &stranger, Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn poll_id_must_be_valid() {
        let (store, _, registration) = setup(Duration::hours(1)).await;
        let mut request = vote(Id::new(), &registration, true);
        let err = submit(&store, &request, Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), Status::NotFound);

        request.poll_id = "not-an-id".into();
        let err = submit(&store, &request, Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
    }
}
