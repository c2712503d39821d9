use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    logic::votes,
    model::api::{Success, VoteRequest},
    rate_limit::Throttle,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![submit_vote]
}

#[post("/votes", data = "<request>")]
async fn submit_vote(
    _throttle: Throttle,
    request: Json<VoteRequest>,
    db: Db,
) -> Result<Json<Success>> {
    votes::submit(&*db, &request, Utc::now()).await?;
    Ok(Json(Success::new()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::{
        error::ErrorBody,
        model::{
            api::RegisterRequest,
            db::NewPoll,
            mongodb::Id,
        },
        store::Db,
    };

    async fn poll_ending_in(db: &Db, ends_in: Duration) -> Id {
        let now = Utc::now();
        let poll = NewPoll::new(now.date_naive(), now + ends_in, now);
        db.insert_poll(&poll).await.unwrap().id
    }

    fn vote(poll_id: impl ToString, attending: bool) -> String {
        let credentials = RegisterRequest::example().credentials();
        json!({
            "pollId": poll_id.to_string(),
            "firstName": credentials.first_name,
            "lastName": credentials.last_name,
            "secret": credentials.secret,
            "rating": 8,
            "attending": attending,
        })
        .to_string()
    }

    #[backend_test(registered)]
    async fn vote_then_change_mind(client: Client, db: Db) {
        let poll_id = poll_ending_in(&db, Duration::hours(1)).await;

        for attending in [true, false, true] {
            let response = client
                .post("/api/v1/votes")
                .header(ContentType::JSON)
                .body(vote(poll_id, attending))
                .dispatch()
                .await;
            assert_eq!(Status::Ok, response.status());
            let body: Success = response.into_json().await.unwrap();
            assert!(body.success);
        }
        assert_eq!(db.attending_votes(poll_id).await.unwrap().len(), 1);
    }

    #[backend_test(registered)]
    async fn closed_poll_is_forbidden(client: Client, db: Db) {
        let poll_id = poll_ending_in(&db, Duration::minutes(-1)).await;
        let response = client
            .post("/api/v1/votes")
            .header(ContentType::JSON)
            .body(vote(poll_id, true))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "poll closed");
    }

    #[backend_test]
    async fn unregistered_voter_is_unauthorized(client: Client, db: Db) {
        let poll_id = poll_ending_in(&db, Duration::hours(1)).await;
        let response = client
            .post("/api/v1/votes")
            .header(ContentType::JSON)
            .body(vote(poll_id, true))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(registered)]
    async fn poll_ids_are_checked(client: Client) {
        let response = client
            .post("/api/v1/votes")
            .header(ContentType::JSON)
            .body(vote("12345", true))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post("/api/v1/votes")
            .header(ContentType::JSON)
            .body(vote(Id::new(), true))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
