//! Registration and authentication by name pair and secret.

use chrono::{DateTime, Utc};
use rocket::tokio::task::spawn_blocking;

use crate::error::{Error, Result};
use crate::model::{
    api::{Credentials, Profile, RegisterRequest},
    common::validate_skills,
    db::{hash_secret, NewUser, User},
};
use crate::store::Store;

/// Create the user, or update the position and skills of an existing one.
/// An existing user's secret is never replaced.
pub async fn register(
    store: &dyn Store,
    request: RegisterRequest,
    now: DateTime<Utc>,
) -> Result<()> {
    Credentials::from(&request).require_complete()?;
    let skills = validate_skills(&request.skills)?;
    let secret_hash = secret_hash_for(store, &request).await?;

    let user = NewUser::new(
        request.first_name,
        request.last_name,
        request.position,
        skills,
        secret_hash,
        now,
    );
    store.upsert_user(&user).await?;
    info!("Registered {} {}", user.first_name, user.last_name);
    Ok(())
}

/// The hash to store for a registration. A known user keeps their stored
/// hash; only a new user's secret is hashed, on the blocking pool.
async fn secret_hash_for(store: &dyn Store, request: &RegisterRequest) -> Result<String> {
    if let Some(user) = store
        .user_by_name(&request.first_name, &request.last_name)
        .await?
    {
        return Ok(user.user.secret_hash);
    }
    let secret = request.secret.clone();
    Ok(spawn_blocking(move || hash_secret(&secret)).await??)
}

/// Check the credentials and return the user's profile.
pub async fn login(store: &dyn Store, credentials: &Credentials) -> Result<Profile> {
    credentials.require_complete()?;
    let user = store
        .user_by_name(&credentials.first_name, &credentials.last_name)
        .await?
        .ok_or_else(|| Error::not_found("user"))?;
    if !user.verify_secret(&credentials.secret) {
        return Err(Error::forbidden("invalid secret"));
    }
    Ok(user.into())
}

/// Look up the user the credentials belong to. `None` if the user is
/// unknown or the secret is wrong.
pub async fn authenticate(store: &dyn Store, credentials: &Credentials) -> Result<Option<User>> {
    if credentials.require_complete().is_err() {
        return Ok(None);
    }
    Ok(store
        .user_by_name(&credentials.first_name, &credentials.last_name)
        .await?
        .filter(|user| user.verify_secret(&credentials.secret)))
}
