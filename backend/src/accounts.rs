use crate::auth::{AuthError, AuthProvider};
use crate::dbs::{Database, DbError};
use crate::error::ArenaResult;
use shared::models::{AuthUser, Profile, SignedIn, UpdateProfileRequest};
use std::sync::Arc;
use uuid::Uuid;

/// Authentication plus the profile bookkeeping that rides along with it.
pub struct Accounts {
    auth: Arc<dyn AuthProvider>,
    db: Arc<dyn Database>,
}

impl Accounts {
    pub fn new(auth: Arc<dyn AuthProvider>, db: Arc<dyn Database>) -> Self {
        Self { auth, db }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ArenaResult<SignedIn> {
        let session = self.auth.sign_in(email, password).await?;
        let profile = self.profile_after_auth(&session.user).await;
        Ok(SignedIn {
            user: session.user.clone(),
            session: Some(session),
            profile,
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> ArenaResult<SignedIn> {
        let outcome = self.auth.sign_up(email, password, username).await?;
        let profile = self.profile_after_auth(&outcome.user).await;
        Ok(SignedIn {
            user: outcome.user,
            session: outcome.session,
            profile,
        })
    }

    pub async fn sign_out(&self, access_token: &str) -> ArenaResult<()> {
        self.auth.sign_out(access_token).await?;
        Ok(())
    }

    pub async fn resend_confirmation(&self, email: &str) -> ArenaResult<()> {
        self.auth.resend_confirmation(email).await?;
        Ok(())
    }

    pub async fn current_user(&self, access_token: &str) -> ArenaResult<AuthUser> {
        if access_token.is_empty() {
            return Err(AuthError::Unauthenticated.into());
        }
        Ok(self.auth.get_user(access_token).await?)
    }

    /// Resolves a bearer token to its user and makes sure a confirmed user has
    /// a profile, so battle results always have somewhere to land.
    pub async fn authenticate(&self, access_token: &str) -> ArenaResult<AuthUser> {
        let user = self.current_user(access_token).await?;
        self.profile_after_auth(&user).await;
        Ok(user)
    }

    /// Fetches the user's profile, creating it on first use once the email is
    /// confirmed. Unconfirmed users have no profile yet.
    pub async fn ensure_profile(&self, user: &AuthUser) -> ArenaResult<Option<Profile>> {
        match self.db.get_profile(user.id).await {
            Ok(profile) => Ok(Some(profile)),
            Err(DbError::NotFound(_)) if user.is_confirmed() => {
                let profile = Profile::new(user.id, user.preferred_username());
                match self.db.create_profile(profile.clone()).await {
                    Ok(()) => {
                        tracing::info!("Created profile for user {}", user.id);
                        Ok(Some(profile))
                    }
                    // Lost a race with another request creating it
                    Err(DbError::Conflict(_)) => Ok(Some(self.db.get_profile(user.id).await?)),
                    Err(e) => Err(e.into()),
                }
            }
            Err(DbError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> ArenaResult<Profile> {
        Ok(self.db.update_profile(user_id, update).await?)
    }

    /// Authentication already succeeded; a profile hiccup only costs the profile.
    async fn profile_after_auth(&self, user: &AuthUser) -> Option<Profile> {
        match self.ensure_profile(user).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Failed to load profile for {}: {}", user.id, e);
                None
            }
        }
    }
}
