use std::sync::Arc;

use tracing::{debug, info, warn};
use wave_shared::constants::{AVATAR_COUNT, DEFAULT_AVATAR_ID};
use wave_shared::{UserId, ValidationError};
use wave_store::{IdentityProvider, RemoteStore, StoreError, User};

use crate::error::{AuthorizationError, ChatError, Result};
use crate::state::signed_in_user;

/// User profiles as seen by the signed-in user.
#[derive(Clone)]
pub struct Profiles {
    remote: RemoteStore,
    identity: Arc<dyn IdentityProvider>,
}

impl Profiles {
    pub fn new(remote: RemoteStore, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { remote, identity }
    }

    fn me_id(&self) -> Result<UserId> {
        signed_in_user(self.identity.as_ref())
    }

    /// Write the signed-in user's profile after sign-up.
    pub async fn register(&self, email: &str, roll_number: &str) -> Result<User> {
        let id = self.me_id()?;
        let (email, roll_number) = (email.trim(), roll_number.trim());
        if email.is_empty() {
            return Err(ValidationError::EmptyField("email").into());
        }
        if roll_number.is_empty() {
            return Err(ValidationError::EmptyField("roll number").into());
        }

        let user = User {
            id,
            email: email.to_string(),
            roll_number: roll_number.to_string(),
            avatar_id: DEFAULT_AVATAR_ID,
        };
        self.remote.put_user(&user).await?;
        info!(user = %user.id, "profile registered");
        Ok(user)
    }

    pub async fn me(&self) -> Result<User> {
        let id = self.me_id()?;
        self.remote
            .get_user(&id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("profile of {id}")))
    }

    /// Profile of another user. A missing or unreadable profile becomes a
    /// placeholder; only backend failures are errors.
    pub async fn peer(&self, id: &UserId) -> Result<User> {
        match self.remote.get_user(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                debug!(user = %id, "no profile, using placeholder");
                Ok(User::placeholder(id.clone()))
            }
            Err(StoreError::Decode(e)) => {
                warn!(user = %id, error = %e, "malformed profile, using placeholder");
                Ok(User::placeholder(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_avatar(&self, user: &UserId, avatar_id: i64) -> Result<()> {
        let me = self.me_id()?;
        if user != &me {
            return Err(AuthorizationError::NotOwner.into());
        }
        if !(1..=AVATAR_COUNT).contains(&avatar_id) {
            return Err(ValidationError::InvalidAvatar.into());
        }

        self.remote.set_avatar(&me, avatar_id).await?;
        debug!(user = %me, avatar_id, "avatar updated");
        Ok(())
    }

    /// Everyone but the caller whose roll number or email contains `term`,
    /// ignoring case, ordered by roll number.
    pub async fn search(&self, term: &str) -> Result<Vec<User>> {
        let me = self.me_id()?;
        let term = term.trim().to_lowercase();

        Ok(self
            .remote
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.id != me)
            .filter(|u| {
                term.is_empty()
                    || u.roll_number.to_lowercase().contains(&term)
                    || u.email.to_lowercase().contains(&term)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wave_shared::constants::PLACEHOLDER_DISPLAY_NAME;
    use wave_store::{DocumentStore, Fields, Op, WriteMode};

    use super::*;
    use crate::testing::World;

    async fn seed(world: &World) {
        for (id, email, roll) in [
            ("a1", "alice@uni.edu", "21CS003"),
            ("b2", "bob@uni.edu", "21CS001"),
            ("c3", "carol@mail.com", "20EE010"),
        ] {
            world.client(id).profiles().register(email, roll).await.unwrap();
        }
    }

    #[tokio::test]
    async fn register_validates_and_defaults_avatar() {
        let world = World::new().await;
        let client = world.client("a1");
        let profiles = client.profiles();

        assert!(matches!(
            profiles.register(" ", "21CS003").await,
            Err(ChatError::Validation(ValidationError::EmptyField("email")))
        ));
        assert!(matches!(
            profiles.register("alice@uni.edu", "").await,
            Err(ChatError::Validation(ValidationError::EmptyField("roll number")))
        ));
        assert!(matches!(profiles.me().await, Err(ChatError::NotFound(_))));

        let user = profiles.register(" alice@uni.edu ", "21CS003").await.unwrap();
        assert_eq!(user.avatar_id, DEFAULT_AVATAR_ID);
        assert_eq!(user.email, "alice@uni.edu");
        assert_eq!(profiles.me().await.unwrap(), user);
    }

    #[tokio::test]
    async fn avatar_is_owner_only_and_in_range() {
        let world = World::new().await;
        seed(&world).await;
        let client = world.client("a1");
        let profiles = client.profiles();

        for bad in [0, AVATAR_COUNT + 1, -3] {
            assert!(matches!(
                profiles.update_avatar(&"a1".into(), bad).await,
                Err(ChatError::Validation(ValidationError::InvalidAvatar))
            ));
        }
        assert!(matches!(
            profiles.update_avatar(&"b2".into(), 4).await,
            Err(ChatError::Authorization(AuthorizationError::NotOwner))
        ));

        profiles.update_avatar(&"a1".into(), AVATAR_COUNT).await.unwrap();
        assert_eq!(profiles.me().await.unwrap().avatar_id, AVATAR_COUNT);
        assert_eq!(profiles.peer(&"b2".into()).await.unwrap().avatar_id, DEFAULT_AVATAR_ID);
    }

    #[tokio::test]
    async fn missing_peer_becomes_placeholder() {
        let world = World::new().await;
        let client = world.client("a1");
        let profiles = client.profiles();

        let ghost = profiles.peer(&"ghost".into()).await.unwrap();
        assert_eq!(ghost.id, UserId::from("ghost"));
        assert_eq!(ghost.display_name(), PLACEHOLDER_DISPLAY_NAME);

        let mut partial = Fields::new();
        partial.insert("email".into(), json!("x@y"));
        world
            .mem
            .set("users/partial", partial, WriteMode::Overwrite)
            .await
            .unwrap();
        let partial = profiles.peer(&"partial".into()).await.unwrap();
        assert_eq!(partial.display_name(), PLACEHOLDER_DISPLAY_NAME);

        world.mem.fail_ops(&[Op::Get]);
        assert!(matches!(
            profiles.peer(&"ghost".into()).await,
            Err(ChatError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn search_excludes_self_and_ignores_case() {
        let world = World::new().await;
        seed(&world).await;
        let client = world.client("a1");
        let profiles = client.profiles();

        let ids = |users: Vec<User>| users.into_iter().map(|u| u.id.0).collect::<Vec<_>>();

        assert_eq!(ids(profiles.search("").await.unwrap()), vec!["c3", "b2"]);
        assert_eq!(ids(profiles.search("21cs").await.unwrap()), vec!["b2"]);
        assert_eq!(ids(profiles.search(" MAIL.COM ").await.unwrap()), vec!["c3"]);
        assert!(profiles.search("nobody").await.unwrap().is_empty());
    }
}
