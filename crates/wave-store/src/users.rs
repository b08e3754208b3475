//! CRUD operations for [`User`] records.

use serde_json::json;
use tracing::warn;
use wave_shared::constants::USERS_COLLECTION;
use wave_shared::UserId;

use crate::document::Fields;
use crate::error::Result;
use crate::models::User;
use crate::query::{Direction, Query};
use crate::remote::{user_path, RemoteStore};
use crate::store::WriteMode;

impl RemoteStore {
    /// Write the full profile, replacing any previous one.
    pub async fn put_user(&self, user: &User) -> Result<()> {
        self.docs()
            .set(&user_path(&user.id), user.to_fields(), WriteMode::Overwrite)
            .await
    }

    /// Fetch a profile. `Ok(None)` when no document exists.
    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        match self.docs().get(&user_path(id)).await? {
            Some(doc) => Ok(Some(User::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// All profiles ordered by roll number. Undecodable profiles are skipped.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let query = Query::collection(USERS_COLLECTION).order_by("rollNumber", Direction::Ascending);
        let docs = self.docs().query(&query).await?;

        Ok(docs
            .iter()
            .filter_map(|doc| match User::from_document(doc) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(path = %doc.path, error = %e, "skipping malformed user");
                    None
                }
            })
            .collect())
    }

    pub async fn set_avatar(&self, id: &UserId, avatar_id: i64) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("avatarId".into(), json!(avatar_id));
        self.docs().update(&user_path(id), fields).await
    }
}
