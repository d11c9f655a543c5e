//! Per-request client context
//!
//! Resolves the session cookie to the acting user once per request and
//! hands handlers a small profile instead of the full user row.

use crate::orm::users;
use crate::session::USER_ID_KEY;
use crate::web::error::ApiError;
use actix_session::SessionExt;
use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};

/// The authenticated user, as seen by handlers.
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// Client data resolved for a single request cycle. `client` is `None` for
/// guests.
#[derive(Clone, Debug, Default)]
pub struct ClientCtx {
    pub client: Option<Profile>,
}

impl ClientCtx {
    pub fn get_id(&self) -> Option<i32> {
        self.client.as_ref().map(|p| p.id)
    }

    pub fn is_admin(&self) -> bool {
        self.client.as_ref().map_or(false, |p| p.is_admin)
    }

    /// The signed-in user, or 401.
    pub fn require_user(&self) -> Result<&Profile, ApiError> {
        self.client
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("You must be signed in".to_string()))
    }

    /// The signed-in admin, or 401/403.
    pub fn require_admin(&self) -> Result<&Profile, ApiError> {
        let profile = self.require_user()?;
        if !profile.is_admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(profile)
    }
}

impl FromRequest for ClientCtx {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let session = req.get_session();
            let user_id = match session.get::<i32>(USER_ID_KEY) {
                Ok(Some(id)) => id,
                Ok(None) => return Ok(ClientCtx::default()),
                Err(e) => {
                    log::debug!("Unreadable session cookie: {}", e);
                    return Ok(ClientCtx::default());
                }
            };

            let db = req
                .app_data::<Data<DatabaseConnection>>()
                .ok_or_else(|| ApiError::internal("database pool missing from app data"))?;

            // A stale cookie for a deleted user degrades to a guest.
            let client = users::Entity::find_by_id(user_id)
                .one(db.get_ref())
                .await?
                .map(|user| Profile {
                    id: user.id,
                    is_admin: user.is_admin(),
                    username: user.username,
                    email: user.email,
                });

            Ok(ClientCtx { client })
        })
    }
}
