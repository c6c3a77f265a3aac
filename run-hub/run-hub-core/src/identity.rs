//! Maps the active auth session onto an owner `urlslug`.

use crate::path::CollectionPath;
use crate::session::SessionProvider;
use crate::store::{DocumentStore, FieldFilter};
use crate::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Field of an owner record holding the session uid.
const SESSION_FIELD: &str = "uid";

/// Resolves and caches the application identity for one session context.
///
/// The cache is only trusted while the session lasts; [`logout`] clears it.
/// Two callers racing on an empty cache may both hit the store, which is
/// harmless since they resolve to the same slug.
///
/// [`logout`]: IdentityResolver::logout
pub struct IdentityResolver {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn DocumentStore>,
    cached: RwLock<Option<String>>,
}

impl IdentityResolver {
    pub fn new(sessions: Arc<dyn SessionProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sessions,
            store,
            cached: RwLock::new(None),
        }
    }

    /// Identity currently held in the cache, without resolving.
    pub fn cached(&self) -> Option<String> {
        self.cached.read().clone()
    }

    /// The signed-in user's `urlslug`, or `None` when nobody is signed in or
    /// the session has no provisioned owner record yet.
    pub async fn current_user(&self) -> Result<Option<String>> {
        if let Some(slug) = self.cached() {
            return Ok(Some(slug));
        }

        let Some(session) = self.sessions.current_session().await? else {
            debug!("no active session");
            return Ok(None);
        };

        let filter = FieldFilter::equals(SESSION_FIELD, session.uid.as_str());
        let matches = self
            .store
            .query_collection(&CollectionPath::users(), &filter)
            .await?;
        let slug = matches
            .iter()
            .find_map(|doc| doc.get("urlslug").and_then(|v| v.as_str()))
            .map(str::to_string);

        match slug {
            Some(slug) => {
                info!(uid = %session.uid, urlslug = %slug, "resolved current user");
                *self.cached.write() = Some(slug.clone());
                Ok(Some(slug))
            }
            None => {
                debug!(uid = %session.uid, "session has no owner record");
                Ok(None)
            }
        }
    }

    /// End the session. Returns `true` once the auth service confirmed and
    /// the cache is cleared; failures are logged and reported as `false`.
    pub async fn logout(&self) -> bool {
        match self.sessions.current_session().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.cached.write().take();
                return false;
            }
            Err(e) => {
                warn!("could not read session before logout: {e}");
                return false;
            }
        }

        match self.sessions.end_session().await {
            Ok(()) => {
                self.cached.write().take();
                info!("logged out");
                true
            }
            Err(e) => {
                warn!("logout failed: {e}");
                false
            }
        }
    }
}
