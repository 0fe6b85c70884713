//! The current-session slot.
//!
//! One store instance is shared by reference with everything that needs
//! the current session; connect operations are serialized by the hosting
//! shell, but the slot is still guarded so readers never observe a
//! half-installed session and a cancelled connect cannot disturb the
//! previous one.

use super::{Session, SessionIdentity};
use crate::auth::manager::AuthenticationManager;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Replaces the current session wholesale. Single assignment; no
    /// intermediate state is ever visible.
    pub async fn install(&self, session: Session) {
        let mut current = self.current.write().await;
        *current = Some(session);
    }

    /// Drops the current session, if any.
    pub async fn clear(&self) {
        let mut current = self.current.write().await;
        *current = None;
    }

    /// Hands out the cached authentication manager when `candidate` is
    /// identity-equivalent to the current session. Equivalence is exact
    /// field-for-field equality; [`SessionIdentity::None`] never matches.
    pub async fn try_reuse_manager(
        &self,
        candidate: &SessionIdentity,
    ) -> Option<Arc<AuthenticationManager>> {
        if matches!(candidate, SessionIdentity::None) {
            return None;
        }
        let current = self.current.read().await;
        let session = current.as_ref()?;
        (session.identity() == candidate).then(|| session.manager())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::manager::TokenIdentity;
    use crate::auth::types::AzureEnvironment;
    use crate::session::ConnectionMethod;

    fn session_with_identity(identity: SessionIdentity) -> Session {
        let manager = Arc::new(AuthenticationManager::new(
            TokenIdentity::DeviceCode {
                client_id: "client".into(),
            },
            None,
            AzureEnvironment::Production,
        ));
        Session::new(ConnectionMethod::Credentials, identity, manager)
    }

    fn user_identity(client_id: &str, username: &str, secret: &str) -> SessionIdentity {
        SessionIdentity::UserCredentials {
            client_id: client_id.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }

    #[tokio::test]
    async fn empty_store_offers_no_manager() {
        let store = SessionStore::new();
        assert!(store.current().await.is_none());
        assert!(
            store
                .try_reuse_manager(&user_identity("c", "u", "s"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn exact_identity_match_reuses_the_manager() {
        let store = SessionStore::new();
        let session = session_with_identity(user_identity("c", "u", "s"));
        let manager = session.manager();
        store.install(session).await;

        let reused = store
            .try_reuse_manager(&user_identity("c", "u", "s"))
            .await
            .expect("identical identity should reuse");
        assert!(Arc::ptr_eq(&manager, &reused));
    }

    #[tokio::test]
    async fn any_field_difference_defeats_reuse() {
        let store = SessionStore::new();
        store
            .install(session_with_identity(user_identity("c", "u", "s")))
            .await;

        assert!(
            store
                .try_reuse_manager(&user_identity("c2", "u", "s"))
                .await
                .is_none()
        );
        assert!(
            store
                .try_reuse_manager(&user_identity("c", "u", "other"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn tenant_change_alone_defeats_certificate_reuse() {
        let store = SessionStore::new();
        let identity = SessionIdentity::Certificate {
            client_id: "c".into(),
            tenant: "t1".into(),
            thumbprint: "AA".into(),
        };
        store.install(session_with_identity(identity)).await;

        let other_tenant = SessionIdentity::Certificate {
            client_id: "c".into(),
            tenant: "t2".into(),
            thumbprint: "AA".into(),
        };
        assert!(store.try_reuse_manager(&other_tenant).await.is_none());
    }

    #[tokio::test]
    async fn none_identity_never_matches() {
        let store = SessionStore::new();
        store
            .install(session_with_identity(SessionIdentity::None))
            .await;
        assert!(
            store
                .try_reuse_manager(&SessionIdentity::None)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn install_replaces_wholesale() {
        let store = SessionStore::new();
        store
            .install(session_with_identity(user_identity("c1", "u", "s")))
            .await;
        store
            .install(session_with_identity(user_identity("c2", "u", "s")))
            .await;
        let current = store.current().await.unwrap();
        assert_eq!(current.identity(), &user_identity("c2", "u", "s"));
    }
}
