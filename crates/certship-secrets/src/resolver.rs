//! Provider credential resolution

use std::sync::Arc;

use certship_core::IssueError;
use tracing::info;

use crate::store::SecretStore;

/// Resolves the DNS provider credential secret for a job.
///
/// Secret names are path-style, `<project>/<secret_id>`, always read at the
/// current version stage. Every failure mode (missing secret, permissions,
/// transport, non-UTF-8 payload) surfaces as `SecretFetch`; the caller never
/// needs to distinguish them.
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Store-side name of a project's credential secret
    pub fn secret_name(project: &str, secret_id: &str) -> String {
        format!("{project}/{secret_id}")
    }

    /// Fetch the credential payload as UTF-8 text
    pub async fn resolve(&self, project: &str, secret_id: &str) -> Result<String, IssueError> {
        let name = Self::secret_name(project, secret_id);
        info!(secret = %name, "Fetching DNS provider credentials");
        let bytes = self.store.fetch_latest(&name).await?;
        String::from_utf8(bytes)
            .map_err(|_| IssueError::SecretFetch(format!("Secret {name} is not valid UTF-8!")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct FixtureStore {
        payload: Result<Vec<u8>, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FixtureStore {
        fn returning(payload: &[u8]) -> Self {
            Self {
                payload: Ok(payload.to_vec()),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                payload: Err(message.to_string()),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SecretStore for FixtureStore {
        async fn fetch_latest(&self, name: &str) -> Result<Vec<u8>, IssueError> {
            self.requested.lock().unwrap().push(name.to_string());
            match &self.payload {
                Ok(bytes) => Ok(bytes.clone()),
                Err(message) => Err(IssueError::SecretFetch(message.clone())),
            }
        }
    }

    #[tokio::test]
    async fn composes_the_path_style_name() {
        let store = Arc::new(FixtureStore::returning(b"token = abc"));
        let resolver = SecretResolver::new(store.clone());

        let value = resolver.resolve("acme-prod", "dns-creds").await.unwrap();

        assert_eq!(value, "token = abc");
        assert_eq!(
            *store.requested.lock().unwrap(),
            vec!["acme-prod/dns-creds".to_string()]
        );
    }

    #[tokio::test]
    async fn passes_store_failures_through() {
        let store = Arc::new(FixtureStore::failing("Cannot fetch secret!"));
        let resolver = SecretResolver::new(store);

        let err = resolver.resolve("acme-prod", "dns-creds").await.unwrap_err();

        assert!(matches!(err, IssueError::SecretFetch(_)));
    }

    #[tokio::test]
    async fn rejects_non_utf8_payloads() {
        let store = Arc::new(FixtureStore::returning(&[0xff, 0xfe, 0x00]));
        let resolver = SecretResolver::new(store);

        let err = resolver.resolve("acme-prod", "dns-creds").await.unwrap_err();

        match err {
            IssueError::SecretFetch(message) => {
                assert_eq!(message, "Secret acme-prod/dns-creds is not valid UTF-8!")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
