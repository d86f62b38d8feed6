//! Read-through cache over slow-changing configuration parameters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use crate::error::ParameterError;

#[async_trait]
pub trait ParameterSource: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError>;
}

/// Parameters fixed at startup, typically the `[parameters]` config table.
#[derive(Debug, Default, Clone)]
pub struct StaticParameters {
    values: HashMap<String, String>,
}

impl StaticParameters {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl ParameterSource for StaticParameters {
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError> {
        Ok(self.values.get(name).cloned())
    }
}

/// Explicit cache object; dropping or clearing it is always safe.
#[derive(Clone)]
pub struct ParameterCache {
    source: Arc<dyn ParameterSource>,
    cache: Cache<String, String>,
    prefix: String,
}

impl ParameterCache {
    pub fn new(source: Arc<dyn ParameterSource>, prefix: impl Into<String>) -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(Duration::from_secs(300))
            .build();
        Self {
            source,
            cache,
            prefix: prefix.into(),
        }
    }

    pub async fn get(&self, name: &str) -> Result<String, ParameterError> {
        if let Some(value) = self.cache.get(name).await {
            debug!(parameter = name, "Parameter cache hit");
            return Ok(value);
        }

        let value = self
            .source
            .get(name)
            .await?
            .ok_or_else(|| ParameterError::NotFound(name.to_string()))?;
        self.cache.insert(name.to_string(), value.clone()).await;
        debug!(parameter = name, "Parameter loaded from source");
        Ok(value)
    }

    pub async fn email_template(&self, template_name: &str) -> Result<String, ParameterError> {
        self.get(&format!("{}/email-templates/{template_name}", self.prefix))
            .await
    }

    pub async fn notification_email(
        &self,
        notification_type: &str,
    ) -> Result<String, ParameterError> {
        self.get(&format!(
            "{}/notifications/{notification_type}-email",
            self.prefix
        ))
        .await
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        debug!("Parameter cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        inner: StaticParameters,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ParameterSource for CountingSource {
        async fn get(&self, name: &str) -> Result<Option<String>, ParameterError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(name).await
        }
    }

    fn counting() -> Arc<CountingSource> {
        let values = HashMap::from([
            (
                "/ldc-workflow/email-templates/repurchase-notice".to_string(),
                "Loan flagged for repurchase".to_string(),
            ),
            (
                "/ldc-workflow/notifications/Repurchase-email".to_string(),
                "repurchase-desk@example.com".to_string(),
            ),
        ]);
        Arc::new(CountingSource {
            inner: StaticParameters::new(values),
            reads: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn resolves_prefixed_names() {
        let cache = ParameterCache::new(counting(), "/ldc-workflow");
        assert_eq!(
            cache.email_template("repurchase-notice").await.unwrap(),
            "Loan flagged for repurchase"
        );
        assert_eq!(
            cache.notification_email("Repurchase").await.unwrap(),
            "repurchase-desk@example.com"
        );
    }

    #[tokio::test]
    async fn second_read_hits_cache_until_cleared() {
        let source = counting();
        let cache = ParameterCache::new(source.clone(), "/ldc-workflow");

        cache.email_template("repurchase-notice").await.unwrap();
        cache.email_template("repurchase-notice").await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);

        cache.clear();
        cache.email_template("repurchase-notice").await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_parameter_is_not_found() {
        let cache = ParameterCache::new(counting(), "/ldc-workflow");
        let err = cache.email_template("nope").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration parameter not found: /ldc-workflow/email-templates/nope"
        );
    }
}
