//! # Page Assembler
//!
//! Builds a page from cached fragments. Each slot names a fragment key; the
//! assembler reads every slot through the cache and records which slots came
//! back as placeholders so the caller can fill them in on a later pass.
//!
//! Deferred slots use `get_or_placeholder` (never block the page on them);
//! the rest use `get_or_compute`.

use super::manager::CacheManager;
use crate::domain::{CacheError, CachePolicy, Fetched, Freshness};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Produces the bytes of a fragment on a cache miss.
#[async_trait]
pub trait FragmentRenderer: Send + Sync {
    async fn render(&self, key: &str) -> Result<Vec<u8>, CacheError>;
}

/// One fragment slot in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: String,
    pub policy: CachePolicy,
    /// Return a placeholder rather than wait for the computation.
    pub deferred: bool,
}

impl Slot {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            policy: CachePolicy::volatile(),
            deferred: false,
        }
    }

    pub fn durable(mut self) -> Self {
        self.policy = CachePolicy::durable();
        self
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// Fragments in slot order plus the keys still rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPage {
    pub fragments: Vec<(String, Fetched)>,
    pub pending: Vec<String>,
}

impl AssembledPage {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether any slot was served from the stale tier.
    pub fn has_stale(&self) -> bool {
        self.fragments
            .iter()
            .any(|(_, fetched)| fetched.freshness == Freshness::Stale)
    }

    /// Concatenate the fragments, substituting `marker` for pending slots.
    pub fn render(&self, marker: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, fetched) in &self.fragments {
            match fetched.bytes() {
                Some(bytes) => out.extend_from_slice(bytes),
                None => out.extend_from_slice(marker),
            }
        }
        out
    }
}

pub struct PageAssembler {
    cache: Arc<CacheManager>,
    renderer: Arc<dyn FragmentRenderer>,
}

impl PageAssembler {
    pub fn new(cache: Arc<CacheManager>, renderer: Arc<dyn FragmentRenderer>) -> Self {
        Self { cache, renderer }
    }

    pub async fn assemble(&self, slots: &[Slot]) -> AssembledPage {
        let mut fragments = Vec::with_capacity(slots.len());
        let mut pending = Vec::new();

        for slot in slots {
            let fetched = if slot.deferred {
                let renderer = Arc::clone(&self.renderer);
                let key = slot.key.clone();
                self.cache
                    .get_or_placeholder(&slot.key, slot.policy, move || async move {
                        renderer.render(&key).await
                    })
                    .await
            } else {
                let renderer = Arc::clone(&self.renderer);
                self.cache
                    .get_or_compute(&slot.key, slot.policy, || async move {
                        renderer.render(&slot.key).await
                    })
                    .await
            };

            if fetched.value.is_placeholder() {
                pending.push(slot.key.clone());
            }
            fragments.push((slot.key.clone(), fetched));
        }

        if !pending.is_empty() {
            debug!(pending = pending.len(), slots = slots.len(), "Page assembled with placeholders");
        }
        AssembledPage { fragments, pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use crate::domain::{CacheConfig, CacheValue};
    use shared_types::ManualTimeSource;
    use std::collections::HashSet;

    struct StaticRenderer {
        failing: HashSet<String>,
    }

    #[async_trait]
    impl FragmentRenderer for StaticRenderer {
        async fn render(&self, key: &str) -> Result<Vec<u8>, CacheError> {
            if self.failing.contains(key) {
                return Err(CacheError::compute(key, "template error"));
            }
            Ok(format!("<{key}>").into_bytes())
        }
    }

    fn assembler(failing: &[&str]) -> PageAssembler {
        let cache = CacheManager::new(
            CacheConfig::for_testing(),
            Arc::new(InMemoryKVStore::new()),
            Arc::new(ManualTimeSource::new(1_000)),
        )
        .unwrap();
        PageAssembler::new(
            Arc::new(cache),
            Arc::new(StaticRenderer {
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }),
        )
    }

    #[tokio::test]
    async fn test_complete_page() {
        let assembler = assembler(&[]);
        let page = assembler
            .assemble(&[Slot::new("frag:header"), Slot::new("frag:body").durable()])
            .await;
        assert!(page.is_complete());
        assert_eq!(page.render(b"?"), b"<frag:header><frag:body>".to_vec());
    }

    #[tokio::test]
    async fn test_failed_slot_renders_later() {
        let assembler = assembler(&["frag:body"]);
        let page = assembler
            .assemble(&[Slot::new("frag:header"), Slot::new("frag:body")])
            .await;
        assert_eq!(page.pending, vec!["frag:body".to_string()]);
        assert_eq!(page.render(b"..."), b"<frag:header>...".to_vec());
    }

    #[tokio::test]
    async fn test_deferred_slot_is_pending_then_filled() {
        let assembler = assembler(&[]);
        let slots = [Slot::new("frag:sidebar").deferred()];

        let first = assembler.assemble(&slots).await;
        assert!(!first.is_complete());

        for _ in 0..100 {
            if matches!(assembler.cache.peek("frag:sidebar"), Some(CacheValue::Value(_))) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let second = assembler.assemble(&slots).await;
        assert!(second.is_complete());
        assert!(!second.has_stale());
    }
}
