use std::collections::BTreeSet;
use std::sync::Arc;

use crate::bulk::BulkIndex;
use crate::error::IndexError;
use crate::normalize::expand_variants;

/// Names queried for a company and the patents they matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub variants: Vec<String>,
    pub patent_ids: BTreeSet<String>,
}

/// Expands company names into variants and looks them up in the bulk index.
#[derive(Clone)]
pub struct NameResolver {
    index: Arc<BulkIndex>,
}

impl NameResolver {
    pub fn new(index: Arc<BulkIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &BulkIndex {
        &self.index
    }

    /// Fails with `SourceUnavailable` when no index generation is active.
    pub fn ensure_ready(&self) -> Result<String, IndexError> {
        self.index.ensure_ready()
    }

    /// Looks up every variant of `names`. The company key stands in for
    /// the name when the caller supplies none.
    ///
    /// The lookup runs on the blocking pool; only the calling task waits.
    pub async fn discover(&self, company_key: &str, names: &[String]) -> Result<Discovery, IndexError> {
        let inputs: Vec<String> = if names.iter().any(|n| !n.trim().is_empty()) {
            names.to_vec()
        } else {
            vec![company_key.to_string()]
        };

        let variants = expand_variants(&inputs);
        let index = Arc::clone(&self.index);
        let query = variants.clone();
        let span = tracing::Span::current();
        let patent_ids = tokio::task::spawn_blocking(move || {
            let _entered = span.entered();
            index.lookup(&query)
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))??;
        Ok(Discovery {
            variants,
            patent_ids,
        })
    }
}
