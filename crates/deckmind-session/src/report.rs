//! Insight reports and their cached read path
//!
//! A completed validation session distills into an [`InsightReport`].
//! [`ReportStore`] layers an injected moka cache over durable persistence
//! so a reload within the freshness window serves the cached report
//! instead of re-running research.

use crate::validation::ValidationSession;
use chrono::{DateTime, Utc};
use deckmind_backend::{ReportCache, SessionPersistence, SessionPersistenceExt, REPORT_FRESHNESS};
use deckmind_model::Candidate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Derived report of one completed validation activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    /// Context key of the session that produced it
    pub context_key: String,
    /// Accepted candidates, in judgment order
    pub accepted: Vec<Candidate>,
    /// Total judgments made
    pub judged_total: usize,
    pub generated_at: DateTime<Utc>,
}

impl InsightReport {
    /// Distill a report from a session
    #[must_use]
    pub fn from_session(context_key: String, session: &ValidationSession) -> Self {
        Self {
            context_key,
            accepted: session.accepted().into_iter().cloned().collect(),
            judged_total: session.judged().len(),
            generated_at: Utc::now(),
        }
    }
}

const REPORT_CACHE_CAPACITY: u64 = 64;

/// Read-through report store: moka in memory, persistence on disk
///
/// Both layers apply the 24-hour freshness window; an expired report is
/// simply absent.
pub struct ReportStore {
    memory: ReportCache<InsightReport>,
    durable: Arc<dyn SessionPersistence>,
}

impl ReportStore {
    /// Create a store over one persistence handle
    #[must_use]
    pub fn new(durable: Arc<dyn SessionPersistence>) -> Self {
        let ttl = Duration::from_secs(
            REPORT_FRESHNESS.num_seconds().unsigned_abs(),
        );
        Self {
            memory: ReportCache::new(REPORT_CACHE_CAPACITY, ttl),
            durable,
        }
    }

    fn durable_key(context_key: &str) -> String {
        format!("report-{context_key}")
    }

    /// Store a freshly generated report in both layers
    pub async fn put(&self, report: InsightReport) {
        self.durable
            .save_now(&Self::durable_key(&report.context_key), &report)
            .await;
        self.memory
            .insert(report.context_key.clone(), report)
            .await;
    }

    /// Fetch the report for a context, if present and fresh
    ///
    /// A durable hit warms the memory layer.
    #[must_use]
    pub async fn get(&self, context_key: &str) -> Option<InsightReport> {
        if let Some(report) = self.memory.get(context_key).await {
            return Some(report.as_ref().clone());
        }
        let report: InsightReport = self
            .durable
            .load_fresh(&Self::durable_key(context_key), Some(REPORT_FRESHNESS))
            .await?;
        self.memory
            .insert(context_key.to_string(), report.clone())
            .await;
        Some(report)
    }

    /// Drop a context's report from both layers
    pub async fn invalidate(&self, context_key: &str) {
        self.memory.invalidate(context_key).await;
        self.durable.clear(&Self::durable_key(context_key)).await;
    }
}
