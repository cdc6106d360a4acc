//! Route quoting
//!
//! Wraps a [`RouteSource`] with backoff retries and checks that the returned
//! plan carries everything the executor needs.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{QuoteError, SquidError};
use crate::metrics;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{RoutePlan, RouteRequest};

/// Anything that can produce a route plan for a request
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn fetch_route(&self, request: &RouteRequest) -> Result<RoutePlan, SquidError>;
}

/// Fetches and validates route plans
pub struct RouteQuoter {
    source: Arc<dyn RouteSource>,
    retry: RetryConfig,
}

impl RouteQuoter {
    pub fn new(source: Arc<dyn RouteSource>, retry: RetryConfig) -> Self {
        Self { source, retry }
    }

    /// Request a route, retrying transient failures.
    ///
    /// Fails with [`QuoteError::Incomplete`] when the plan lacks a target,
    /// calldata, or amounts.
    pub async fn quote(&self, request: &RouteRequest) -> Result<RoutePlan, QuoteError> {
        let result = with_retry(&self.retry, "quote", |_| self.source.fetch_route(request)).await;

        let plan = match result {
            Ok(plan) => plan,
            Err(e) => {
                metrics::QUOTES.with_label_values(&["error"]).inc();
                warn!(error = %e, "Route quote failed");
                return Err(QuoteError::Upstream(e));
            }
        };

        if let Err(field) = plan.validate() {
            metrics::QUOTES.with_label_values(&["incomplete"]).inc();
            warn!(field, "Route plan is missing a required field");
            return Err(QuoteError::Incomplete(field));
        }

        metrics::QUOTES.with_label_values(&["ok"]).inc();
        info!(
            from_amount = %plan.estimate.from_amount,
            to_amount = %plan.estimate.to_amount,
            to_amount_min = %plan.estimate.to_amount_min,
            duration_seconds = plan.estimate.duration_seconds,
            router = %plan.transaction_request.target,
            request_id = ?plan.request_id,
            "Route quoted"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_plan, sample_request, RouteReply, ScriptedRouteSource};
    use std::time::Duration;

    fn rate_limited() -> RouteReply {
        RouteReply::Error(SquidError::RateLimited {
            body: "too many requests".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_retries_rate_limits() {
        let source = Arc::new(ScriptedRouteSource::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            RouteReply::Plan,
        ]));
        let quoter = RouteQuoter::new(source.clone(), RetryConfig::default());
        let started = tokio::time::Instant::now();

        let plan = quoter.quote(&sample_request()).await.unwrap();

        assert_eq!(source.calls(), 5);
        assert_eq!(plan.request, sample_request());
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_gives_up_with_last_error() {
        let source = Arc::new(ScriptedRouteSource::new(
            (0..5).map(|_| rate_limited()).collect(),
        ));
        let quoter = RouteQuoter::new(source.clone(), RetryConfig::default());

        let err = quoter.quote(&sample_request()).await.unwrap_err();

        assert_eq!(source.calls(), 5);
        assert!(matches!(
            err,
            QuoteError::Upstream(SquidError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_route_is_not_retried() {
        let source = Arc::new(ScriptedRouteSource::new(vec![RouteReply::Error(
            SquidError::MissingRoute,
        )]));
        let quoter = RouteQuoter::new(source.clone(), RetryConfig::default());

        let err = quoter.quote(&sample_request()).await.unwrap_err();

        assert_eq!(source.calls(), 1);
        assert!(matches!(err, QuoteError::Upstream(SquidError::MissingRoute)));
    }

    #[tokio::test]
    async fn test_plan_without_calldata_rejected() {
        let mut plan = sample_plan(sample_request());
        plan.transaction_request.data = String::new();
        let source = Arc::new(ScriptedRouteSource::new(vec![RouteReply::Fixed(plan)]));
        let quoter = RouteQuoter::new(source, RetryConfig::default());

        let err = quoter.quote(&sample_request()).await.unwrap_err();

        assert!(matches!(
            err,
            QuoteError::Incomplete("transactionRequest.data")
        ));
    }
}
