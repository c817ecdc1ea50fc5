//! Web server exposing the classification pipeline.
//!
//! Endpoints: start a background job (push driver), step one chunk (pull
//! driver), read job status, and read stored results and cached summaries.

mod cache;
mod handlers;
mod routes;

pub use cache::ReportCache;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::classifier::LlmClassifier;
use crate::config::Settings;
use crate::pipeline::{ProgressTracker, StepContext, TenantLeases};
use crate::rate_limit::RouteRateLimiter;
use crate::repository::{
    DieselClassificationRepository, DieselJobRepository, DieselLedgerRepository,
};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    /// Everything a step needs; shared by both drivers.
    pub step: Arc<StepContext>,
    pub report_cache: Arc<ReportCache>,
    pub leases: Arc<TenantLeases>,
    pub rate_limiter: Arc<RouteRateLimiter>,
    pub jobs: DieselJobRepository,
    pub records: DieselClassificationRepository,
    pub ledger: DieselLedgerRepository,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let ctx = settings.create_db_context();
        let report_cache = Arc::new(ReportCache::new());
        let classifier = Arc::new(LlmClassifier::new(settings.classifier.clone()));

        let step = Arc::new(StepContext {
            transactions: ctx.transactions(),
            records: ctx.classifications(),
            ledger: ctx.ledger(),
            tracker: ProgressTracker::new(ctx.jobs()),
            classifier,
            hook: report_cache.clone(),
            concurrency: settings.classifier.concurrency,
        });

        Self {
            step,
            report_cache,
            leases: TenantLeases::new(),
            rate_limiter: Arc::new(RouteRateLimiter::with_config(settings.rate_limit.to_config())),
            jobs: ctx.jobs(),
            records: ctx.classifications(),
            ledger: ctx.ledger(),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::classifier::{ClassifierError, ClassifierErrorKind, TransactionClassifier};
    use crate::models::{BusinessContext, Classification, SourceTransaction};
    use crate::rate_limit::RateLimitConfig;
    use crate::repository::DbContext;

    /// Instant classifier for router tests; optionally fails on a matching
    /// description to exercise the whole-chunk abort path.
    struct StubClassifier {
        fail_on: Option<String>,
    }

    #[async_trait::async_trait]
    impl TransactionClassifier for StubClassifier {
        async fn classify(
            &self,
            txn: &SourceTransaction,
            _context: &BusinessContext,
        ) -> Result<Classification, ClassifierError> {
            if self.fail_on.as_deref() == Some(txn.description.as_str()) {
                return Err(ClassifierError::new(
                    ClassifierErrorKind::Quota,
                    "stub quota failure",
                ));
            }
            Ok(Classification {
                category: "office-expenses".to_string(),
                confidence: 0.9,
                deductible: true,
                reasoning: None,
            })
        }

        fn model_name(&self) -> &str {
            "stub-model"
        }
    }

    fn sample_txn(i: usize) -> SourceTransaction {
        SourceTransaction {
            txn_id: format!("TXN-{:03}", i),
            occurred_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            description: format!("Purchase {}", i),
            amount: -10.0 - i as f64,
            account: Some("Expenses".to_string()),
            contact: None,
        }
    }

    async fn setup_test_app(
        fail_on: Option<&str>,
        rate_config: RateLimitConfig,
    ) -> (axum::Router, AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();

        let report_cache = Arc::new(ReportCache::new());
        let step = Arc::new(StepContext {
            transactions: ctx.transactions(),
            records: ctx.classifications(),
            ledger: ctx.ledger(),
            tracker: ProgressTracker::new(ctx.jobs()),
            classifier: Arc::new(StubClassifier {
                fail_on: fail_on.map(|s| s.to_string()),
            }),
            hook: report_cache.clone(),
            concurrency: 5,
        });
        let state = AppState {
            step,
            report_cache,
            leases: TenantLeases::new(),
            rate_limiter: Arc::new(RouteRateLimiter::with_config(rate_config)),
            jobs: ctx.jobs(),
            records: ctx.classifications(),
            ledger: ctx.ledger(),
        };

        let app = create_router(state.clone());
        (app, state, dir)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_idle_for_unknown_tenant() {
        let (app, _state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/classify/status/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "idle");
        assert_eq!(json["total_transactions"], 0);
    }

    #[tokio::test]
    async fn test_step_requires_tenant() {
        let (app, _state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let response = app
            .oneshot(post_json("/api/classify/step", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_step_with_no_transactions_is_validation_failure() {
        let (app, state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let response = app
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "empty-tenant"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("no cached transactions"));
        // No job row is created by a validation failure.
        assert!(state.jobs.get("empty-tenant").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pull_driver_full_job() {
        let (app, state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let txns: Vec<_> = (0..5).map(sample_txn).collect();
        state
            .step
            .transactions
            .import_batch("tenant-1", &txns)
            .await
            .unwrap();

        // First chunk of 2.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "tenant-1", "batch": 0, "batch_size": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["analyzed"], 2);
        assert_eq!(json["total_analyzed"], 2);
        assert_eq!(json["has_more"], true);
        assert_eq!(json["next_batch"], 1);
        assert_eq!(json["all_complete"], false);
        assert_eq!(json["progress"], 40.0);
        assert!(json["cost"]["batch_cost_usd"].as_f64().unwrap() > 0.0);

        // Drive to completion.
        let mut batch = 1;
        loop {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/classify/step",
                    json!({"tenant_id": "tenant-1", "batch": batch, "batch_size": 2}),
                ))
                .await
                .unwrap();
            let json = body_json(response).await;
            if json["all_complete"] == true {
                break;
            }
            batch = json["next_batch"].as_u64().unwrap();
        }

        let status = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/classify/status/tenant-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(status).await;
        assert_eq!(json["status"], "complete");
        assert_eq!(json["transactions_analyzed"], 5);
        assert_eq!(json["progress"], 100.0);

        // All five records stored.
        assert_eq!(state.records.count_for_tenant("tenant-1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_classifier_failure_leaves_job_untouched() {
        let (app, state, _dir) =
            setup_test_app(Some("Purchase 1"), RateLimitConfig::default()).await;
        let txns: Vec<_> = (0..3).map(sample_txn).collect();
        state
            .step
            .transactions
            .import_batch("tenant-1", &txns)
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "tenant-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert!(json["hint"].as_str().unwrap().contains("quota"));

        // Whole chunk aborted: nothing persisted, no cursor movement.
        assert_eq!(state.records.count_for_tenant("tenant-1").await.unwrap(), 0);
        assert!(state.jobs.get("tenant-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_with_retry_after() {
        let (app, state, _dir) = setup_test_app(
            None,
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
        )
        .await;
        state
            .step
            .transactions
            .import_batch("tenant-1", &[sample_txn(0)])
            .await
            .unwrap();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/classify/step",
                    json!({"tenant_id": "tenant-1", "batch": 0}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "tenant-1", "batch": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }

    #[tokio::test]
    async fn test_push_driver_runs_to_completion() {
        let (app, state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let txns: Vec<_> = (0..4).map(sample_txn).collect();
        state
            .step
            .transactions
            .import_batch("tenant-1", &txns)
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/classify/start",
                json!({"tenant_id": "tenant-1", "business_name": "Acme", "batch_size": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "analyzing");
        assert_eq!(json["total_transactions"], 4);
        assert_eq!(json["poll_url"], "/api/classify/status/tenant-1");

        // The background loop owns the lease until it finishes; poll the
        // durable row like a real caller would.
        let mut completed = false;
        for _ in 0..100 {
            if let Some(job) = state.jobs.get("tenant-1").await.unwrap() {
                if job.status == crate::models::JobStatus::Complete {
                    completed = true;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(completed, "background job did not finish");
        assert_eq!(state.records.count_for_tenant("tenant-1").await.unwrap(), 4);
        assert_eq!(state.ledger.entries_for_tenant("tenant-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_start_with_no_transactions_is_validation_failure() {
        let (app, _state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let response = app
            .oneshot(post_json(
                "/api/classify/start",
                json!({"tenant_id": "empty-tenant"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summary_is_cached_until_invalidated() {
        let (app, state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        let txns: Vec<_> = (0..2).map(sample_txn).collect();
        state
            .step
            .transactions
            .import_batch("tenant-1", &txns)
            .await
            .unwrap();

        // Summary before any classification: empty, and now cached.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/classifications/tenant-1/summary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["total_classified"], 0);
        assert!(state.report_cache.get_summary("tenant-1").is_some());

        // Completing the job fires the hook and evicts the stale summary.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "tenant-1", "batch": 0}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["all_complete"], true);
        assert!(state.report_cache.get_summary("tenant-1").is_none());

        // Fresh summary reflects the stored records.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/classifications/tenant-1/summary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["total_classified"], 2);
        assert_eq!(json["categories"][0]["category"], "office-expenses");
    }

    #[tokio::test]
    async fn test_list_classifications() {
        let (app, state, _dir) = setup_test_app(None, RateLimitConfig::default()).await;
        state
            .step
            .transactions
            .import_batch("tenant-1", &[sample_txn(0)])
            .await
            .unwrap();
        app.clone()
            .oneshot(post_json(
                "/api/classify/step",
                json!({"tenant_id": "tenant-1"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/classifications/tenant-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["transaction_id"], "TXN-000");
        assert_eq!(json[0]["model"], "stub-model");
    }
}
