// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent generation orchestrator.
//!
//! Fans out one remote job per selected primary style. Each job debits the
//! ledger *individually* before submitting: sibling jobs race for the same
//! balance, and the aggregate affordability check up front is only an
//! optimization -- the per-job debit is what makes overdrafting impossible.
//! All jobs run to completion; there is no early exit on first failure.
//!
//! Ordering within one job: debit happens-before submit happens-before
//! polling happens-before result fold-in. A debit followed by a submit
//! failure is not refunded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use styleforge_catalog::{Style, StyleCatalog};
use styleforge_config::model::GenerationConfig;
use styleforge_conversation::FinalizedSelection;
use styleforge_core::{
    AccountId, GenerationBackend, GenerationRequest, ImageRef, JobStatus, StyleRef,
    StyleforgeError,
};
use styleforge_ledger::{BalanceLedger, DebitOutcome};
use styleforge_storage::Database;
use styleforge_storage::queries::overrides;
use tracing::{debug, info, warn};

use crate::aggregate::{BatchResult, JobFailure, JobOutcome};
use crate::params::resolve_params;

/// Orchestrates one generation batch per confirmed conversation hand-off.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
    ledger: BalanceLedger,
    catalog: Arc<StyleCatalog>,
    db: Database,
    config: GenerationConfig,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        ledger: BalanceLedger,
        catalog: Arc<StyleCatalog>,
        db: Database,
        config: GenerationConfig,
    ) -> Self {
        Self {
            backend,
            ledger,
            catalog,
            db,
            config,
        }
    }

    /// Run one batch for a finalized selection and collect every outcome.
    pub async fn generate(
        &self,
        selection: FinalizedSelection,
    ) -> Result<BatchResult, StyleforgeError> {
        let started = Instant::now();
        let account = selection.account;

        // 1. Overlay per-account overrides on the configured defaults.
        let override_row = overrides::get_overrides(&self.db, account.0).await?;
        let params = resolve_params(&self.config, override_row.as_ref());

        // 2. Resolve primaries; a name the catalog no longer knows becomes
        //    a collected failure, not an abort.
        let mut vanished: Vec<String> = Vec::new();
        let mut resolvable: Vec<Style> = Vec::new();
        for name in &selection.styles {
            match self.catalog.find_by_name(name) {
                Some(style) => resolvable.push(style.clone()),
                None => {
                    warn!(account = %account, style = %name, "selected style no longer resolves");
                    vanished.push(name.clone());
                }
            }
        }

        // 3. Whole-batch preconditions: nothing resolvable, or the balance
        //    cannot cover every job. No jobs launched, no partial debits.
        if resolvable.is_empty() {
            let remaining_balance = self.ledger.balance(account).await?;
            return Ok(self.assemble(
                &selection,
                HashMap::new(),
                &vanished,
                started,
                remaining_balance,
            ));
        }

        let balance = self.ledger.balance(account).await?;
        let needed = self.ledger.cost_per_job() * resolvable.len() as f64;
        if balance < needed {
            debug!(account = %account, balance, needed, "batch rejected up front: cannot afford all jobs");
            let results: HashMap<String, JobOutcome> = resolvable
                .iter()
                .map(|style| {
                    (
                        style.name.clone(),
                        JobOutcome {
                            style_name: style.name.clone(),
                            assets_used: Vec::new(),
                            result: Err(JobFailure::InsufficientBalance),
                        },
                    )
                })
                .collect();
            return Ok(self.assemble(&selection, results, &vanished, started, balance));
        }

        // 4. Resolve secondaries once; unknown names are skipped.
        let secondaries: Vec<Style> = selection
            .secondary_styles
            .iter()
            .filter_map(|name| {
                let style = self.catalog.find_secondary_by_name(name);
                if style.is_none() {
                    warn!(account = %account, style = %name, "secondary style no longer resolves, skipping");
                }
                style.cloned()
            })
            .collect();

        info!(
            account = %account,
            jobs = resolvable.len(),
            secondaries = secondaries.len(),
            "launching generation batch"
        );

        // 5. One concurrent task per resolvable primary.
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let job_timeout = Duration::from_secs(self.config.job_timeout_secs);
        let tasks: Vec<_> = resolvable
            .iter()
            .map(|primary| {
                let style_refs = pack_style_refs(
                    primary,
                    &secondaries,
                    self.config.max_styles_per_request,
                );
                let request = GenerationRequest {
                    prompt: selection.prompt.clone(),
                    style_refs,
                    params: params.clone(),
                };
                let backend = Arc::clone(&self.backend);
                let ledger = self.ledger.clone();
                let style_name = primary.name.clone();
                tokio::spawn(async move {
                    let assets_used: Vec<String> =
                        request.style_refs.iter().map(|r| r.asset.clone()).collect();
                    let result =
                        run_job(backend, ledger, account, &request, poll_interval, job_timeout)
                            .await;
                    JobOutcome {
                        style_name,
                        assets_used,
                        result,
                    }
                })
            })
            .collect();

        // 6. Wait for all; collect every outcome, success or failure.
        let mut results: HashMap<String, JobOutcome> = HashMap::new();
        for (style, joined) in resolvable.iter().zip(join_all(tasks).await) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => JobOutcome {
                    style_name: style.name.clone(),
                    assets_used: Vec::new(),
                    result: Err(JobFailure::Internal(format!("job task panicked: {e}"))),
                },
            };
            results.insert(outcome.style_name.clone(), outcome);
        }

        let remaining_balance = self.ledger.balance(account).await?;
        let batch = self.assemble(&selection, results, &vanished, started, remaining_balance);
        info!(
            account = %account,
            succeeded = batch.succeeded().count(),
            failed = batch.failed().count(),
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "generation batch finished"
        );
        Ok(batch)
    }

    /// Merge job results and vanished styles back into selection order.
    fn assemble(
        &self,
        selection: &FinalizedSelection,
        mut results: HashMap<String, JobOutcome>,
        vanished: &[String],
        started: Instant,
        remaining_balance: f64,
    ) -> BatchResult {
        let outcomes = selection
            .styles
            .iter()
            .map(|name| {
                if vanished.contains(name) {
                    JobOutcome {
                        style_name: name.clone(),
                        assets_used: Vec::new(),
                        result: Err(JobFailure::StyleVanished),
                    }
                } else {
                    results.remove(name).unwrap_or_else(|| JobOutcome {
                        style_name: name.clone(),
                        assets_used: Vec::new(),
                        result: Err(JobFailure::Internal("missing job outcome".into())),
                    })
                }
            })
            .collect();

        BatchResult {
            prompt: selection.prompt.clone(),
            outcomes,
            elapsed: started.elapsed(),
            remaining_balance,
        }
    }
}

/// Combine the primary style with as many secondaries as fit under the
/// per-request limit, skipping any that duplicate an already-included
/// asset.
fn pack_style_refs(primary: &Style, secondaries: &[Style], max_per_request: usize) -> Vec<StyleRef> {
    let mut refs = vec![primary.style_ref()];
    for secondary in secondaries {
        if refs.len() >= max_per_request {
            break;
        }
        if refs.iter().any(|r| r.asset == secondary.asset) {
            continue;
        }
        refs.push(secondary.style_ref());
    }
    refs
}

/// Run one job end to end: debit, submit, poll, fetch.
async fn run_job(
    backend: Arc<dyn GenerationBackend>,
    ledger: BalanceLedger,
    account: AccountId,
    request: &GenerationRequest,
    poll_interval: Duration,
    job_timeout: Duration,
) -> Result<Vec<ImageRef>, JobFailure> {
    // Debit first. Siblings may have drained the balance since the batch
    // precheck; that shows up here as a local failure with no remote call.
    match ledger.check_and_deduct(account).await {
        Ok(DebitOutcome::Debited { .. }) => {}
        Ok(DebitOutcome::InsufficientBalance { .. }) => {
            return Err(JobFailure::InsufficientBalance);
        }
        Err(e) => return Err(JobFailure::Internal(e.to_string())),
    }

    let job_id = match backend.submit(request).await {
        Ok(id) => id,
        Err(e) => {
            // Accepted trade-off: the debit taken above is not refunded.
            warn!(account = %account, error = %e, "submission failed after debit; no refund");
            return Err(JobFailure::Submit(e.to_string()));
        }
    };
    debug!(account = %account, job = %job_id, "job submitted, polling");

    let poll = async {
        loop {
            match backend.poll_status(&job_id).await {
                Ok(JobStatus::Completed) => {
                    return backend
                        .fetch_result(&job_id)
                        .await
                        .map_err(|e| JobFailure::Remote(e.to_string()));
                }
                Ok(JobStatus::Failed(reason)) => return Err(JobFailure::Remote(reason)),
                Ok(JobStatus::Queued) | Ok(JobStatus::InProgress) => {
                    tokio::time::sleep(poll_interval).await;
                }
                // A mid-poll outage is a job failure, not a crash.
                Err(e) => return Err(JobFailure::Remote(e.to_string())),
            }
        }
    };

    match tokio::time::timeout(job_timeout, poll).await {
        Ok(result) => result,
        Err(_) => {
            warn!(account = %account, job = %job_id, "job exceeded deadline");
            Err(JobFailure::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use styleforge_config::load_config_from_str;
    use styleforge_config::model::BillingConfig;
    use styleforge_test_utils::MockGeneration;

    const TOML: &str = r#"
[generation]
poll_interval_ms = 10
job_timeout_secs = 1
max_styles_per_request = 2
max_selected_styles = 5

[[styles]]
name = "Watercolor"
asset = "watercolor.safetensors"

[[styles]]
name = "Cyberpunk"
asset = "cyberpunk.safetensors"

[[styles]]
name = "Sketch"
asset = "sketch.safetensors"

[[secondary_styles]]
name = "Film grain"
asset = "grain.safetensors"

[[secondary_styles]]
name = "Grain Twin"
asset = "grain.safetensors"

[[secondary_styles]]
name = "Glow"
asset = "glow.safetensors"
"#;

    struct Fixture {
        orchestrator: Orchestrator,
        ledger: BalanceLedger,
        mock: Arc<MockGeneration>,
    }

    async fn fixture(cost: f64, starting: f64) -> Fixture {
        let config = load_config_from_str(TOML).unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let ledger = BalanceLedger::new(
            db.clone(),
            &BillingConfig {
                cost_per_job: cost,
                starting_balance: starting,
            },
        );
        let catalog = Arc::new(StyleCatalog::from_config(&config));
        let mock = Arc::new(MockGeneration::new());
        let orchestrator = Orchestrator::new(
            mock.clone(),
            ledger.clone(),
            catalog,
            db,
            config.generation.clone(),
        );
        Fixture {
            orchestrator,
            ledger,
            mock,
        }
    }

    fn selection(styles: &[&str], secondary: &[&str]) -> FinalizedSelection {
        FinalizedSelection {
            account: AccountId(1),
            prompt: "a fox".into(),
            styles: styles.iter().map(|s| s.to_string()).collect(),
            secondary_styles: secondary.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn mixed_batch_is_partial_success_with_image_union() {
        let f = fixture(1.0, 10.0).await;
        f.mock.images_for("watercolor.safetensors", 2).await;
        f.mock.fail_remote_for("cyberpunk.safetensors", "vram").await;
        f.mock.images_for("sketch.safetensors", 1).await;

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor", "Cyberpunk", "Sketch"], &[]))
            .await
            .unwrap();

        assert!(batch.is_success());
        assert_eq!(batch.images().len(), 3);
        assert_eq!(batch.succeeded().count(), 2);
        let failed: Vec<_> = batch.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].style_name, "Cyberpunk");
        assert_eq!(
            failed[0].result,
            Err(JobFailure::Remote("vram".into()))
        );
        // Outcomes stay in selection order despite concurrent completion.
        let names: Vec<&str> = batch.outcomes.iter().map(|o| o.style_name.as_str()).collect();
        assert_eq!(names, vec!["Watercolor", "Cyberpunk", "Sketch"]);
    }

    #[tokio::test]
    async fn all_failed_batch_debits_once_per_submitted_job() {
        let f = fixture(1.0, 10.0).await;
        f.mock.fail_remote_for("watercolor.safetensors", "a").await;
        f.mock.fail_remote_for("cyberpunk.safetensors", "b").await;
        f.mock.fail_remote_for("sketch.safetensors", "c").await;

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor", "Cyberpunk", "Sketch"], &[]))
            .await
            .unwrap();

        assert!(!batch.is_success());
        assert_eq!(batch.failed().count(), 3);
        // Every job reached submission, so every job was debited.
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 7.0);
        assert_eq!(batch.remaining_balance, 7.0);
    }

    #[tokio::test]
    async fn submit_failure_keeps_the_debit() {
        let f = fixture(1.0, 10.0).await;
        f.mock.fail_submit_for("watercolor.safetensors", "quota").await;

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor"], &[]))
            .await
            .unwrap();

        assert!(!batch.is_success());
        assert!(matches!(
            batch.outcomes[0].result,
            Err(JobFailure::Submit(_))
        ));
        // Documented trade-off: debit stands even though submission failed.
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 9.0);
    }

    #[tokio::test]
    async fn unaffordable_batch_launches_nothing() {
        let f = fixture(1.0, 0.0).await;
        f.ledger.set_balance(AccountId(1), 1.0).await.unwrap();

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor", "Sketch"], &[]))
            .await
            .unwrap();

        assert!(!batch.is_success());
        assert_eq!(batch.failed().count(), 2);
        assert!(batch
            .outcomes
            .iter()
            .all(|o| o.result == Err(JobFailure::InsufficientBalance)));
        // No jobs launched, no partial debits.
        assert_eq!(f.mock.submit_count().await, 0);
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn racing_batches_never_overdraw() {
        // Two concurrent batches both pass the aggregate precheck (each sees
        // balance 2.0 >= one job at 2.0), but the balance only covers one
        // job. The losing debit fails locally without a remote call.
        let f = fixture(2.0, 0.0).await;
        f.ledger.set_balance(AccountId(1), 2.0).await.unwrap();

        let (a, b) = tokio::join!(
            f.orchestrator.generate(selection(&["Watercolor"], &[])),
            f.orchestrator.generate(selection(&["Sketch"], &[])),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let successes = [&a, &b].iter().filter(|batch| batch.is_success()).count();
        assert_eq!(successes, 1);
        let loser = if a.is_success() { &b } else { &a };
        assert_eq!(
            loser.outcomes[0].result,
            Err(JobFailure::InsufficientBalance)
        );
        assert_eq!(f.mock.submit_count().await, 1);
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn vanished_style_is_collected_not_fatal() {
        let f = fixture(1.0, 10.0).await;

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor", "No Such Style"], &[]))
            .await
            .unwrap();

        assert!(batch.is_success());
        assert_eq!(batch.outcomes[0].style_name, "Watercolor");
        assert!(batch.outcomes[0].result.is_ok());
        assert_eq!(batch.outcomes[1].result, Err(JobFailure::StyleVanished));
        // Only the resolvable style was debited.
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 9.0);
    }

    #[tokio::test]
    async fn zero_resolvable_styles_is_aggregate_failure_without_jobs() {
        let f = fixture(1.0, 10.0).await;

        let batch = f
            .orchestrator
            .generate(selection(&["Ghost A", "Ghost B"], &[]))
            .await
            .unwrap();

        assert!(!batch.is_success());
        assert_eq!(f.mock.submit_count().await, 0);
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn secondaries_pack_under_limit_and_dedupe_assets() {
        let f = fixture(1.0, 10.0).await;

        // max_styles_per_request = 2: primary + one secondary. "Grain Twin"
        // duplicates the grain asset and must be skipped; "Glow" no longer
        // fits.
        let batch = f
            .orchestrator
            .generate(selection(
                &["Watercolor"],
                &["Film grain", "Grain Twin", "Glow"],
            ))
            .await
            .unwrap();
        assert!(batch.is_success());

        let requests = f.mock.submitted_requests().await;
        assert_eq!(requests.len(), 1);
        let assets: Vec<&str> = requests[0]
            .style_refs
            .iter()
            .map(|r| r.asset.as_str())
            .collect();
        assert_eq!(assets, vec!["watercolor.safetensors", "grain.safetensors"]);
        assert_eq!(batch.outcomes[0].assets_used, assets);
    }

    #[tokio::test]
    async fn stuck_job_times_out_while_siblings_finish() {
        let f = fixture(1.0, 10.0).await;
        f.mock.never_complete_for("watercolor.safetensors").await;

        let batch = f
            .orchestrator
            .generate(selection(&["Watercolor", "Sketch"], &[]))
            .await
            .unwrap();

        assert!(batch.is_success(), "sibling success still counts");
        assert_eq!(batch.outcomes[0].result, Err(JobFailure::Timeout));
        assert!(batch.outcomes[1].result.is_ok());
        // Both jobs were debited: the timed-out one submitted successfully.
        assert_eq!(f.ledger.balance(AccountId(1)).await.unwrap(), 8.0);
    }

    #[tokio::test]
    async fn per_account_overrides_shape_the_request() {
        let f = fixture(1.0, 10.0).await;
        overrides::upsert_overrides(
            &f.orchestrator.db,
            &styleforge_storage::OverrideRow {
                account_id: 1,
                image_size: Some("512x512".into()),
                steps: None,
                guidance_scale: None,
                image_count: Some(4),
                updated_at: String::new(),
            },
        )
        .await
        .unwrap();

        f.orchestrator
            .generate(selection(&["Watercolor"], &[]))
            .await
            .unwrap();

        let requests = f.mock.submitted_requests().await;
        assert_eq!(requests[0].params.image_size, "512x512");
        assert_eq!(requests[0].params.image_count, 4);
        // Unset fields fall back to configured defaults.
        assert_eq!(requests[0].params.steps, 30);
    }
}
