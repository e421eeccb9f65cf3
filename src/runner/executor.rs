//! Bounded-concurrency trial runner with retry

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::parser::{parse_reply, Answer, ParserMode};
use crate::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, ProviderError, ProviderResult,
};
use crate::survey::Survey;

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum trials in flight at once
    pub parallel_requests: usize,
    /// Total attempts per trial, including the first
    pub max_attempts: u32,
    /// Delay before retrying a generic transient failure
    pub retry_delay_ms: u64,
    /// Delay before retrying after rate limiting, when the server did
    /// not say how long to wait
    pub rate_limit_delay_ms: u64,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Completion token budget per request
    pub max_tokens: u32,
    /// Sampling temperature, if the model supports one
    pub temperature: Option<f32>,
    /// How replies are matched to question numbers
    pub parser_mode: ParserMode,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_requests: 5,
            max_attempts: 3,
            retry_delay_ms: 5_000,
            rate_limit_delay_ms: 20_000,
            timeout_ms: 120_000,
            max_tokens: 8_192,
            temperature: Some(0.7),
            parser_mode: ParserMode::Labeled,
        }
    }
}

/// One completed trial: the trial index plus exactly one answer slot per
/// survey question. Unanswered or unparseable questions are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    pub trial: u32,
    pub answers: Vec<Option<Answer>>,
}

/// Executor for running survey trials against one provider
pub struct Executor {
    provider: Arc<dyn LlmProvider + Send + Sync>,
    survey: Arc<Survey>,
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
}

impl Executor {
    /// Create a new executor
    pub fn new(
        provider: Arc<dyn LlmProvider + Send + Sync>,
        survey: Arc<Survey>,
        config: ExecutorConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.parallel_requests.max(1)));
        Self {
            provider,
            survey,
            config,
            semaphore,
        }
    }

    /// Run `n_trials` independent trials and collect one row per trial
    /// that completed.
    ///
    /// Failed trials are logged and excluded; one trial's failure never
    /// affects the others. Rows come back sorted ascending by trial
    /// index regardless of completion order.
    pub async fn run(&self, n_trials: u32) -> Vec<TrialRow> {
        let mut handles = Vec::new();

        for trial in 1..=n_trials {
            let executor = self.clone_for_trial();

            handles.push(tokio::spawn(async move {
                (trial, executor.run_trial(trial).await)
            }));
        }

        let mut rows = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((_, Ok(row))) => rows.push(row),
                Ok((trial, Err(e))) => {
                    tracing::error!("[trial {}] failed: {}", trial, e);
                }
                Err(e) => {
                    tracing::error!("trial task panicked: {}", e);
                }
            }
        }

        rows.sort_by_key(|row| row.trial);
        rows
    }

    /// Run one trial end-to-end: provider call with retry, then parse.
    async fn run_trial(&self, trial: u32) -> ProviderResult<TrialRow> {
        let _permit = self.semaphore.acquire().await.unwrap();

        tracing::info!("[trial {}] submitting survey", trial);
        let response = self.complete_with_retry(trial).await?;
        tracing::info!("[trial {}] reply ({}ms):\n{}", trial, response.latency_ms, response.content);

        let expected = self.survey.question_count;
        let parsed = {
            let _span = tracing::info_span!("parse", trial).entered();
            parse_reply(&response.content, expected, self.config.parser_mode)
        };
        tracing::info!("[trial {}] parsed {}/{} answers", trial, parsed.len(), expected);

        let answers = (1..=expected).map(|q| parsed.get(&q).copied()).collect();

        Ok(TrialRow { trial, answers })
    }

    /// Call the provider, retrying transient failures up to the attempt
    /// budget. Fatal errors propagate immediately.
    async fn complete_with_retry(&self, trial: u32) -> ProviderResult<CompletionResponse> {
        let mut request =
            CompletionRequest::new(vec![Message::user(&self.survey.prompt)], self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                tracing::info!(
                    "[trial {}] attempt {}/{} on {}",
                    trial,
                    attempt,
                    self.config.max_attempts,
                    self.provider.name()
                );
            }

            match self.try_complete(&request).await {
                Ok(response) => return Ok(response),
                Err(ProviderError::RateLimited { retry_after_ms }) => {
                    let wait = retry_after_ms.unwrap_or(self.config.rate_limit_delay_ms);
                    if attempt < self.config.max_attempts {
                        tracing::warn!("[trial {}] rate limited, waiting {}ms", trial, wait);
                        sleep(Duration::from_millis(wait)).await;
                    }
                    last_error = Some(ProviderError::RateLimited { retry_after_ms });
                }
                Err(e) if e.is_transient() => {
                    if attempt < self.config.max_attempts {
                        tracing::warn!(
                            "[trial {}] transient error: {}, waiting {}ms",
                            trial,
                            e,
                            self.config.retry_delay_ms
                        );
                        sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                    last_error = Some(e);
                }
                // Auth and invalid-request failures cannot be fixed by
                // retrying.
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::Config("no attempts were made".to_string())))
    }

    /// Single attempt with a timeout
    async fn try_complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    /// Clone the executor for spawning trials
    fn clone_for_trial(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            survey: self.survey.clone(),
            config: self.config.clone(),
            semaphore: self.semaphore.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Test double: fails specific calls fatally, fails the first
    /// `transient_failures` calls with a 500, answers everything else
    /// with a fixed labeled reply.
    struct ScriptedProvider {
        calls: AtomicU32,
        fatal_calls: Vec<u32>,
        transient_failures: u32,
        reply: String,
    }

    impl ScriptedProvider {
        fn always_ok(reply: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fatal_calls: Vec::new(),
                transient_failures: 0,
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> ProviderResult<CompletionResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

            if self.fatal_calls.contains(&call) {
                return Err(ProviderError::Auth("bad credentials".to_string()));
            }
            if call <= self.transient_failures {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "hiccup".to_string(),
                });
            }

            Ok(CompletionResponse {
                content: self.reply.clone(),
                model: "scripted".to_string(),
                latency_ms: 1,
            })
        }
    }

    fn fast_config(parallel: usize) -> ExecutorConfig {
        ExecutorConfig {
            parallel_requests: parallel,
            max_attempts: 3,
            retry_delay_ms: 1,
            rate_limit_delay_ms: 1,
            timeout_ms: 5_000,
            ..Default::default()
        }
    }

    fn survey() -> Arc<Survey> {
        Arc::new(Survey::new("the fourteen questions", 14))
    }

    #[tokio::test]
    async fn test_all_trials_succeed() {
        let provider = Arc::new(ScriptedProvider::always_ok("1: A\n2: 110"));
        let executor = Executor::new(provider, survey(), fast_config(3));

        let rows = executor.run(5).await;

        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.trial, i as u32 + 1);
            assert_eq!(row.answers.len(), 14);
            assert_eq!(row.answers[0], Some(Answer::Letter('A')));
            assert_eq!(row.answers[1], Some(Answer::Number(110.0)));
            assert_eq!(row.answers[2], None);
        }
    }

    #[tokio::test]
    async fn test_fatal_failures_excluded_batch_continues() {
        let provider = Arc::new(ScriptedProvider {
            calls: AtomicU32::new(0),
            fatal_calls: vec![3, 7],
            transient_failures: 0,
            reply: "1: B".to_string(),
        });
        let executor = Executor::new(provider.clone(), survey(), fast_config(3));

        let rows = executor.run(10).await;

        // Two calls failed fatally (no retries burned), so exactly 8 rows.
        assert_eq!(rows.len(), 8);
        assert!(rows.windows(2).all(|w| w[0].trial < w[1].trial));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_transient_retry_is_transparent() {
        // First two calls return 500; the retry budget absorbs them and
        // the row looks identical to an immediate success.
        let provider = Arc::new(ScriptedProvider {
            calls: AtomicU32::new(0),
            fatal_calls: Vec::new(),
            transient_failures: 2,
            reply: "1: A\n2: 110".to_string(),
        });
        let executor = Executor::new(provider.clone(), survey(), fast_config(1));

        let rows = executor.run(1).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trial, 1);
        assert_eq!(rows[0].answers[0], Some(Answer::Letter('A')));
        assert_eq!(rows[0].answers[1], Some(Answer::Number(110.0)));
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let provider = Arc::new(ScriptedProvider {
            calls: AtomicU32::new(0),
            fatal_calls: Vec::new(),
            transient_failures: 100,
            reply: String::new(),
        });
        let executor = Executor::new(provider.clone(), survey(), fast_config(1));

        let rows = executor.run(1).await;

        assert!(rows.is_empty());
        // 3 attempts total, not 1 + 3 retries.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let provider = Arc::new(ScriptedProvider {
            calls: AtomicU32::new(0),
            fatal_calls: vec![1],
            transient_failures: 0,
            reply: String::new(),
        });
        let executor = Executor::new(provider.clone(), survey(), fast_config(1));

        let rows = executor.run(1).await;

        assert!(rows.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rows_sorted_under_concurrency() {
        let provider = Arc::new(ScriptedProvider::always_ok("1: A"));
        let executor = Executor::new(provider, survey(), fast_config(8));

        let rows = executor.run(20).await;

        let trials: Vec<u32> = rows.iter().map(|r| r.trial).collect();
        assert_eq!(trials, (1..=20).collect::<Vec<u32>>());
    }
}
