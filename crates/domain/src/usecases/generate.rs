//! Generate use case - research a topic and turn the result into a thread

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    model::{ResearchReport, ResearchRequest, ThreadDraft, ThreadMode},
    ports::{Clock, ResearchError, Researcher, SystemClock},
    splitter::{SplitConfig, SplitError, Splitter},
    usecases::retry::RetryPolicy,
};

/// Configuration for thread generation
#[derive(Debug, Clone, Default)]
pub struct GenerateConfig {
    /// Splitter settings (limit, markers, hashtags, cap)
    pub split: SplitConfig,
    /// Local split or provider-composed posts
    pub mode: ThreadMode,
    /// Retry applied to rate-limited research calls
    pub retry: RetryPolicy,
}

/// Errors from thread generation
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Research failed: {0}")]
    Research(#[from] ResearchError),
    #[error("Research returned no content")]
    EmptyResearch,
    #[error("Failed to split thread: {0}")]
    Split(#[from] SplitError),
}

/// Use case producing a [`ThreadDraft`] from a topic
pub struct GenerateThread<R> {
    researcher: R,
    splitter: Splitter,
    config: GenerateConfig,
    clock: Arc<dyn Clock>,
}

impl<R: Researcher> GenerateThread<R> {
    pub fn new(researcher: R, config: GenerateConfig) -> Self {
        Self {
            researcher,
            splitter: Splitter::new(config.split.clone()),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Research the topic and build a draft thread
    pub async fn generate(&self, request: &ResearchRequest) -> Result<ThreadDraft, GenerateError> {
        tracing::info!(
            topic = %request.topic,
            depth = request.depth.as_str(),
            provider = self.researcher.provider(),
            "Researching topic"
        );

        let report = self.research(request).await?;
        if report.is_empty() {
            return Err(GenerateError::EmptyResearch);
        }

        tracing::info!(
            findings = report.key_findings.len(),
            citations = report.citations.len(),
            "Research complete"
        );

        let thread = match self.config.mode {
            ThreadMode::Split => {
                let text = report.to_text();
                match self.post_limit(request.style.target_posts) {
                    Some(limit) => self.splitter.split_within(&text, limit)?,
                    None => self.splitter.split(&text)?,
                }
            }
            ThreadMode::Compose => {
                // The requested length is already part of the compose prompt
                let posts = self.compose(&report, request).await?;
                match self.post_limit(None) {
                    Some(limit) => self.splitter.normalize_within(&posts, limit)?,
                    None => self.splitter.normalize(&posts)?,
                }
            }
        };

        tracing::info!(posts = thread.len(), "Thread generated");

        Ok(ThreadDraft {
            id: Uuid::new_v4(),
            topic: request.topic.clone(),
            thread,
            report: Some(report),
            created_at: self.clock.now(),
        })
    }

    /// Smaller of the requested post count and the configured cap
    fn post_limit(&self, target_posts: Option<usize>) -> Option<usize> {
        let target = target_posts.filter(|n| *n > 0);
        match (target, self.config.split.max_posts) {
            (Some(target), Some(max)) => Some(target.min(max)),
            (target, max) => target.or(max),
        }
    }

    async fn research(&self, request: &ResearchRequest) -> Result<ResearchReport, ResearchError> {
        let mut retry = 0;
        loop {
            match self.researcher.research(request).await {
                Ok(report) => return Ok(report),
                Err(error) => {
                    retry += 1;
                    let Some(delay) = self.rate_limit_delay(&error, retry) else {
                        return Err(error);
                    };
                    tracing::warn!(
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "Research rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn compose(
        &self,
        report: &ResearchReport,
        request: &ResearchRequest,
    ) -> Result<Vec<String>, ResearchError> {
        let mut retry = 0;
        loop {
            match self.researcher.compose(report, request).await {
                Ok(posts) => return Ok(posts),
                Err(error) => {
                    retry += 1;
                    let Some(delay) = self.rate_limit_delay(&error, retry) else {
                        return Err(error);
                    };
                    tracing::warn!(
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "Compose rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn rate_limit_delay(&self, error: &ResearchError, retry: u32) -> Option<std::time::Duration> {
        match error {
            ResearchError::RateLimited(after) => self.config.retry.next_delay(retry, *after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResearchDepth, ThreadStyle, char_len};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;

    struct FakeResearcher {
        report: ResearchReport,
        composed: Vec<String>,
        rate_limits: AtomicUsize,
        calls: AtomicUsize,
        seen_topics: Mutex<Vec<String>>,
    }

    impl FakeResearcher {
        fn new(report: ResearchReport) -> Self {
            Self {
                report,
                composed: vec![],
                rate_limits: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                seen_topics: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Researcher for FakeResearcher {
        async fn research(
            &self,
            request: &ResearchRequest,
        ) -> Result<ResearchReport, ResearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_topics.lock().unwrap().push(request.topic.clone());
            if self.rate_limits.load(Ordering::SeqCst) > 0 {
                self.rate_limits.fetch_sub(1, Ordering::SeqCst);
                return Err(ResearchError::RateLimited(None));
            }
            Ok(self.report.clone())
        }

        async fn compose(
            &self,
            _report: &ResearchReport,
            _request: &ResearchRequest,
        ) -> Result<Vec<String>, ResearchError> {
            Ok(self.composed.clone())
        }

        fn provider(&self) -> &'static str {
            "fake"
        }
    }

    fn request() -> ResearchRequest {
        ResearchRequest::new("Rust adoption", ResearchDepth::Quick, ThreadStyle::default())
            .unwrap()
    }

    fn report() -> ResearchReport {
        ResearchReport {
            analysis: "Rust keeps growing in systems programming. Teams cite memory safety."
                .to_string(),
            key_findings: vec![
                "Large companies ship Rust in production".to_string(),
                "Compile times remain a common complaint".to_string(),
            ],
            citations: vec!["https://example.com/survey".to_string()],
        }
    }

    fn config(max_chars: usize) -> GenerateConfig {
        GenerateConfig {
            split: SplitConfig {
                max_chars,
                ..Default::default()
            },
            mode: ThreadMode::Split,
            retry: RetryPolicy::immediate(1),
        }
    }

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[tokio::test]
    async fn test_generate_splits_research_text() {
        let created_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let usecase = GenerateThread::new(FakeResearcher::new(report()), config(80))
            .with_clock(Arc::new(FixedClock(created_at)));

        let draft = usecase.generate(&request()).await.unwrap();

        assert_eq!(draft.topic, "Rust adoption");
        assert_eq!(draft.created_at, created_at);
        assert!(draft.thread.len() > 1);
        assert!(draft.thread.posts.iter().all(|p| char_len(p) <= 80));
        assert_eq!(draft.report, Some(report()));
    }

    #[tokio::test]
    async fn test_generate_retries_rate_limit_once() {
        let researcher = FakeResearcher::new(report());
        researcher.rate_limits.store(1, Ordering::SeqCst);
        let usecase = GenerateThread::new(researcher, config(280));

        let draft = usecase.generate(&request()).await.unwrap();

        assert!(!draft.thread.is_empty());
        assert_eq!(usecase.researcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generate_gives_up_after_retry_budget() {
        let researcher = FakeResearcher::new(report());
        researcher.rate_limits.store(5, Ordering::SeqCst);
        let usecase = GenerateThread::new(researcher, config(280));

        let result = usecase.generate(&request()).await;

        assert!(matches!(
            result,
            Err(GenerateError::Research(ResearchError::RateLimited(_)))
        ));
        assert_eq!(usecase.researcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_research_is_an_error() {
        let usecase =
            GenerateThread::new(FakeResearcher::new(ResearchReport::default()), config(280));

        let result = usecase.generate(&request()).await;

        assert!(matches!(result, Err(GenerateError::EmptyResearch)));
    }

    fn long_report() -> ResearchReport {
        ResearchReport {
            analysis: (1..=12)
                .map(|i| format!("Observation {} about adoption is worth a post.", i))
                .collect::<Vec<_>>()
                .join(" "),
            key_findings: vec!["Hiring for Rust roles keeps growing".to_string()],
            citations: vec![],
        }
    }

    fn request_with_posts(target_posts: Option<usize>) -> ResearchRequest {
        let style = ThreadStyle {
            target_posts,
            ..Default::default()
        };
        ResearchRequest::new("Rust adoption", ResearchDepth::Comprehensive, style).unwrap()
    }

    #[tokio::test]
    async fn test_requested_post_count_bounds_split_thread() {
        let usecase = GenerateThread::new(FakeResearcher::new(long_report()), config(60));

        let unbounded = usecase.generate(&request_with_posts(None)).await.unwrap();
        let bounded = usecase.generate(&request_with_posts(Some(2))).await.unwrap();

        assert!(unbounded.thread.len() > 2);
        assert_eq!(bounded.thread.len(), 2);
        assert_eq!(bounded.thread.posts[..], unbounded.thread.posts[..2]);
    }

    #[tokio::test]
    async fn test_post_cap_trims_long_research_instead_of_failing() {
        let mut generate = config(60);
        generate.split.max_posts = Some(4);
        let usecase = GenerateThread::new(FakeResearcher::new(long_report()), generate);

        let draft = usecase.generate(&request_with_posts(None)).await.unwrap();
        assert_eq!(draft.thread.len(), 4);

        let draft = usecase.generate(&request_with_posts(Some(9))).await.unwrap();
        assert_eq!(draft.thread.len(), 4);
    }

    #[tokio::test]
    async fn test_compose_mode_normalizes_posts() {
        let mut researcher = FakeResearcher::new(report());
        researcher.composed = vec![
            "1/2 Rust is everywhere now.".to_string(),
            "2/2 Learn it this year.".to_string(),
        ];
        let usecase = GenerateThread::new(
            researcher,
            GenerateConfig {
                mode: ThreadMode::Compose,
                ..config(280)
            },
        );

        let draft = usecase.generate(&request()).await.unwrap();

        assert_eq!(
            draft.thread.posts,
            vec!["Rust is everywhere now.", "Learn it this year."]
        );
    }
}
