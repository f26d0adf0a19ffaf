//! Stub researcher for testing and offline mode

use async_trait::async_trait;
use threadsmith_domain::{ResearchError, ResearchReport, ResearchRequest, Researcher};

/// Stub researcher that returns deterministic or configured responses
pub struct StubResearcher {
    report: Option<ResearchReport>,
    posts: Option<Vec<String>>,
    error: Option<ResearchError>,
}

impl StubResearcher {
    /// Create a stub that writes a canned report about whatever topic it gets
    pub fn canned() -> Self {
        Self {
            report: None,
            posts: None,
            error: None,
        }
    }

    /// Create a stub that returns a specific report
    pub fn with_report(report: ResearchReport) -> Self {
        Self {
            report: Some(report),
            ..Self::canned()
        }
    }

    /// Create a stub whose compose step returns these posts
    pub fn with_posts(mut self, posts: Vec<String>) -> Self {
        self.posts = Some(posts);
        self
    }

    /// Create a stub that always returns an error
    pub fn with_error(error: ResearchError) -> Self {
        Self {
            error: Some(error),
            ..Self::canned()
        }
    }

    fn canned_report(topic: &str) -> ResearchReport {
        ResearchReport {
            analysis: format!(
                "{topic} has drawn steady attention over the past year. \
                 Supporters point to concrete gains in everyday use. \
                 Critics argue that the evidence is still thin and uneven. \
                 Most observers agree that the next few years will be decisive."
            ),
            key_findings: vec![
                format!("Interest in {topic} keeps rising across communities"),
                "Early adopters report measurable benefits".to_string(),
                "Open questions remain about cost and long-term effects".to_string(),
            ],
            citations: vec!["https://example.com/stub-source".to_string()],
        }
    }
}

impl Default for StubResearcher {
    fn default() -> Self {
        Self::canned()
    }
}

#[async_trait]
impl Researcher for StubResearcher {
    async fn research(&self, request: &ResearchRequest) -> Result<ResearchReport, ResearchError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        Ok(self
            .report
            .clone()
            .unwrap_or_else(|| Self::canned_report(&request.topic)))
    }

    async fn compose(
        &self,
        report: &ResearchReport,
        _request: &ResearchRequest,
    ) -> Result<Vec<String>, ResearchError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        if let Some(posts) = &self.posts {
            return Ok(posts.clone());
        }

        // One post for the analysis, one per finding
        let mut posts = vec![report.analysis.clone()];
        posts.extend(report.key_findings.iter().cloned());
        Ok(posts)
    }

    fn provider(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadsmith_domain::{ResearchDepth, ThreadStyle};

    fn request() -> ResearchRequest {
        ResearchRequest::new("Home composting", ResearchDepth::Quick, ThreadStyle::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_canned_report_mentions_topic() {
        let report = StubResearcher::canned().research(&request()).await.unwrap();

        assert!(report.analysis.starts_with("Home composting"));
        assert_eq!(report.key_findings.len(), 3);
    }

    #[tokio::test]
    async fn test_configured_report_and_default_compose() {
        let stub = StubResearcher::with_report(ResearchReport {
            analysis: "Bins need air.".to_string(),
            key_findings: vec!["Turn weekly".to_string()],
            citations: vec![],
        });

        let report = stub.research(&request()).await.unwrap();
        assert_eq!(report.analysis, "Bins need air.");
        assert_eq!(
            stub.compose(&report, &request()).await.unwrap(),
            vec!["Bins need air.", "Turn weekly"]
        );
    }

    #[tokio::test]
    async fn test_error_stub() {
        let stub = StubResearcher::with_error(ResearchError::Timeout);

        assert!(matches!(
            stub.research(&request()).await,
            Err(ResearchError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_compose_uses_configured_posts() {
        let stub = StubResearcher::canned().with_posts(vec!["Hello.".to_string()]);
        let report = stub.research(&request()).await.unwrap();

        assert_eq!(
            stub.compose(&report, &request()).await.unwrap(),
            vec!["Hello."]
        );
    }
}
