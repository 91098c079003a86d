//! Review pass: one self-review call over the generated document.

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::Usage;
use crate::core::verdict::{ReviewVerdict, parse_verdict};
use crate::io::client::{Message, MessageRequest, MessagesClient};
use crate::io::config::DigestConfig;
use crate::io::prompt::PromptEngine;
use crate::io::retry::{RetryPolicy, Sleeper, call_with_retries};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub verdict: ReviewVerdict,
    /// Document to carry forward.
    pub document: String,
    pub usage: Usage,
}

/// Ask the service to approve or correct `document`.
///
/// The request has no system instruction and no tools. Responses that are
/// neither approval nor correction keep the original document.
#[instrument(skip_all, fields(model = %config.model, document_chars = document.len()))]
pub fn run_review_pass<C, S>(
    client: &C,
    sleeper: &S,
    config: &DigestConfig,
    prompts: &PromptEngine,
    document: &str,
) -> Result<ReviewOutcome>
where
    C: MessagesClient + ?Sized,
    S: Sleeper + ?Sized,
{
    let request = MessageRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system: None,
        tools: Vec::new(),
        messages: vec![Message::user(prompts.render_review(document)?)],
    };
    let policy = RetryPolicy::from_config(&config.retry);
    let response =
        call_with_retries(client, sleeper, &policy, &request).context("review call")?;

    let verdict = parse_verdict(&response.text());
    if let ReviewVerdict::Unrecognized(excerpt) = &verdict {
        warn!(excerpt = %excerpt, "unexpected review response, keeping original document");
    }
    info!(verdict = ?verdict.label(), "review pass finished");

    Ok(ReviewOutcome {
        document: verdict.resolve(document),
        verdict,
        usage: response.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::verdict::VerdictLabel;
    use crate::io::client::MessageContent;
    use crate::test_support::{RecordingSleeper, ScriptedClient, final_response};

    fn review(reply: &str) -> (ReviewOutcome, ScriptedClient) {
        let client = ScriptedClient::new(vec![Ok(final_response(reply))]);
        let sleeper = RecordingSleeper::default();
        let prompts = PromptEngine::embedded().expect("prompts");
        let outcome = run_review_pass(
            &client,
            &sleeper,
            &DigestConfig::default(),
            &prompts,
            "---\ntitle: draft\n---\n",
        )
        .expect("review");
        (outcome, client)
    }

    #[test]
    fn request_embeds_document_without_system_or_tools() {
        let (_, client) = review("APPROVED");
        let request = &client.requests()[0];
        assert!(request.system.is_none());
        assert!(request.tools.is_empty());
        let MessageContent::Text(text) = &request.messages[0].content else {
            panic!("expected plain text message");
        };
        assert!(text.contains("## Digest to Review"));
        assert!(text.ends_with("---\ntitle: draft\n---\n"));
    }

    #[test]
    fn approval_keeps_document() {
        let (outcome, _) = review("APPROVED - looks fine");
        assert_eq!(outcome.verdict, ReviewVerdict::Approved);
        assert_eq!(outcome.document, "---\ntitle: draft\n---\n");
        assert_eq!(outcome.usage, final_response("").usage);
    }

    #[test]
    fn correction_replaces_document() {
        let (outcome, _) = review("CORRECTED\n```markdown\n---\ntitle: fixed\n---\n```");
        assert_eq!(outcome.verdict.label(), VerdictLabel::Corrected);
        assert_eq!(outcome.document, "---\ntitle: fixed\n---");
    }

    #[test]
    fn unexpected_reply_keeps_document() {
        let (outcome, _) = review("Sure! Here's my review.");
        assert_eq!(outcome.verdict.label(), VerdictLabel::Unexpected);
        assert_eq!(outcome.document, "---\ntitle: draft\n---\n");
    }
}
