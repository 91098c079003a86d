//! Research pass: drive the multi-turn conversation until the service
//! produces a final document.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::frontmatter::strip_preamble;
use crate::core::types::Usage;
use crate::io::client::{
    ContentBlock, Message, MessageRequest, MessagesClient, web_search_tool,
};
use crate::io::config::DigestConfig;
use crate::io::retry::{RetryPolicy, Sleeper, call_with_retries};

/// Opening instruction of every research conversation.
pub const KICKOFF_MESSAGE: &str = "Research this week's AI security news and produce the digest now. \
Use web search across all 7 categories. \
Your final output must be ONLY the Markdown file starting with --- (frontmatter). \
No preamble or commentary.";

/// Reply sent when the service pauses mid-task.
pub const CONTINUE_MESSAGE: &str = "Continue.";

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("research pass did not finish within {max_turns} turns")]
    TurnLimitExceeded { max_turns: u32 },

    #[error("research pass produced no output")]
    EmptyOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutput {
    /// Final document with any preamble removed.
    pub document: String,
    /// Usage summed over every turn.
    pub usage: Usage,
    pub turns: u32,
    /// Characters of commentary dropped before the header.
    pub preamble_stripped: usize,
}

/// Run the research conversation.
///
/// Every turn goes through the retry layer. Turns after the first are preceded
/// by the configured cooldown. A paused response is echoed back with a
/// `Continue.` message; any other stop ends the loop.
#[instrument(skip_all, fields(model = %config.model, max_turns = config.max_turns))]
pub fn run_research_pass<C, S>(
    client: &C,
    sleeper: &S,
    config: &DigestConfig,
    system_prompt: &str,
) -> Result<ResearchOutput>
where
    C: MessagesClient + ?Sized,
    S: Sleeper + ?Sized,
{
    let policy = RetryPolicy::from_config(&config.retry);
    let tools = if config.search.enabled {
        vec![web_search_tool(config.search.max_uses)]
    } else {
        Vec::new()
    };
    let mut request = MessageRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system: Some(system_prompt.to_string()),
        tools,
        messages: vec![Message::user(KICKOFF_MESSAGE)],
    };

    let mut usage = Usage::default();
    let mut turn = 0;
    loop {
        if turn >= config.max_turns {
            return Err(ResearchError::TurnLimitExceeded {
                max_turns: config.max_turns,
            }
            .into());
        }
        if turn > 0 {
            info!(
                delay_secs = config.turn_delay_secs,
                "pausing between turns"
            );
            sleeper.sleep(config.turn_delay());
        }
        turn += 1;

        let response = call_with_retries(client, sleeper, &policy, &request)
            .with_context(|| format!("research turn {turn}"))?;
        usage += response.usage;
        debug!(
            turn,
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "research turn complete"
        );

        if response.wants_continuation() {
            request.messages.push(Message::assistant(response.content));
            request
                .messages
                .push(Message::user_blocks(vec![ContentBlock::from_text(
                    CONTINUE_MESSAGE,
                )]));
            continue;
        }

        let raw = response.text();
        let (document, preamble_stripped) = strip_preamble(&raw);
        if preamble_stripped > 0 {
            info!(chars = preamble_stripped, "stripped preamble before header");
        }
        if document.trim().is_empty() {
            return Err(ResearchError::EmptyOutput.into());
        }
        info!(
            turns = turn,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "research pass finished"
        );
        return Ok(ResearchOutput {
            document: document.to_string(),
            usage,
            turns: turn,
            preamble_stripped,
        });
    }
}
