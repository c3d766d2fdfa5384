//! Builds the full instruction payload for the completion API and parses
//! structured artifacts back out of the raw reply.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chat::{ConversationContext, Message};
use crate::error::Result;
use crate::intent::IntentClassifier;
use crate::llm::{CompletionClient, PromptMessage, Role, SamplingParams};

/// How many trailing log messages are sent as the conversation window.
const CONVERSATION_WINDOW: usize = 10;

const FALLBACK_REDIRECT: &str = "I'm here to help you learn about Dhruba's projects, skills, and experience. Please ask me anything related to his work, development approach, or how to get in touch with him!";

pub const DEFAULT_SUGGESTED_QUESTIONS: &[&str] = &[
    "Tell me about Dhruba's projects",
    "What technologies does he use?",
    "How does AI orchestration work?",
    "How can I contact Dhruba?",
];

const PROJECT_REFERENCE_KEYWORDS: &[&str] = &["event manager", "gitiq", "portfolio", "nit silchar"];

/// A parsed assistant reply. Parsing is best-effort: absent patterns yield
/// empty fields, never errors.
#[derive(Debug, Clone, Default)]
pub struct AssistantReply {
    pub message: String,
    pub suggested_questions: Vec<String>,
    pub project_references: Vec<String>,
    pub code_snippets: Vec<CodeSnippet>,
    pub links: Vec<ReplyLink>,
}

#[derive(Debug, Clone)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ReplyLink {
    pub text: String,
    pub url: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    GitHub,
    Demo,
    External,
}

pub struct PromptComposer {
    client: Arc<dyn CompletionClient>,
    classifier: IntentClassifier,
    owner_name: String,
    owner_title: String,
    params: SamplingParams,
}

impl PromptComposer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            classifier: IntentClassifier::new(),
            owner_name: "Dhruba Kumar Agarwalla".to_string(),
            owner_title: "AI-Orchestrated Full-Stack Developer".to_string(),
            params: SamplingParams::default(),
        }
    }

    pub fn with_owner(mut self, name: impl Into<String>, title: impl Into<String>) -> Self {
        self.owner_name = name.into();
        self.owner_title = title.into();
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    /// Generate the assistant's reply for the current turn. An off-topic
    /// final user message short-circuits to the fixed redirect without any
    /// network call.
    pub async fn generate_response(
        &self,
        messages: &[Message],
        context: &ConversationContext,
        additional_context: &str,
    ) -> Result<AssistantReply> {
        let last_user_message = messages.iter().rev().find(|m| m.role == Role::User);
        if let Some(last) = last_user_message {
            if self.classifier.is_off_topic(&last.content) {
                return Ok(redirect_reply());
            }
        }

        let mut system_prompt = self.system_prompt(context);
        if !additional_context.is_empty() {
            system_prompt.push_str("\n\nADDITIONAL CONTEXT:\n");
            system_prompt.push_str(additional_context);
        }

        let window_start = messages.len().saturating_sub(CONVERSATION_WINDOW);
        let mut wire = Vec::with_capacity(CONVERSATION_WINDOW + 1);
        wire.push(PromptMessage::system(system_prompt));
        wire.extend(messages[window_start..].iter().map(|m| PromptMessage {
            role: m.role,
            content: m.content.clone(),
        }));

        let completion = self.client.complete(&wire, &self.params).await?;

        Ok(parse_reply(&completion.content))
    }

    /// The fixed persona, style rules, knowledge block, and serialized
    /// conversation context.
    pub fn system_prompt(&self, context: &ConversationContext) -> String {
        let owner = &self.owner_name;
        let title = &self.owner_title;
        let context_json =
            serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());

        format!(
            r#"You are {owner}'s AI assistant, representing a {title} from NIT Silchar.

PERSONALITY & TONE:
- Professional yet approachable
- Concise and to-the-point
- Enthusiastic about AI-driven development
- Confident but not arrogant
- Always helpful and informative

RESPONSE STYLE:
- Keep responses SHORT and CONCISE (2-3 sentences max for simple questions)
- Only provide detailed explanations when specifically asked for details
- Use bullet points for lists to save space
- Avoid repetitive information
- Get straight to the point

CORE KNOWLEDGE:
{owner} is an AI-Orchestrated Full-Stack Developer and 2nd year Civil Engineering student at NIT Silchar. He specializes in AI collaboration, prompt engineering, and building large-scale applications through strategic AI orchestration.

MAJOR PROJECTS:
1. Event Manager (75k lines) - Event management platform, 70% faster registration, React/Node.js/Firebase
2. GitIQ (40k lines) - AI repository analysis, 0.12s per commit, multi-AI integration
3. Portfolio (15k lines) - This website, cyberpunk design, React/TypeScript

DEVELOPMENT PHILOSOPHY:
- Proves that AI can handle production-scale complexity
- Strategic AI collaboration over traditional coding
- Continuous learning from setbacks and improvements
- Goal: Bridge AI/ML with web development

CONTACT INFO:
- Email: dhrubagarwala67@gmail.com
- Phone: +91 9395386870
- GitHub: https://github.com/DhrubaAgarwalla
- LinkedIn: https://www.linkedin.com/in/dhruba-kumar-agarwalla-7a5346270/
- Location: NIT Silchar, Assam, India

RESPONSE GUIDELINES:
- Keep answers SHORT (1-3 sentences for basic questions)
- Only elaborate when asked for "details" or "more information"
- Use bullet points for lists
- Include relevant project examples briefly
- Offer to elaborate: "Want more details about [topic]?"
- For simple questions like "Who is Dhruba?", give a 1-2 sentence answer
- Save detailed explanations for when specifically requested
- ONLY answer questions about Dhruba, his projects, skills, or work-related topics
- If asked about unrelated topics, politely redirect to Dhruba-related questions

Current conversation context: {context_json}

Remember: Keep responses SHORT unless asked for details. You represent {owner} professionally."#
        )
    }
}

fn redirect_reply() -> AssistantReply {
    AssistantReply {
        message: FALLBACK_REDIRECT.to_string(),
        suggested_questions: DEFAULT_SUGGESTED_QUESTIONS
            .iter()
            .map(|q| q.to_string())
            .collect(),
        ..Default::default()
    }
}

/// Best-effort extraction of structured artifacts from the raw reply text.
fn parse_reply(message: &str) -> AssistantReply {
    let lower = message.to_lowercase();

    let suggested_questions = Regex::new(r"SUGGESTED_QUESTIONS:[ \t]*([^\n]*)")
        .unwrap()
        .captures(message)
        .map(|c| {
            c[1].split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let project_references = PROJECT_REFERENCE_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect();

    let code_re = Regex::new(r"(?s)```(\w+)?\n(.*?)```").unwrap();
    let code_snippets = code_re
        .captures_iter(message)
        .map(|c| CodeSnippet {
            language: c
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "text".to_string()),
            code: c[2].to_string(),
        })
        .collect();

    let link_re = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    let links = link_re
        .captures_iter(message)
        .map(|c| {
            let url = c[2].to_string();
            ReplyLink {
                text: c[1].to_string(),
                kind: classify_link(&url),
                url,
            }
        })
        .collect();

    AssistantReply {
        message: message.to_string(),
        suggested_questions,
        project_references,
        code_snippets,
        links,
    }
}

fn classify_link(url: &str) -> LinkKind {
    if url.contains("github.com") {
        LinkKind::GitHub
    } else if url.contains("vercel.app") || url.contains("demo") {
        LinkKind::Demo
    } else {
        LinkKind::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::Completion;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeCompletion {
        reply: String,
        calls: AtomicUsize,
        seen_messages: Mutex<Vec<PromptMessage>>,
    }

    impl FakeCompletion {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                calls: AtomicUsize::new(0),
                seen_messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for FakeCompletion {
        async fn complete(
            &self,
            messages: &[PromptMessage],
            _params: &SamplingParams,
        ) -> std::result::Result<Completion, AssistantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_messages.lock().unwrap() = messages.to_vec();
            Ok(Completion {
                content: self.reply.clone(),
                usage: None,
            })
        }
    }

    fn user_message(content: &str) -> Message {
        Message {
            id: format!("msg_0_{}", content.len()),
            role: Role::User,
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn off_topic_short_circuits_without_network_call() {
        let client = Arc::new(FakeCompletion::new("should never be used"));
        let composer = PromptComposer::new(client.clone());

        let messages = vec![user_message("What will the weather be tomorrow?")];
        let reply = composer
            .generate_response(&messages, &ConversationContext::default(), "")
            .await
            .unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(reply.message.contains("Dhruba's projects"));
        assert_eq!(reply.suggested_questions.len(), 4);
    }

    #[tokio::test]
    async fn window_is_system_plus_last_ten() {
        let client = Arc::new(FakeCompletion::new("Sure."));
        let composer = PromptComposer::new(client.clone());

        let messages: Vec<Message> = (0..15)
            .map(|i| user_message(&format!("question about GitIQ number {i}")))
            .collect();
        composer
            .generate_response(&messages, &ConversationContext::default(), "")
            .await
            .unwrap();

        let seen = client.seen_messages.lock().unwrap();
        assert_eq!(seen.len(), 11);
        assert_eq!(seen[0].role, Role::System);
        assert!(seen[1].content.contains("number 5"));
        assert!(seen[10].content.contains("number 14"));
    }

    #[tokio::test]
    async fn additional_context_is_appended_to_system_prompt() {
        let client = Arc::new(FakeCompletion::new("Sure."));
        let composer = PromptComposer::new(client.clone());

        let messages = vec![user_message("tell me about the event manager project")];
        composer
            .generate_response(
                &messages,
                &ConversationContext::default(),
                "\nDETAILED PROJECT CONTEXT for X\n",
            )
            .await
            .unwrap();

        let seen = client.seen_messages.lock().unwrap();
        assert!(seen[0].content.contains("ADDITIONAL CONTEXT:"));
        assert!(seen[0].content.contains("DETAILED PROJECT CONTEXT for X"));
    }

    #[test]
    fn parses_suggested_question_marker() {
        let reply = parse_reply(
            "Here you go.\nSUGGESTED_QUESTIONS: What is GitIQ?, How can I contact Dhruba?",
        );
        assert_eq!(
            reply.suggested_questions,
            vec!["What is GitIQ?", "How can I contact Dhruba?"]
        );
    }

    #[test]
    fn detects_project_references() {
        let reply = parse_reply("GitIQ and the Event Manager are his biggest projects.");
        assert_eq!(reply.project_references, vec!["event manager", "gitiq"]);
    }

    #[test]
    fn extracts_code_blocks_with_default_language() {
        let reply = parse_reply("Example:\n```rust\nfn main() {}\n```\nand\n```\nplain\n```");
        assert_eq!(reply.code_snippets.len(), 2);
        assert_eq!(reply.code_snippets[0].language, "rust");
        assert_eq!(reply.code_snippets[0].code, "fn main() {}\n");
        assert_eq!(reply.code_snippets[1].language, "text");
    }

    #[test]
    fn classifies_links_by_url() {
        let reply = parse_reply(
            "[repo](https://github.com/DhrubaAgarwalla/GitIQ) \
             [live](https://git-iq.vercel.app/) \
             [blog](https://example.com/post)",
        );
        let kinds: Vec<LinkKind> = reply.links.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LinkKind::GitHub, LinkKind::Demo, LinkKind::External]
        );
    }
}
