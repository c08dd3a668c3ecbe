//! Function-calling orchestrator.
//!
//! Drives the two-step completion flow: an intent check gates the
//! query, then one completion with tool schemas decides whether data
//! lookups are needed, and a follow-up completion composes the final
//! answer from the tool results. Answers are expected to end with a
//! `Sources:` footer which is extracted into the structured response.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use devdesk_core::error::DevDeskError;
use devdesk_core::types::{QueryOutcome, QueryType};

use crate::client::{AssistantReply, ChatClient, ChatMessage, ChatRequest};
use crate::tools::{self, ToolCall, ToolRegistry};

const SYSTEM_PROMPT: &str = "\
You are DevDesk, a helpful assistant for the development team. \
You have access to internal documentation, team information, Jira tickets, and deployment data.

Your role is to:
1. Answer questions about internal processes and policies
2. Provide information about team members, Jira tickets, and deployments
3. Be helpful and professional in your responses
4. Provide clear, direct answers

CRITICAL: You MUST include a sources footer with ALL sources you used.
Format your response exactly like this:

Your main answer here...

---
Sources: [list ALL sources you used, separated by commas]

IMPORTANT: You must list EVERY source you used, including:
- Documentation files (like escalation_policy.md, team_structure.md)
- API endpoints (like /api/employees, /api/deployments, /api/jira-tickets)
- Any other data sources mentioned in the context

You MUST include this footer with ALL sources you used, no exceptions.";

const OUT_OF_SCOPE_PROMPT: &str = "\
You are DevDesk, the development team's assistant. Your scope is limited to internal data: \
employees, deployments, Jira tickets, and internal documentation. \
The user's query is outside your capabilities. \
Politely explain this and suggest what you can help with instead. \
If the user refers to something from previous conversation, explicitly mention what they're referring to.";

const OUT_OF_SCOPE_FALLBACK: &str = "\
I apologize, but this query is outside my scope. I can help you with information about \
employees, deployments, Jira tickets, and internal documentation. Please ask me about these topics instead.";

const ERROR_APOLOGY: &str =
    "I apologize, but I encountered an error generating a response. Please try again.";

/// LLM orchestrator with function calling over the reference datasets.
pub struct Agent {
    client: Box<dyn ChatClient>,
    tools: ToolRegistry,
    max_tokens: u32,
}

impl Agent {
    pub fn new(client: Box<dyn ChatClient>, tools: ToolRegistry, max_tokens: u32) -> Self {
        Self {
            client,
            tools,
            max_tokens,
        }
    }

    /// Answer a query given knowledge-base context and conversation history.
    ///
    /// Never fails outright: LLM or tool errors produce an apology
    /// outcome tagged [`QueryType::Error`].
    pub async fn answer(&self, query: &str, kb_context: &str, history: &str) -> QueryOutcome {
        if !self.check_intent(query, history).await {
            info!("Query classified as out of scope");
            return self.deflect_out_of_scope(query, history).await;
        }

        match self.run_tool_flow(query, kb_context, history).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("LLM flow failed: {}", e);
                QueryOutcome {
                    answer: ERROR_APOLOGY.to_string(),
                    sources: Vec::new(),
                    query_type: QueryType::Error,
                }
            }
        }
    }

    /// Ask the LLM whether the query is within scope.
    ///
    /// Errors default to in-scope so a flaky classifier never blocks
    /// legitimate queries.
    async fn check_intent(&self, query: &str, history: &str) -> bool {
        let history_block = if history.is_empty() {
            "No previous conversation"
        } else {
            history
        };

        let prompt = format!(
            "You are an intent classifier for DevDesk, the development team's assistant.\n\n\
             DevDesk can help with:\n\
             - Team information and employee details (names, roles, contact info)\n\
             - Jira tickets and project issues\n\
             - Deployment information\n\
             - Internal documentation and policies\n\
             - Development environment setup\n\
             - Code review processes\n\n\
             IMPORTANT: Consider the conversation history when classifying intent.\n\
             If the user is asking for something that was previously determined to be out of scope,\n\
             maintain consistency and classify it as out of scope.\n\n\
             Conversation History:\n{}\n\n\
             Current Query: \"{}\"\n\n\
             Respond with ONLY \"YES\" if the query suits our app, or \"NO\" if it doesn't.",
            history_block, query
        );

        let request = ChatRequest::new(vec![
            ChatMessage::system("You are an intent classifier. Respond only with YES or NO."),
            ChatMessage::user(prompt),
        ])
        .with_limits(10, 0.1);

        match self.client.complete(request).await {
            Ok(reply) => reply
                .content
                .map(|c| c.trim().to_lowercase().contains("yes"))
                .unwrap_or(true),
            Err(e) => {
                warn!("Intent check failed, defaulting to in-scope: {}", e);
                true
            }
        }
    }

    /// Generate a polite deflection for out-of-scope queries.
    async fn deflect_out_of_scope(&self, query: &str, history: &str) -> QueryOutcome {
        let mut messages = vec![ChatMessage::system(OUT_OF_SCOPE_PROMPT)];
        if !history.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Previous conversation context:\n{}",
                history
            )));
        }
        messages.push(ChatMessage::user(format!("Query: {}", query)));

        let request = ChatRequest::new(messages).with_limits(400, 0.7);
        let answer = match self.client.complete(request).await {
            Ok(reply) => reply.content.unwrap_or_else(|| OUT_OF_SCOPE_FALLBACK.to_string()),
            Err(e) => {
                warn!("Out-of-scope deflection failed: {}", e);
                OUT_OF_SCOPE_FALLBACK.to_string()
            }
        };

        QueryOutcome {
            answer,
            sources: Vec::new(),
            query_type: QueryType::OutOfScope,
        }
    }

    async fn run_tool_flow(
        &self,
        query: &str,
        kb_context: &str,
        history: &str,
    ) -> Result<QueryOutcome, DevDeskError> {
        let mut system = SYSTEM_PROMPT.to_string();
        if !kb_context.is_empty() {
            system.push_str("\n\nRelevant documentation:\n");
            system.push_str(kb_context);
        }
        if !history.is_empty() {
            system.push_str("\n\nRelevant conversation history:\n");
            system.push_str(history);
        }

        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(query)];

        let request = ChatRequest::new(messages.clone())
            .with_tools(tools::tool_schemas())
            .with_limits(self.max_tokens, 0.7);
        let reply = self.client.complete(request).await?;

        let (answer, query_type, tool_sources) = if reply.tool_calls.is_empty() {
            let answer = reply
                .content
                .ok_or_else(|| DevDeskError::Llm("Assistant reply had no content".to_string()))?;
            (answer, QueryType::StaticKnowledge, Vec::new())
        } else {
            let (results_text, tool_sources) = self.execute_tool_calls(&reply)?;

            let first_call_id = reply.tool_calls[0].id.clone();
            messages.push(ChatMessage::assistant_with_tools(
                "I need to call some tools to get the information you requested.",
                reply
                    .tool_calls
                    .iter()
                    .map(|tc| crate::client::ToolCallPayload {
                        id: tc.id.clone(),
                        call_type: "function".to_string(),
                        function: crate::client::FunctionPayload {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            ));
            messages.push(ChatMessage::tool(results_text, first_call_id));

            let request = ChatRequest::new(messages).with_limits(self.max_tokens, 0.7);
            let final_reply = self.client.complete(request).await?;
            let answer = final_reply
                .content
                .ok_or_else(|| DevDeskError::Llm("Final reply had no content".to_string()))?;
            (answer, QueryType::DynamicData, tool_sources)
        };

        let (clean_answer, footer_sources) = extract_sources_footer(&answer);
        // The footer is authoritative; tool endpoints fill in when the
        // model omitted it.
        let sources = if footer_sources.is_empty() {
            tool_sources
        } else {
            footer_sources
        };

        Ok(QueryOutcome {
            answer: clean_answer,
            sources,
            query_type,
        })
    }

    /// Decode and run every requested tool call.
    ///
    /// A hallucinated tool name is not executed; its slot in the results
    /// becomes an error block and the remaining calls still run, so the
    /// composition step keeps whatever valid data was fetched.
    fn execute_tool_calls(
        &self,
        reply: &AssistantReply,
    ) -> Result<(String, Vec<String>), DevDeskError> {
        let mut blocks = Vec::with_capacity(reply.tool_calls.len());
        let mut sources = Vec::new();

        for invocation in &reply.tool_calls {
            let call = match ToolCall::decode(invocation) {
                Ok(call) => call,
                Err(DevDeskError::UnknownTool(name)) => {
                    warn!(tool = %name, "Model requested an unknown tool; skipping");
                    blocks.push(
                        serde_json::json!({"error": format!("Unknown tool: {}", name)})
                            .to_string(),
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            let output = self.tools.execute(&call)?;
            blocks.push(output.text);
            if !sources.iter().any(|s| s == output.source) {
                sources.push(output.source.to_string());
            }
        }

        Ok((blocks.join("\n\n"), sources))
    }
}

fn footer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)sources:\s*(.+)").expect("Invalid footer regex"))
}

/// Strip the `Sources:` footer from an answer.
///
/// Returns the cleaned answer and the comma-separated source list.
pub fn extract_sources_footer(answer: &str) -> (String, Vec<String>) {
    let re = footer_regex();
    let Some(captures) = re.captures(answer) else {
        return (answer.trim().to_string(), Vec::new());
    };

    let sources = captures
        .get(1)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let clean = re.replace(answer, "").to_string();
    let clean = clean
        .trim_end()
        .trim_end_matches('-')
        .trim()
        .to_string();

    (clean, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use devdesk_core::types::{Employee, JiraTicket};
    use devdesk_storage::{Database, DeploymentRepository, EmployeeRepository, TicketRepository};

    use crate::client::{ScriptedClient, ToolInvocation};

    fn make_registry() -> ToolRegistry {
        let db = Arc::new(Database::in_memory().unwrap());
        let employees = Arc::new(EmployeeRepository::new(Arc::clone(&db)));
        let tickets = Arc::new(TicketRepository::new(Arc::clone(&db)));
        let deployments = Arc::new(DeploymentRepository::new(Arc::clone(&db)));

        employees
            .insert(&Employee {
                id: 1,
                name: "Sara Chen".to_string(),
                email: "sara@example.com".to_string(),
                role: "Backend Engineer".to_string(),
                team: "Payments".to_string(),
                jira_username: "schen".to_string(),
            })
            .unwrap();
        tickets
            .insert(&JiraTicket {
                id: "DEV-101".to_string(),
                summary: "Fix login timeout".to_string(),
                assignee: "schen".to_string(),
                status: "In Progress".to_string(),
                priority: "High".to_string(),
            })
            .unwrap();

        ToolRegistry::new(employees, tickets, deployments)
    }

    fn make_agent(replies: Vec<AssistantReply>) -> Agent {
        Agent::new(Box::new(ScriptedClient::new(replies)), make_registry(), 1000)
    }

    fn tool_invocation(name: &str, args: &str) -> ToolInvocation {
        ToolInvocation {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: args.to_string(),
        }
    }

    #[test]
    fn test_footer_extraction() {
        let answer = "Sara is on the Payments team.\n\n---\nSources: /api/employees, team_structure.md";
        let (clean, sources) = extract_sources_footer(answer);
        assert_eq!(clean, "Sara is on the Payments team.");
        assert_eq!(sources, vec!["/api/employees", "team_structure.md"]);
    }

    #[test]
    fn test_footer_extraction_case_insensitive() {
        let (_, sources) = extract_sources_footer("Answer.\nSOURCES: a.md");
        assert_eq!(sources, vec!["a.md"]);
    }

    #[test]
    fn test_no_footer() {
        let (clean, sources) = extract_sources_footer("Just an answer.");
        assert_eq!(clean, "Just an answer.");
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_static_knowledge_flow() {
        // Intent: yes. Main call: direct answer, no tools.
        let agent = make_agent(vec![
            AssistantReply::text("YES"),
            AssistantReply::text("Escalate to the on-call lead.\n\n---\nSources: escalation_policy.md"),
        ]);

        let outcome = agent.answer("How do I escalate?", "", "").await;
        assert_eq!(outcome.query_type, QueryType::StaticKnowledge);
        assert_eq!(outcome.answer, "Escalate to the on-call lead.");
        assert_eq!(outcome.sources, vec!["escalation_policy.md"]);
    }

    #[tokio::test]
    async fn test_dynamic_data_flow_with_tools() {
        let agent = make_agent(vec![
            AssistantReply::text("YES"),
            AssistantReply::with_tool_calls(vec![tool_invocation(
                "get_jira_tickets",
                r#"{"assignee": "schen"}"#,
            )]),
            AssistantReply::text(
                "Sara has one open ticket: DEV-101.\n\n---\nSources: /api/jira-tickets",
            ),
        ]);

        let outcome = agent.answer("What tickets does Sara have?", "", "").await;
        assert_eq!(outcome.query_type, QueryType::DynamicData);
        assert!(outcome.answer.contains("DEV-101"));
        assert_eq!(outcome.sources, vec!["/api/jira-tickets"]);
    }

    #[tokio::test]
    async fn test_tool_results_fed_back_to_llm() {
        let client = ScriptedClient::new(vec![
            AssistantReply::text("YES"),
            AssistantReply::with_tool_calls(vec![tool_invocation("get_employees", "{}")]),
            AssistantReply::text("Answer.\n\nSources: /api/employees"),
        ]);
        let agent = Agent::new(Box::new(client), make_registry(), 1000);

        agent.answer("Who is on the team?", "", "").await;
    }

    #[tokio::test]
    async fn test_unknown_tool_skipped_valid_calls_still_compose() {
        // One hallucinated name next to a valid call: the valid data is
        // still fetched and the flow composes normally.
        let agent = make_agent(vec![
            AssistantReply::text("YES"),
            AssistantReply::with_tool_calls(vec![
                tool_invocation("get_employees", r#"{"name": "Sara"}"#),
                tool_invocation("made_up_tool", "{}"),
            ]),
            AssistantReply::text("Sara Chen is a Backend Engineer.\n\nSources: /api/employees"),
        ]);

        let outcome = agent.answer("Who is Sara?", "", "").await;
        assert_eq!(outcome.query_type, QueryType::DynamicData);
        assert!(outcome.answer.contains("Sara Chen"));
        assert_eq!(outcome.sources, vec!["/api/employees"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_llm_as_error_block() {
        let client = Arc::new(ScriptedClient::new(vec![
            AssistantReply::text("YES"),
            AssistantReply::with_tool_calls(vec![tool_invocation("delete_everything", "{}")]),
            AssistantReply::text("I could not find that."),
        ]));
        struct Shared(Arc<ScriptedClient>);
        #[async_trait::async_trait]
        impl ChatClient for Shared {
            async fn complete(&self, request: ChatRequest) -> Result<AssistantReply, DevDeskError> {
                self.0.complete(request).await
            }
        }

        let agent = Agent::new(Box::new(Shared(Arc::clone(&client))), make_registry(), 1000);
        let outcome = agent.answer("anything", "", "").await;

        // The call was never executed; the compose turn sees the error block.
        assert_eq!(outcome.query_type, QueryType::DynamicData);
        assert!(outcome.sources.is_empty());
        let requests = client.requests();
        let tool_msg = requests[2]
            .messages
            .iter()
            .find(|m| m.role == "tool")
            .unwrap();
        assert!(tool_msg
            .content
            .as_deref()
            .unwrap()
            .contains("Unknown tool: delete_everything"));
    }

    #[tokio::test]
    async fn test_out_of_scope_deflection() {
        let agent = make_agent(vec![
            AssistantReply::text("NO"),
            AssistantReply::text("I can only help with internal topics."),
        ]);

        let outcome = agent.answer("What's the weather in Paris?", "", "").await;
        assert_eq!(outcome.query_type, QueryType::OutOfScope);
        assert_eq!(outcome.answer, "I can only help with internal topics.");
        assert!(outcome.sources.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_scope_fallback_on_llm_error() {
        // Intent says NO, then the script runs out for the deflection call.
        let agent = make_agent(vec![AssistantReply::text("NO")]);

        let outcome = agent.answer("Tell me a joke", "", "").await;
        assert_eq!(outcome.query_type, QueryType::OutOfScope);
        assert_eq!(outcome.answer, OUT_OF_SCOPE_FALLBACK);
    }

    #[tokio::test]
    async fn test_intent_error_defaults_to_in_scope() {
        // Script runs out immediately: intent check errors, flow continues
        // and then also errors, ending in the apology.
        let agent = make_agent(vec![]);

        let outcome = agent.answer("anything", "", "").await;
        assert_eq!(outcome.query_type, QueryType::Error);
        assert_eq!(outcome.answer, ERROR_APOLOGY);
    }

    #[tokio::test]
    async fn test_missing_footer_falls_back_to_tool_sources() {
        let agent = make_agent(vec![
            AssistantReply::text("YES"),
            AssistantReply::with_tool_calls(vec![tool_invocation("get_employees", "{}")]),
            AssistantReply::text("Sara and Omar are on the team."),
        ]);

        let outcome = agent.answer("Who is on the team?", "", "").await;
        assert_eq!(outcome.query_type, QueryType::DynamicData);
        assert_eq!(outcome.sources, vec!["/api/employees"]);
    }

    #[tokio::test]
    async fn test_kb_context_included_in_system_prompt() {
        let client = Arc::new(ScriptedClient::new(vec![
            AssistantReply::text("YES"),
            AssistantReply::text("Answer."),
        ]));
        // Agent takes ownership; keep a handle for assertions via Arc.
        struct Shared(Arc<ScriptedClient>);
        #[async_trait::async_trait]
        impl ChatClient for Shared {
            async fn complete(&self, request: ChatRequest) -> Result<AssistantReply, DevDeskError> {
                self.0.complete(request).await
            }
        }

        let agent = Agent::new(
            Box::new(Shared(Arc::clone(&client))),
            make_registry(),
            1000,
        );
        agent
            .answer("How do I deploy?", "[Source: deploy.md]\nUse the pipeline.", "")
            .await;

        let requests = client.requests();
        let system = requests[1].messages[0].content.clone().unwrap_or_default();
        assert!(system.contains("[Source: deploy.md]"));
    }
}
