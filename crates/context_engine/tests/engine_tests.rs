use async_trait::async_trait;
use context_engine::pipeline::processors::group_flatten::ASSISTANT_GROUPS_FLATTENED;
use context_engine::pipeline::processors::history_compression::{
    HISTORY_COMPRESSED, HISTORY_SUMMARY_INJECTED,
};
use context_engine::pipeline::processors::tool_state::TOOL_STATE_INJECTED;
use context_engine::pipeline::processors::user_memory::USER_MEMORY_INJECTED;
use context_engine::pipeline::providers::{SYSTEM_CONTEXT_END, SYSTEM_CONTEXT_START};
use context_engine::{
    ContextPipeline, EmojiReaction, EngineConfig, MemoryItem, Message, PageContentContext,
    PageSelection, PipelineBuilder, PipelineContext, PipelineError, PipelineOutput, ProcessError,
    Processor, RequestInputs, Role, TodoItem, TodoItemStatus, TodoList, ToolCall,
};
use serde_json::json;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("You are a writing assistant."),
        Message::user("What's the weather?"),
        Message::assistant_group(vec![
            Message::assistant("").with_tool_calls(vec![ToolCall::function(
                "call_1",
                "weather",
                r#"{"city":"Paris"}"#,
            )]),
            Message::tool_result("call_1", "sunny, 24C"),
            Message::assistant("It is sunny in Paris."),
        ])
        .with_reactions(&[EmojiReaction::new("👍", 1)]),
        Message::user("Now tighten the intro paragraph."),
    ]
}

fn inputs() -> RequestInputs {
    RequestInputs {
        page_content: Some(PageContentContext::markdown("Essay", "# Intro\nIt was a dark night.")),
        page_selections: vec![PageSelection::new("It was a dark night.").with_lines(2, 2)],
        memories: vec![MemoryItem::new("Style", "Prefers short sentences").with_category("writing")],
        todo_list: Some(TodoList::new(
            "Edit essay",
            vec![
                TodoItem::new("1", "Outline").with_status(TodoItemStatus::Completed),
                TodoItem::new("2", "Tighten intro").with_status(TodoItemStatus::InProgress),
            ],
        )),
        history_summary: None,
    }
}

fn last_user_text(ctx: &PipelineContext) -> String {
    ctx.messages()
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.text())
        .unwrap_or_default()
        .to_string()
}

struct Sleep(u64);

#[async_trait]
impl Processor for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    async fn do_process(&self, ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
        tokio::time::sleep(Duration::from_millis(self.0)).await;
        Ok(ctx)
    }
}

#[tokio::test]
async fn test_default_engine_prepares_full_request() {
    init_tracing();
    let pipeline = PipelineBuilder::build(&EngineConfig::default(), inputs()).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();

    assert!(output.is_completed());
    let ctx = output.context();
    let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant, Role::User]
    );
    assert_eq!(
        ctx.message(4).unwrap().text(),
        Some("It is sunny in Paris.\n\n[User Feedback: positive - user found this helpful]")
    );
    assert_eq!(ctx.get_metadata(ASSISTANT_GROUPS_FLATTENED), Some(&json!(1)));
    assert_eq!(ctx.get_metadata(TOOL_STATE_INJECTED), Some(&json!(true)));
    assert_eq!(ctx.get_metadata(USER_MEMORY_INJECTED), Some(&json!(1)));
    assert_eq!(
        ctx.executed_processors(),
        vec![
            "group_flatten",
            "history_compression",
            "reaction_feedback",
            "tool_state",
            "user_memory",
            "page_editor_context",
        ]
    );
    assert_eq!(output.stats().processors_run, 6);
}

#[tokio::test]
async fn test_combined_providers_share_one_envelope() {
    let pipeline = PipelineBuilder::build(&EngineConfig::default(), inputs()).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();

    let text = last_user_text(output.context());
    assert!(text.starts_with("Now tighten the intro paragraph.\n\n"));
    assert_eq!(text.matches(SYSTEM_CONTEXT_START).count(), 1);
    assert_eq!(text.matches(SYSTEM_CONTEXT_END).count(), 1);
    assert!(text.ends_with(SYSTEM_CONTEXT_END));

    let tool_at = text.find("<tool_state>").unwrap();
    let memory_at = text.find("<user_memory>").unwrap();
    let page_at = text.find("<current_page_context>").unwrap();
    assert!(tool_at < memory_at && memory_at < page_at);
    assert!(text.contains("[/] 2: Tighten intro"));
    assert!(text.contains("Progress: 1/2 tasks completed"));
    assert!(text.contains("<selection index=\"1\" lines=\"2\">"));
}

#[tokio::test]
async fn test_configured_order_is_honored() {
    let config = EngineConfig::from_toml_str(
        r#"order = ["page_editor_context", "user_memory", "group_flatten"]"#,
    )
    .unwrap();
    let pipeline = ContextPipeline::from_config(&config, inputs()).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();

    let text = last_user_text(output.context());
    let page_at = text.find("<current_page_context>").unwrap();
    let memory_at = text.find("<user_memory>").unwrap();
    assert!(page_at < memory_at);
    assert!(!text.contains("<tool_state>"));
    assert_eq!(
        output.context().executed_processors(),
        vec!["page_editor_context", "user_memory", "group_flatten"]
    );
}

#[tokio::test]
async fn test_reactions_before_flatten_are_left_on_group() {
    let config = EngineConfig::from_toml_str(r#"order = ["reaction_feedback", "group_flatten"]"#)
        .unwrap();
    let pipeline = ContextPipeline::from_config(&config, RequestInputs::default()).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();

    assert_eq!(
        output.context().message(4).unwrap().text(),
        Some("It is sunny in Paris.")
    );
}

#[tokio::test]
async fn test_compression_with_summary() {
    let config = EngineConfig::from_toml_str(
        r#"
        order = ["group_flatten", "history_compression"]

        [history_compression]
        enabled = true
        keep_recent = 3
        "#,
    )
    .unwrap();
    let inputs = RequestInputs {
        history_summary: Some("The user asked about the weather.".to_string()),
        ..Default::default()
    };
    let pipeline = ContextPipeline::from_config(&config, inputs).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();

    let ctx = output.context();
    let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
    // The window of three would start on the tool result; it widens to the call.
    assert_eq!(
        roles,
        vec![Role::System, Role::System, Role::Assistant, Role::Tool, Role::Assistant, Role::User]
    );
    assert!(ctx.message(1).unwrap().text().unwrap().starts_with("<chat_history_summary>"));
    assert_eq!(ctx.get_metadata(HISTORY_COMPRESSED), Some(&json!(1)));
    assert_eq!(ctx.get_metadata(HISTORY_SUMMARY_INJECTED), Some(&json!(true)));
}

#[tokio::test]
async fn test_payload_serializes_to_chat_completions_shape() {
    let pipeline = PipelineBuilder::build(&EngineConfig::default(), RequestInputs::default()).unwrap();

    let output = pipeline.execute(PipelineContext::new(conversation())).await.unwrap();
    let payload = output.context().to_payload().unwrap();

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value[0], json!({ "role": "system", "content": "You are a writing assistant." }));
    assert_eq!(value[2]["role"], json!("assistant"));
    assert_eq!(value[2]["tool_calls"][0]["type"], json!("function"));
    assert_eq!(value[2]["tool_calls"][0]["function"]["name"], json!("weather"));
    assert_eq!(
        value[3],
        json!({ "role": "tool", "content": "sunny, 24C", "tool_call_id": "call_1" })
    );
    assert!(value[4].get("metadata").is_none());
    assert!(value[4].get("id").is_none());
}

#[tokio::test]
async fn test_unflattened_group_is_rejected_at_payload() {
    let ctx = PipelineContext::new(conversation());

    let result = ctx.to_payload();

    assert!(matches!(result, Err(ProcessError::MalformedInput(_))));
}

#[tokio::test]
async fn test_processor_failure_reports_stage() {
    let pipeline = PipelineBuilder::build(&EngineConfig::default(), RequestInputs::default()).unwrap();
    let ctx = PipelineContext::new(vec![Message::assistant_group(vec![Message::system("bad")])]);

    let err = pipeline.execute(ctx).await.unwrap_err();

    match err {
        PipelineError::ProcessorFailed { processor, error } => {
            assert_eq!(processor, "group_flatten");
            assert!(matches!(error, ProcessError::MalformedInput(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_run_leaves_input_intact() {
    let pipeline = PipelineBuilder::build(&EngineConfig::default(), inputs()).unwrap();
    let ctx = PipelineContext::new(conversation());
    let before = ctx.clone();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline.execute_with_cancel(ctx.clone(), &cancel).await.unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { ref processor } if processor == "group_flatten"));
    assert_eq!(ctx, before);
}

#[tokio::test]
async fn test_cancellation_interrupts_running_stage() {
    let pipeline = Arc::new(ContextPipeline::new().register(Box::new(Sleep(5_000))));
    let cancel = CancellationToken::new();

    let handle = {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .execute_with_cancel(PipelineContext::new(vec![Message::user("hi")]), &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PipelineError::Cancelled { ref processor }) if processor == "sleep"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_independent() {
    let pipeline = Arc::new(PipelineBuilder::build(&EngineConfig::default(), inputs()).unwrap());

    let runs = (0..8).map(|i| {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let ctx = PipelineContext::new(vec![Message::user(format!("question {i}"))]);
            pipeline.execute(ctx).await
        })
    });
    let results = futures::future::join_all(runs).await;

    for (i, result) in results.into_iter().enumerate() {
        let output = result.unwrap().unwrap();
        let text = last_user_text(output.context());
        assert!(text.starts_with(&format!("question {i}\n\n")));
        assert_eq!(text.matches(SYSTEM_CONTEXT_START).count(), 1);
    }
}

#[tokio::test]
async fn test_abort_short_circuits_remaining_stages() {
    struct Stop;

    #[async_trait]
    impl Processor for Stop {
        fn name(&self) -> &str {
            "stop"
        }

        async fn do_process(&self, mut ctx: PipelineContext) -> Result<PipelineContext, ProcessError> {
            ctx.abort("nothing to send");
            Ok(ctx)
        }
    }

    let pipeline = ContextPipeline::new()
        .register(Box::new(Stop))
        .register(Box::new(Sleep(5_000)));

    let output = pipeline
        .execute(PipelineContext::new(vec![Message::user("hi")]))
        .await
        .unwrap();

    match output {
        PipelineOutput::Aborted { reason, aborted_by, context, .. } => {
            assert_eq!(reason, "nothing to send");
            assert_eq!(aborted_by, "stop");
            assert_eq!(context.executed_processors(), vec!["stop"]);
        }
        other => panic!("expected abort, got {other:?}"),
    }
}
