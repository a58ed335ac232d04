
use std::sync::atomic::Ordering;
use std::time::Duration;

use datachat_client::{ChatController, ClientConfig, SendOutcome};
use datachat_core::{
    render_answer, ChatError, ChatSession, ContentKind, ContextFetchError, Model,
    SessionCreateError, SessionRequest, SessionResponse, ThinkingDisplay,
};
use tokio_util::sync::CancellationToken;

use test_utils::{ev, Entry, RecordingView, ScriptedBackend, Step};

fn controller(backend: ScriptedBackend) -> ChatController<ScriptedBackend, RecordingView> {
    ChatController::new(
        backend,
        RecordingView::default(),
        Model::Deepseek,
        "task-1",
        "ledger.csv",
    )
}

fn session(id: &str) -> ChatSession {
    let request = SessionRequest {
        message: "p".into(),
        model: Model::Deepseek,
        task_id: "task-1".into(),
        file_name: "ledger.csv".into(),
    };
    ChatSession::from_response(
        &request,
        SessionResponse {
            session_id: Some(id.to_string()),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn two_fragments_then_done_render_the_full_answer() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"A"}"#),
        ev(r#"{"text":"B"}"#),
        ev("[DONE]"),
    ]]);
    let mut chat = controller(backend);

    let outcome = chat.submit("What is the total?", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        SendOutcome::Completed {
            message_id: "response-1".into(),
            answer: Some("AB".into()),
        }
    );
    assert_eq!(
        chat.view().last_answer(),
        Some(render_answer("AB", ContentKind::Plain, &ThinkingDisplay::new()).as_str())
    );
    assert_eq!(chat.backend().counter.opened(), 1);
    assert_eq!(chat.backend().counter.closed(), 1);
    assert!(chat.active().is_none());
    assert!(chat.view().input_ready());
    assert!(!chat.is_waiting());
}

#[tokio::test]
async fn session_request_carries_prompt_and_binding() {
    let backend = ScriptedBackend::new(vec![vec![ev("[DONE]")]]);
    let mut chat = controller(backend);
    chat.set_model(Model::Ollama);

    chat.submit("  Which day spent most?  ", &CancellationToken::new())
        .await;

    let requests = chat.backend().session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, Model::Ollama);
    assert_eq!(requests[0].task_id, "task-1");
    assert_eq!(requests[0].file_name, "ledger.csv");
    assert!(requests[0].message.contains("\"ledger.csv\""));
    assert!(requests[0].message.ends_with("\nWhich day spent most?"));
    assert_eq!(
        chat.view().entries.first(),
        Some(&Entry::User("Which day spent most?".into()))
    );
}

#[tokio::test]
async fn malformed_event_between_valid_ones_is_skipped() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"A"}"#),
        ev(r#"{"text": broken"#),
        ev(r#"data: {"text":"B"}"#),
        ev(r#"{"text":"C"}"#),
        ev("[DONE]"),
    ]]);
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        SendOutcome::Completed {
            message_id: "response-1".into(),
            answer: Some("ABC".into()),
        }
    );
    assert_eq!(chat.view().warnings(), 1);
    assert!(chat.view().errors().is_empty());
    assert_eq!(chat.backend().counter.closed(), 1);
}

#[tokio::test]
async fn payload_error_closes_once_and_ignores_later_fragments() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"partial"}"#),
        ev(r#"{"error":"DeepSeek API error: 401"}"#),
        ev(r#"{"text":"never shown"}"#),
        ev("[DONE]"),
    ]]);
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert!(matches!(
        outcome,
        SendOutcome::Failed(ChatError::StreamPayload(_))
    ));
    assert_eq!(chat.view().errors(), vec!["DeepSeek API error: 401"]);
    assert!(!chat.view().last_answer().unwrap().contains("never shown"));
    assert_eq!(chat.backend().counter.closed(), 1);
    assert_eq!(chat.backend().counter.currently_open(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn transport_error_surfaces_generic_message() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"A"}"#),
        Step::TransportError("connection reset".into()),
    ]]);
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert!(matches!(
        outcome,
        SendOutcome::Failed(ChatError::StreamTransport(_))
    ));
    assert_eq!(
        chat.view().errors(),
        vec!["Connection error, please try again later"]
    );
    assert_eq!(chat.backend().counter.currently_open(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn stream_ending_without_sentinel_is_a_transport_error() {
    let backend = ScriptedBackend::new(vec![vec![ev(r#"{"text":"A"}"#)]]);
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert!(matches!(
        outcome,
        SendOutcome::Failed(ChatError::StreamTransport(_))
    ));
    assert_eq!(chat.view().errors().len(), 1);
}

#[tokio::test]
async fn context_failure_aborts_before_negotiation() {
    let mut backend = ScriptedBackend::new(vec![]);
    backend.context = Err(ContextFetchError::Status {
        status: 404,
        message: "Task not found".into(),
    });
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert!(matches!(
        outcome,
        SendOutcome::Failed(ChatError::ContextFetch(_))
    ));
    assert_eq!(chat.view().errors(), vec!["Failed to fetch data: Task not found"]);
    assert!(chat.backend().session_requests().is_empty());
    assert_eq!(chat.backend().counter.opened(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn session_failure_aborts_before_any_channel_opens() {
    let mut backend = ScriptedBackend::new(vec![vec![ev("[DONE]")]]);
    backend.session = Err(SessionCreateError::MissingSessionId);
    let mut chat = controller(backend);

    let outcome = chat.submit("q", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        SendOutcome::Failed(SessionCreateError::MissingSessionId.into())
    );
    assert_eq!(chat.backend().counter.opened(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn empty_text_is_ignored_without_network() {
    let backend = ScriptedBackend::new(vec![]);
    let mut chat = controller(backend);

    assert_eq!(
        chat.submit("   \n", &CancellationToken::new()).await,
        SendOutcome::Ignored
    );
    assert_eq!(chat.backend().context_fetches.load(Ordering::SeqCst), 0);
    assert!(chat.view().entries.is_empty());
}

#[tokio::test]
async fn refetches_context_and_numbers_messages_per_question() {
    let backend = ScriptedBackend::new(vec![
        vec![ev(r#"{"text":"one"}"#), ev("[DONE]")],
        vec![ev(r#"{"text":"two"}"#), ev("[DONE]")],
    ]);
    let mut chat = controller(backend);
    let cancel = CancellationToken::new();

    chat.submit("first", &cancel).await;
    let second = chat.submit("second", &cancel).await;

    assert_eq!(
        second,
        SendOutcome::Completed {
            message_id: "response-2".into(),
            answer: Some("two".into()),
        }
    );
    assert_eq!(chat.backend().context_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(chat.view().answers_created(), 2);
    assert_eq!(chat.backend().counter.opened(), 2);
    assert_eq!(chat.backend().counter.closed(), 2);
}

#[tokio::test]
async fn opening_a_second_stream_closes_the_first() {
    let backend = ScriptedBackend::new(vec![vec![Step::Hang], vec![Step::Hang]]);
    let mut chat = controller(backend);

    chat.open_stream(session("s-1"), "response-1".into())
        .await
        .unwrap();
    assert_eq!(chat.backend().counter.currently_open(), 1);

    chat.open_stream(session("s-2"), "response-2".into())
        .await
        .unwrap();

    assert_eq!(chat.backend().counter.opened(), 2);
    assert_eq!(chat.backend().counter.closed(), 1);
    assert_eq!(chat.backend().counter.currently_open(), 1);
    assert_eq!(chat.active().unwrap().session().session_id(), "s-2");
}

#[tokio::test]
async fn teardown_while_streaming_closes_the_channel() {
    let backend = ScriptedBackend::new(vec![vec![ev(r#"{"text":"A"}"#), Step::Hang]]);
    let mut chat = controller(backend);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), chat.submit("q", &cancel))
        .await
        .expect("teardown must end the stream");

    assert_eq!(outcome, SendOutcome::Cancelled);
    assert!(chat.active().is_none());
    assert_eq!(chat.backend().counter.currently_open(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn teardown_during_negotiation_discards_the_response() {
    let mut backend = ScriptedBackend::new(vec![vec![ev("[DONE]")]]);
    backend.hang_session = true;
    let mut chat = controller(backend);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), chat.submit("q", &cancel))
        .await
        .expect("teardown must end negotiation");

    assert_eq!(outcome, SendOutcome::Cancelled);
    assert_eq!(chat.backend().counter.opened(), 0);
    assert!(chat.view().input_ready());
}

#[tokio::test]
async fn dropping_the_controller_closes_an_open_stream() {
    let backend = ScriptedBackend::new(vec![vec![Step::Hang]]);
    let mut chat = controller(backend);
    chat.open_stream(session("s-1"), "response-1".into())
        .await
        .unwrap();
    let counter = chat.backend().counter.clone();
    assert_eq!(counter.currently_open(), 1);

    drop(chat);

    assert_eq!(counter.currently_open(), 0);
}

#[tokio::test]
async fn thinking_answer_renders_collapsible_block() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"<think>sum the col","type":"thinking"}"#),
        ev(r#"{"text":"umn</think>Total is 30","type":"thinking"}"#),
        ev("[DONE]"),
    ]]);
    let mut chat = controller(backend);

    chat.submit("q", &CancellationToken::new()).await;

    let html = chat.view().last_answer().unwrap();
    assert!(html.starts_with("<div class=\"thinking-content\""));
    assert!(html.contains("sum the column<button class=\"toggle-thinking\""));
    assert!(html.ends_with("</div>Total is 30"));
}

#[tokio::test]
async fn toggling_a_finished_answer_rerenders_it_collapsed() {
    let backend = ScriptedBackend::new(vec![vec![
        ev(r#"{"text":"<think>plan</think>ok","type":"thinking"}"#),
        ev("[DONE]"),
    ]]);
    let mut chat = controller(backend);

    chat.submit("q", &CancellationToken::new()).await;
    assert_eq!(chat.last_answer_id(), Some("response-1"));
    assert!(!chat.view().last_answer().unwrap().contains("collapsed"));

    assert!(chat.toggle_thinking("response-1", 0));
    let html = chat.view().last_answer().unwrap();
    assert!(html.contains("<div class=\"thinking-content collapsed\" data-thinking-index=\"0\">"));
    assert!(html.contains(">Expand</button>"));
    assert!(html.ends_with("</div>ok"));

    assert!(chat.toggle_thinking("response-1", 0));
    assert!(!chat.view().last_answer().unwrap().contains("collapsed"));

    assert!(!chat.toggle_thinking("response-9", 0));
}

#[tokio::test]
async fn each_answer_keeps_its_own_thinking_state() {
    let thinking = || {
        vec![
            ev(r#"{"text":"<think>x</think>y","type":"thinking"}"#),
            ev("[DONE]"),
        ]
    };
    let mut chat = controller(ScriptedBackend::new(vec![thinking(), thinking()]));

    chat.submit("first", &CancellationToken::new()).await;
    chat.submit("second", &CancellationToken::new()).await;
    assert_eq!(chat.last_answer_id(), Some("response-2"));

    assert!(chat.toggle_thinking("response-1", 0));
    let Some(Entry::Answer { message_id, html }) = chat.view().entries.last() else {
        panic!("expected a re-render");
    };
    assert_eq!(message_id, "response-1");
    assert!(html.contains("thinking-content collapsed"));
}

#[test]
fn missing_target_shows_an_error_element() {
    let backend = ScriptedBackend::new(vec![]);
    let config = ClientConfig::default();

    let Err((err, view)) = ChatController::from_config(backend, RecordingView::default(), &config)
    else {
        panic!("expected a configuration error");
    };

    assert!(matches!(err, ChatError::Config(_)));
    assert_eq!(view.errors().len(), 1);
}

#[test]
fn start_greets_and_enables_input() {
    let mut chat = controller(ScriptedBackend::new(vec![]));
    chat.start();

    let Some(Entry::Ai(greeting)) = chat.view().entries.first() else {
        panic!("expected a greeting");
    };
    assert!(greeting.contains("&quot;ledger.csv&quot;"));
    assert!(chat.view().input_ready());
}
