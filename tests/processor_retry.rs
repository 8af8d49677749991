//! Retry-loop behavior of the row processor against scripted backends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};

use colgen::config::Config;
use colgen::llm::{ChatBackend, ChatMessage, ChatOptions};
use colgen::processor::{ProcessError, RowProcessor};

/// Backend that replays a fixed sequence of outcomes and counts calls.
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _messages: &[ChatMessage], _opts: &ChatOptions) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

fn production_config() -> Config {
    Config::from_pairs(std::iter::empty())
}

fn mock_config(policy: &str) -> Config {
    Config::from_pairs([
        ("COLGEN_MODE".to_string(), "mock".to_string()),
        ("COLGEN_MOCK_POLICY".to_string(), policy.to_string()),
    ])
}

fn rows(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "id": i, "major": "History" })).collect()
}

#[tokio::test(start_paused = true)]
async fn first_good_completion_is_returned() {
    let backend = ScriptedBackend::new(vec![Ok(r#"["A","B","C"]"#.to_string())]);
    let processor = RowProcessor::new(backend.clone(), &production_config());

    let values = processor.process(&rows(3), "derive").await.unwrap();
    assert_eq!(values, vec!["A", "B", "C"]);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_are_retried_then_succeed() {
    let backend = ScriptedBackend::new(vec![
        Err("connection reset".to_string()),
        Ok("no array here at all".to_string()),
        Ok(r#"Here is the result: ["A","B"] thanks"#.to_string()),
    ]);
    let processor = RowProcessor::new(backend.clone(), &production_config());

    let values = processor.process(&rows(2), "derive").await.unwrap();
    assert_eq!(values, vec!["A", "B"]);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_fails_with_no_partial_result() {
    let backend = ScriptedBackend::new(vec![
        Err("timeout".to_string()),
        Err("timeout".to_string()),
        Err("timeout".to_string()),
    ]);
    let processor = RowProcessor::new(backend.clone(), &production_config());

    let err = processor.process(&rows(2), "derive").await.unwrap_err();
    match err {
        ProcessError::Exhausted { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("timeout"));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert_eq!(backend.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn short_arrays_are_padded_to_row_count() {
    let backend = ScriptedBackend::new(vec![Ok(r#"["v1","v2"]"#.to_string())]);
    let processor = RowProcessor::new(backend, &production_config());

    let values = processor.process(&rows(3), "derive").await.unwrap();
    assert_eq!(values, vec!["v1", "v2", ""]);
}

#[tokio::test(start_paused = true)]
async fn long_arrays_are_truncated_to_row_count() {
    let backend = ScriptedBackend::new(vec![Ok(r#"["a","b","c","d"]"#.to_string())]);
    let processor = RowProcessor::new(backend.clone(), &production_config());

    let values = processor.process(&rows(3), "derive").await.unwrap();
    assert_eq!(values, vec!["a", "b", "c"]);
    // Normalization is not a failure path, so no retry happened
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn empty_rows_skip_the_upstream_entirely() {
    let backend = ScriptedBackend::new(vec![]);
    let processor = RowProcessor::new(backend.clone(), &production_config());

    let values = processor.process(&[], "derive").await.unwrap();
    assert!(values.is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn row_cap_is_a_client_error() {
    let cfg = Config::from_pairs([("COLGEN_MAX_ROWS".to_string(), "2".to_string())]);
    let backend = ScriptedBackend::new(vec![]);
    let processor = RowProcessor::new(backend.clone(), &cfg);

    let err = processor.process(&rows(3), "derive").await.unwrap_err();
    assert!(matches!(err, ProcessError::Invalid(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn mock_mode_is_deterministic_and_offline() {
    let backend = ScriptedBackend::new(vec![]);
    let processor = RowProcessor::new(backend.clone(), &mock_config("placeholder"));

    let first = processor.process(&rows(3), "derive").await.unwrap();
    let second = processor.process(&rows(3), "derive").await.unwrap();

    assert_eq!(first, vec!["mock-row-0", "mock-row-1", "mock-row-2"]);
    assert_eq!(first, second);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn mock_classifier_labels_majors() {
    let backend = ScriptedBackend::new(vec![]);
    let processor = RowProcessor::new(backend.clone(), &mock_config("classifier"));

    let table = vec![
        json!({ "major": "Mechanical Engineering" }),
        json!({ "major": "Art" }),
    ];
    let values = processor.process(&table, "classify").await.unwrap();
    assert_eq!(values, vec!["Engineer", "Non-Engineer"]);
    assert_eq!(backend.calls(), 0);
}
