mod common;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use common::{Reply, ScriptedTransport};
use dance_platform_sdk::http::{ApiClient, RequestContext, RetryConfig};

/// `tracing_subscriber` writer that keeps everything in memory.
#[derive(Clone, Default)]
struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[tokio::test]
async fn test_failure_log_uses_caller_path_for_every_verb() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::ERROR)
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let transport = ScriptedTransport::new(vec![Reply::json(
        404,
        json!({"detail": "missing"}),
    )]);
    let client = ApiClient::builder()
        .base_url("https://dance.test/api")
        .transport(transport)
        .retry_config(RetryConfig::disabled())
        .build()
        .unwrap();

    client
        .get::<Value>("/v1/courses/9", None, Some(RequestContext::new().silent()))
        .await
        .unwrap_err();
    let dir = tempfile::tempdir().unwrap();
    client
        .download(
            "/v1/reports/export",
            None,
            dir.path().join("report.csv"),
            Some(RequestContext::new().silent()),
        )
        .await
        .unwrap_err();

    let failures: Vec<String> = logs
        .lines()
        .into_iter()
        .filter(|line| line.contains("Request failed"))
        .collect();
    assert_eq!(failures.len(), 2, "logs: {failures:?}");
    assert!(failures[0].contains("/v1/courses/9"));
    assert!(failures[1].contains("/v1/reports/export"));
    for line in &failures {
        assert!(!line.contains("https://dance.test"), "resolved URL logged: {line}");
        assert!(line.contains("request_id"));
    }
}
