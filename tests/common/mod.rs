//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use dance_platform_sdk::error::HttpError;
use dance_platform_sdk::http::{HttpRequest, HttpResponse, LoadingTracker, Transport};
use dance_platform_sdk::ui::{LoadingIndicator, Notifier, NotifyLevel};

/// One scripted reply.
pub enum Reply {
    Respond(HttpResponse),
    Fail(HttpError),
    /// Wait (on the tokio clock) before responding.
    Delayed(Duration, HttpResponse),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Respond(HttpResponse::json(status, &body))
    }

    pub fn network_down() -> Self {
        Reply::Fail(HttpError::Transport {
            message: "Network error, please check your connection".into(),
            timeout: false,
        })
    }
}

/// What the transport saw for one attempt.
#[derive(Debug, Clone)]
pub struct Seen {
    pub request: HttpRequest,
    pub at: tokio::time::Instant,
    pub loading_visible: Option<bool>,
}

/// Transport that replays a script and records every attempt.
///
/// When the script runs out the last reply is repeated.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    seen: Mutex<Vec<Seen>>,
    loading: Mutex<Option<LoadingTracker>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
            loading: Mutex::new(None),
        })
    }

    /// Record whether `tracker` shows the indicator at each attempt.
    pub fn watch_loading(&self, tracker: LoadingTracker) {
        *self.loading.lock().unwrap() = Some(tracker);
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(reply) => {
                let copy = clone_reply(&reply);
                *last = Some(reply);
                copy
            }
            None => last
                .as_ref()
                .map(clone_reply)
                .unwrap_or_else(|| Reply::json(200, serde_json::json!({"code": 0, "data": null}))),
        }
    }
}

fn clone_reply(reply: &Reply) -> Reply {
    match reply {
        Reply::Respond(resp) => Reply::Respond(resp.clone()),
        Reply::Fail(err) => Reply::Fail(err.clone()),
        Reply::Delayed(d, resp) => Reply::Delayed(*d, resp.clone()),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let loading_visible = self
            .loading
            .lock()
            .unwrap()
            .as_ref()
            .map(LoadingTracker::is_visible);
        self.seen.lock().unwrap().push(Seen {
            request: request.clone(),
            at: tokio::time::Instant::now(),
            loading_visible,
        });

        match self.next_reply() {
            Reply::Respond(resp) => Ok(resp),
            Reply::Fail(err) => Err(err),
            Reply::Delayed(delay, resp) => {
                tokio::time::sleep(delay).await;
                Ok(resp)
            }
        }
    }
}

/// Notifier that remembers every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<(String, NotifyLevel)>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<(String, NotifyLevel)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, message: &str, level: NotifyLevel) {
        self.shown.lock().unwrap().push((message.to_string(), level));
    }
}

/// Indicator that remembers show/hide calls in order.
#[derive(Default)]
pub struct RecordingIndicator {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingIndicator {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl LoadingIndicator for RecordingIndicator {
    fn show(&self) {
        self.calls.lock().unwrap().push("show");
    }

    fn hide(&self) {
        self.calls.lock().unwrap().push("hide");
    }
}
