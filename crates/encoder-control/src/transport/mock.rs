//! In-memory transport for tests.
//!
//! Records every command instead of sending it, and can be told to fail a
//! specific call to exercise partial-batch behaviour.

use super::{command_path, CommandTransport};
use crate::errors::{EncoderError, Result};
use crate::params::ParameterSet;
use crate::types::CgiModule;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A command seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Send {
        module: CgiModule,
        params: ParameterSet,
    },
    Get {
        path: String,
    },
}

impl RecordedCall {
    /// The request path the call would have used.
    pub fn path(&self) -> String {
        match self {
            RecordedCall::Send { module, params } => command_path(*module, params),
            RecordedCall::Get { path } => path.clone(),
        }
    }
}

/// Mock transport that records calls.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicUsize,
    /// 1-based call number that fails with a 500.
    fail_on: Option<usize>,
    response: String,
}

impl RecordingTransport {
    /// A transport that accepts everything and answers with an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th call (1-based) with a `CommandFailed` 500.
    #[must_use]
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Body returned by every successful call.
    #[must_use]
    pub fn with_response(mut self, body: impl Into<String>) -> Self {
        self.response = body.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Successfully recorded calls, in order. The failed call is not kept.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded `send` calls as `(module, params)`.
    pub fn sent(&self) -> Vec<(CgiModule, ParameterSet)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Send { module, params } => Some((module, params)),
                RecordedCall::Get { .. } => None,
            })
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::path).collect()
    }

    fn record(&self, call: RecordedCall) -> Result<String> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_on == Some(n) {
            return Err(EncoderError::CommandFailed {
                path: call.path(),
                status: 500,
                body: "mock failure".to_string(),
            });
        }

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        Ok(self.response.clone())
    }
}

#[async_trait::async_trait]
impl CommandTransport for RecordingTransport {
    async fn send(&self, module: CgiModule, params: &ParameterSet) -> Result<String> {
        self.record(RecordedCall::Send {
            module,
            params: params.clone(),
        })
    }

    async fn get(&self, path: &str) -> Result<String> {
        self.record(RecordedCall::Get {
            path: path.to_string(),
        })
    }
}
