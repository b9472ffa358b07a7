// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for unit and integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::LightsError;
use crate::mqtt::Publisher;

/// Publisher stub that records every message and can be told to fail.
#[derive(Default)]
pub struct FakePublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    fail: AtomicBool,
}

impl FakePublisher {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent publish fail with a transport error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All recorded `(topic, payload)` pairs, payloads as UTF-8.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .iter()
            .map(|(topic, payload)| {
                (topic.clone(), String::from_utf8_lossy(payload).into_owned())
            })
            .collect()
    }

    /// Drain and return the recorded messages.
    pub fn take(&self) -> Vec<(String, String)> {
        let drained = std::mem::take(&mut *self.messages.lock());
        drained
            .into_iter()
            .map(|(topic, payload)| (topic, String::from_utf8_lossy(&payload).into_owned()))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.messages
            .lock()
            .last()
            .map(|(topic, payload)| (topic.clone(), String::from_utf8_lossy(payload).into_owned()))
    }
}

impl Publisher for FakePublisher {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), LightsError>> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(LightsError::Transport("stubbed failure".to_owned()));
            }
            self.messages.lock().push((topic.to_owned(), payload));
            Ok(())
        })
    }
}
