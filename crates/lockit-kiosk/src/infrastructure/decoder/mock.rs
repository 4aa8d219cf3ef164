//! Scripted QR decoder for integration tests.
//!
//! Unit tests inside the crate use the `mockall` double generated on the
//! [`QrDecoder`] trait; that double is only compiled for `cfg(test)`, so tests
//! in `tests/` use this one instead.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lockit_core::{Frame, ScanResult};

use crate::application::scan_frames::QrDecoder;

/// Returns scripted results in order, then `None` forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecoder {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedDecoder {
    /// A decoder that never finds a code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Misses `misses` frames, then decodes `text`.
    pub fn decodes_after(misses: usize, text: impl Into<String>) -> Self {
        let decoder = Self::new();
        {
            let mut script = decoder.script.lock().expect("lock poisoned");
            script.extend(std::iter::repeat(None).take(misses));
            script.push_back(Some(text.into()));
        }
        decoder
    }

    /// Number of frames handed to `decode`.
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock poisoned")
    }
}

impl QrDecoder for ScriptedDecoder {
    fn decode(&self, _frame: &Frame) -> Option<ScanResult> {
        *self.calls.lock().expect("lock poisoned") += 1;
        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .flatten()
            .map(ScanResult::new)
    }
}
