//! Streaming driver: reads JSON Lines samples, feeds the recognizer and
//! dispatches recognised gestures through the profile's bindings.

use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::{
    io::BufRead,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use crate::actions::{SpellCast, SpellSink};
use crate::config::{Action, Profile};
use crate::landmarks::{HandDetection, HandSide};
use crate::session::{GestureEvent, Recognizer};

const FRAME_QUEUE: usize = 64;
const STOP_POLL: Duration = Duration::from_millis(50);

/// Parses one input line, either a bare array of detections or an object
/// with a `hands` array. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Vec<HandDetection>>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| anyhow!("invalid JSON: {e}"))?;
    let hands = match value {
        serde_json::Value::Array(list) => serde_json::Value::Array(list),
        serde_json::Value::Object(mut obj) => obj
            .remove("hands")
            .ok_or_else(|| anyhow!("object has no \"hands\" field"))?,
        other => {
            return Err(anyhow!(
                "expected an array of detections or {{\"hands\": [...]}}, got {}",
                json_kind(&other)
            ));
        }
    };
    let hands = serde_json::from_value(hands).map_err(|e| anyhow!("bad detection: {e}"))?;
    Ok(Some(hands))
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub skipped: u64,
    pub casts: u64,
}

enum ReaderMsg {
    Frame(Vec<HandDetection>),
    Skipped,
}

/// Resolves an event against the profile's bindings and casts the bound
/// spell. Returns whether anything was cast.
pub fn dispatch(event: &GestureEvent, profile: &Profile, sink: &mut SpellSink) -> Result<bool> {
    let gesture = event.result.gesture;
    match profile.binding(event.hand, gesture) {
        Some(Action::Spell(spell)) => {
            sink.cast(&SpellCast {
                tick: event.tick,
                hand: event.hand,
                gesture,
                confidence: event.result.confidence,
                spell,
            })?;
            Ok(true)
        }
        Some(Action::None) | None => {
            debug!("{} {gesture}: no spell bound", event.hand);
            Ok(false)
        }
    }
}

pub struct Pipeline {
    recognizer: Recognizer,
    profile: Profile,
    sink: SpellSink,
    trace: bool,
}

impl Pipeline {
    pub fn new(profile: Profile, sink: SpellSink) -> Result<Self> {
        let recognizer = profile.recognizer()?;
        Ok(Self {
            recognizer,
            profile,
            sink,
            trace: false,
        })
    }

    /// Logs each hand's inspection snapshot after every frame.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Processes one frame and returns the number of spells cast.
    pub fn feed(&mut self, hands: &[HandDetection]) -> u64 {
        let mut casts = 0;
        for event in self.recognizer.on_sample(hands) {
            match dispatch(&event, &self.profile, &mut self.sink) {
                Ok(true) => casts += 1,
                Ok(false) => {}
                Err(e) => error!("dispatch failed: {e}"),
            }
        }
        if self.trace {
            for side in HandSide::BOTH {
                match serde_json::to_string(&self.recognizer.inspect(side)) {
                    Ok(s) => info!("[trace] {s}"),
                    Err(e) => warn!("trace serialisation failed: {e}"),
                }
            }
        }
        casts
    }

    /// Drains `input` on a reader thread until end of input or until `stop`
    /// is raised.
    pub fn run<R>(&mut self, input: R, stop: Arc<AtomicBool>) -> Result<RunSummary>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<ReaderMsg>(FRAME_QUEUE);
        let reader = thread::Builder::new()
            .name("handspell-reader".into())
            .spawn(move || -> Result<()> {
                let mut input = input;
                let mut buf = Vec::new();
                let mut n = 0usize;
                loop {
                    buf.clear();
                    if input.read_until(b'\n', &mut buf)? == 0 {
                        break;
                    }
                    n += 1;
                    let parsed = std::str::from_utf8(&buf)
                        .map_err(|e| anyhow!("not valid UTF-8: {e}"))
                        .and_then(parse_line);
                    let msg = match parsed {
                        Ok(Some(hands)) => ReaderMsg::Frame(hands),
                        Ok(None) => continue,
                        Err(e) => {
                            warn!("skipping line {n}: {e}");
                            ReaderMsg::Skipped
                        }
                    };
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Ok(())
            })?;

        let mut summary = RunSummary::default();
        loop {
            if stop.load(Ordering::Relaxed) {
                info!("stop requested");
                // the reader may be blocked on input; leave it behind
                return Ok(summary);
            }
            match rx.recv_timeout(STOP_POLL) {
                Ok(ReaderMsg::Frame(hands)) => {
                    summary.frames += 1;
                    summary.casts += self.feed(&hands);
                }
                Ok(ReaderMsg::Skipped) => summary.skipped += 1,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        reader
            .join()
            .map_err(|_| anyhow!("input reader panicked"))??;
        info!(
            "input finished: {} frames, {} skipped, {} casts",
            summary.frames, summary.skipped, summary.casts
        );
        Ok(summary)
    }
}
