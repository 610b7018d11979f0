use anyhow::Result;
use log::info;
use serde::Serialize;
use std::io::{self, Write};

use crate::gestures::Gesture;
use crate::landmarks::HandSide;

/// One emitted spell, written as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellCast {
    pub tick: u64,
    pub hand: HandSide,
    pub gesture: Gesture,
    pub confidence: f32,
    pub spell: String,
}

pub struct SpellSink {
    enabled: bool,
    out: Option<Box<dyn Write + Send>>,
}

impl SpellSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            enabled: true,
            out: Some(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Accepts casts and drops them; useful for dry runs.
    pub fn noop() -> Self {
        Self {
            enabled: true,
            out: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, en: bool) {
        self.enabled = en;
    }

    pub fn cast(&mut self, cast: &SpellCast) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        info!(
            "{} hand casts {} ({} {:.2})",
            cast.hand, cast.spell, cast.gesture, cast.confidence
        );
        if let Some(out) = self.out.as_mut() {
            serde_json::to_writer(&mut *out, cast)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer whose contents stay readable after the sink takes ownership.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn fireball() -> SpellCast {
        SpellCast {
            tick: 42,
            hand: HandSide::Left,
            gesture: Gesture::Circle,
            confidence: 0.5,
            spell: "fireball".into(),
        }
    }

    #[test]
    fn writes_one_json_line_per_cast() {
        let buf = SharedBuf::default();
        let mut sink = SpellSink::new(buf.clone());
        sink.cast(&fireball()).unwrap();
        sink.cast(&fireball()).unwrap();

        let text = buf.text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["hand"], "left");
        assert_eq!(v["gesture"], "circle");
        assert_eq!(v["spell"], "fireball");
        assert_eq!(v["tick"], 42);
    }

    #[test]
    fn disabled_sink_stays_quiet() {
        let buf = SharedBuf::default();
        let mut sink = SpellSink::new(buf.clone());
        sink.set_enabled(false);
        sink.cast(&fireball()).unwrap();
        assert!(buf.text().is_empty());
        assert!(SpellSink::noop().cast(&fireball()).is_ok());
    }
}
