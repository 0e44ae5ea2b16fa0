//! Test doubles for driving the engine without hardware.

use embassy_time::Duration;

use crate::transport::{AtTransport, ResponseBuf, TransportError};

/// Scripted transport: a fixed sequence of expected commands and canned
/// results. Panics on any deviation from the script, so a passing test pins
/// the exact AT traffic: command text, order and count.
pub struct MockTransport {
    script: std::vec::Vec<(&'static str, Result<&'static str, TransportError>)>,
    cursor: usize,
}

impl MockTransport {
    pub fn new(
        script: &[(&'static str, Result<&'static str, TransportError>)],
    ) -> Self {
        Self {
            script: script.to_vec(),
            cursor: 0,
        }
    }

    /// Asserts the whole script was consumed and no command was skipped.
    pub fn finish(&self) {
        assert_eq!(
            self.cursor,
            self.script.len(),
            "transport script not fully consumed"
        );
    }
}

impl AtTransport for MockTransport {
    fn execute(&mut self, cmd: &str, _timeout: Duration) -> Result<ResponseBuf, TransportError> {
        let Some((expected, result)) = self.script.get(self.cursor) else {
            panic!("unexpected command past end of script: {:?}", cmd);
        };
        assert_eq!(
            cmd, *expected,
            "command #{} diverged from script",
            self.cursor
        );
        self.cursor += 1;
        match result {
            Ok(raw) => Ok(ResponseBuf::try_from(*raw).expect("scripted response too long")),
            Err(e) => Err(*e),
        }
    }
}

/// Inter-retry delays are irrelevant to the logic under test.
pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
