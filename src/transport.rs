//! The one capability the engine consumes from the serial layer.
//!
//! AT command/response pairing over a single serial channel has no request
//! IDs, so the adapter is exclusively owned for the duration of a run and a
//! call blocks until the full response (terminator line included) has
//! arrived or the timeout fires.

use embassy_time::Duration;
use heapless::String;

/// Upper bound on one raw AT response, echo and terminator included.
pub const MAX_RESPONSE_LEN: usize = 512;

pub type ResponseBuf = String<MAX_RESPONSE_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No complete response within the per-call timeout. Retryable.
    Timeout,
    /// The serial device itself is gone. Never retried; promotes to
    /// [`crate::error::Error::TransportLost`].
    Io,
}

/// Executes a single AT command and returns the raw response text.
///
/// `cmd` is one line without termination; line endings, echo suppression and
/// inter-character pacing are the adapter's concern. The response must carry
/// everything received up to and including the status line (`OK`, `ERROR`,
/// `+CME ERROR: <n>`).
pub trait AtTransport {
    fn execute(&mut self, cmd: &str, timeout: Duration) -> Result<ResponseBuf, TransportError>;
}

impl<T: AtTransport + ?Sized> AtTransport for &mut T {
    fn execute(&mut self, cmd: &str, timeout: Duration) -> Result<ResponseBuf, TransportError> {
        T::execute(self, cmd, timeout)
    }
}

/// Final result code of an AT response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseStatus {
    Ok,
    Error,
    CmeError(u16),
    CmsError(u16),
}

impl ResponseStatus {
    /// Classifies the terminator of a raw response.
    ///
    /// A response without a recognizable terminator is treated as `Ok`;
    /// incomplete reads surface as [`TransportError::Timeout`] at the
    /// adapter instead.
    pub fn of(raw: &str) -> Self {
        for line in raw.lines().rev() {
            let line = line.trim();
            if line == "OK" {
                return ResponseStatus::Ok;
            }
            if line == "ERROR" {
                return ResponseStatus::Error;
            }
            if let Some(code) = line.strip_prefix("+CME ERROR:") {
                return match code.trim().parse::<u16>() {
                    Ok(n) => ResponseStatus::CmeError(n),
                    Err(_) => ResponseStatus::Error,
                };
            }
            if let Some(code) = line.strip_prefix("+CMS ERROR:") {
                return match code.trim().parse::<u16>() {
                    Ok(n) => ResponseStatus::CmsError(n),
                    Err(_) => ResponseStatus::Error,
                };
            }
        }
        ResponseStatus::Ok
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseStatus::Ok)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_terminators() {
        assert_eq!(ResponseStatus::of("+CMEE: 2\r\n\r\nOK\r\n"), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::of("\r\nERROR\r\n"), ResponseStatus::Error);
        assert_eq!(
            ResponseStatus::of("\r\n+CME ERROR: 505\r\n"),
            ResponseStatus::CmeError(505)
        );
        assert_eq!(
            ResponseStatus::of("\r\n+CMS ERROR: 302\r\n"),
            ResponseStatus::CmsError(302)
        );
    }

    #[test]
    fn missing_terminator_reads_as_ok() {
        assert_eq!(ResponseStatus::of("+QGPS: 1"), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::of(""), ResponseStatus::Ok);
    }

    #[test]
    fn garbled_cme_code_still_reads_as_error() {
        assert_eq!(
            ResponseStatus::of("+CME ERROR: unknown\r\n"),
            ResponseStatus::Error
        );
    }
}
