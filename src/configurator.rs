//! The check-set-verify reconciliation engine.
//!
//! One [`Configurator`] performs one run: it walks the declared keys in
//! document order and, for each one, queries the module's current value,
//! compares via the parameter's codec, and only when the values differ sends
//! the set command and re-queries to verify. A matching key costs a single
//! read, so repeated runs against an already configured module write nothing
//! to its flash.
//!
//! Writes to toggle-guarded parameters are bracketed by their
//! disable/enable pair. Contiguous keys sharing a toggle share one bracket:
//! the disable goes out lazily before the first write that needs it and the
//! enable after the last, so a block of GNSS parameters costs one power
//! cycle, not one per key. The enable is a compensating action and is sent
//! even when the bracketed set failed: a modem left with its GNSS engine
//! down is worse than one unconfirmed parameter.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

use crate::command::{self, CmdBuf, ParameterSpec, Toggle};
use crate::config::{DesiredConfig, Value};
use crate::error::Error;
use crate::report::{Failure, KeyOutcome, Outcome, Report};
use crate::transport::{AtTransport, ResponseBuf, ResponseStatus, TransportError};

/// Retry policy for one run.
#[derive(Debug, Clone)]
pub struct Config {
    retries: u8,
    retry_delay: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Additional attempts after the first, per command.
    pub fn with_retries(self, retries: u8) -> Self {
        Self { retries, ..self }
    }

    /// Fixed pause between attempts.
    pub fn with_retry_delay(self, retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// The serial device went away; unwound by [`Configurator::run`] into
/// [`Error::TransportLost`].
struct Lost;

enum CmdError {
    Lost,
    /// Retries exhausted on timeouts or modem rejections.
    Failed,
}

/// Drives one reconciliation run over an exclusively borrowed transport.
pub struct Configurator<'a, AT, D> {
    transport: &'a mut AT,
    delay: &'a mut D,
    config: Config,
}

impl<'a, AT, D> Configurator<'a, AT, D>
where
    AT: AtTransport,
    D: DelayNs,
{
    pub fn new(transport: &'a mut AT, delay: &'a mut D) -> Self {
        Self {
            transport,
            delay,
            config: Config::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Reconciles the module against `desired`, returning the per-key
    /// report.
    ///
    /// Per-key failures are recorded and never abort the run; the only
    /// terminal failure is a lost serial device, which returns
    /// [`Error::TransportLost`] carrying everything reconciled up to that
    /// point.
    pub fn run(mut self, desired: &DesiredConfig) -> Result<Report, Error> {
        let mut report = Report::new();
        let mut open: Option<Toggle> = None;

        info!(
            "Starting smart configuration, {} declared keys",
            desired.len()
        );

        for section in desired.sections() {
            for entry in section.entries() {
                let Some(spec) = command::lookup(section.name(), entry.key()) else {
                    warn!(
                        "{}.{} is not a known parameter, skipping",
                        section.name(),
                        entry.key()
                    );
                    report.record(KeyOutcome::new(
                        section.name(),
                        entry.key(),
                        Outcome::Unknown,
                    ));
                    continue;
                };

                // A key guarded by a different bracket (or none) ends the
                // previous run of toggle-guarded keys.
                if open.is_some() && open != spec.toggle {
                    if self.close_toggle(&mut open).is_err() {
                        return Err(Error::TransportLost(report));
                    }
                }

                match self.reconcile_key(section.name(), spec, entry.value(), &mut open) {
                    Ok(outcome) => report.record(KeyOutcome::new(
                        section.name(),
                        entry.key(),
                        outcome,
                    )),
                    Err(Lost) => return Err(Error::TransportLost(report)),
                }
            }
        }

        if self.close_toggle(&mut open).is_err() {
            return Err(Error::TransportLost(report));
        }

        info!("Smart configuration finished: {}", report.summary());
        Ok(report)
    }

    /// One pass of the per-key state machine:
    /// query -> compare -> (skip | set -> verify).
    fn reconcile_key(
        &mut self,
        section: &str,
        spec: &ParameterSpec,
        declared: &Value,
        open: &mut Option<Toggle>,
    ) -> Result<Outcome, Lost> {
        let timeout = Duration::from_millis(spec.timeout_ms as u64);

        let raw = match self.execute(spec.query.command(), timeout) {
            Ok(raw) => raw,
            Err(CmdError::Lost) => return Err(Lost),
            Err(CmdError::Failed) => {
                error!("Failed to query {}.{}", section, spec.key);
                return Ok(Outcome::Failed(Failure::Query));
            }
        };

        match spec.codec.parse(spec.query.extract(raw.as_str())) {
            Ok(current) if spec.codec.matches(declared, &current) => {
                info!("{}.{} already at declared value, skipping", section, spec.key);
                return Ok(Outcome::Skipped);
            }
            Ok(_) => debug!("{}.{} differs from declared value", section, spec.key),
            // An unreadable current value cannot be trusted to be correct;
            // fall through to the set and let the verify decide.
            Err(e) => warn!(
                "Could not parse current value for {}.{} ({:?}), setting anyway",
                section, spec.key, e
            ),
        }

        if let Some(toggle) = spec.toggle {
            if *open != Some(toggle) {
                match self.execute(toggle.disable, Duration::from_millis(toggle.timeout_ms as u64))
                {
                    Err(CmdError::Lost) => return Err(Lost),
                    // Some modules reject the disable when already disabled;
                    // not an error for this key.
                    Err(CmdError::Failed) => {
                        warn!("Disable command [{}] not accepted", toggle.disable)
                    }
                    Ok(_) => {}
                }
                *open = Some(toggle);
            }
        }

        let mut cmd = CmdBuf::new();
        if let Err(e) = spec.set.render(&spec.codec, declared, &mut cmd) {
            error!(
                "Cannot render set command for {}.{}: {:?}",
                section, spec.key, e
            );
            return Ok(Outcome::Failed(Failure::Set));
        }

        match self.execute(cmd.as_str(), timeout) {
            Err(CmdError::Lost) => return Err(Lost),
            Err(CmdError::Failed) => {
                error!("Failed to configure {}.{}", section, spec.key);
                return Ok(Outcome::Failed(Failure::Set));
            }
            Ok(_) => {}
        }

        let raw = match self.execute(spec.query.command(), timeout) {
            Ok(raw) => raw,
            Err(CmdError::Lost) => return Err(Lost),
            Err(CmdError::Failed) => {
                error!("Verification query failed for {}.{}", section, spec.key);
                return Ok(Outcome::Failed(Failure::Verify));
            }
        };

        match spec.codec.parse(spec.query.extract(raw.as_str())) {
            Ok(current) if spec.codec.matches(declared, &current) => {
                info!("{}.{} changed and verified", section, spec.key);
                Ok(Outcome::Changed)
            }
            _ => {
                // Accepted but not in effect: unsupported value or the
                // module applies it late.
                warn!(
                    "{}.{} set accepted but re-query does not match",
                    section, spec.key
                );
                Ok(Outcome::Failed(Failure::Verify))
            }
        }
    }

    /// Sends the pending re-enable, if any. Must run even after a failed
    /// set; only a lost transport skips it.
    fn close_toggle(&mut self, open: &mut Option<Toggle>) -> Result<(), Lost> {
        let Some(toggle) = open.take() else {
            return Ok(());
        };
        match self.execute(toggle.enable, Duration::from_millis(toggle.timeout_ms as u64)) {
            Err(CmdError::Lost) => Err(Lost),
            Err(CmdError::Failed) => {
                error!("Re-enable command [{}] failed", toggle.enable);
                Ok(())
            }
            Ok(_) => Ok(()),
        }
    }

    /// Sends one command, retrying timeouts and modem rejections with the
    /// configured delay. An I/O error is never retried.
    fn execute(&mut self, cmd: &str, timeout: Duration) -> Result<ResponseBuf, CmdError> {
        let mut attempt: u8 = 0;
        loop {
            debug!("Sending: [{}]", cmd);
            match self.transport.execute(cmd, timeout) {
                Ok(raw) => match ResponseStatus::of(raw.as_str()) {
                    ResponseStatus::Ok => return Ok(raw),
                    status => warn!("[{}] rejected: {:?}", cmd, status),
                },
                Err(TransportError::Timeout) => warn!("[{}] timed out", cmd),
                Err(TransportError::Io) => {
                    error!("Serial device lost while sending [{}]", cmd);
                    return Err(CmdError::Lost);
                }
            }
            if attempt >= self.config.retries {
                return Err(CmdError::Failed);
            }
            attempt += 1;
            self.delay.delay_ms(self.config.retry_delay.as_millis() as u32);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::{MockTransport, NoopDelay};
    use crate::transport::TransportError;

    type Script = [(&'static str, Result<&'static str, TransportError>)];

    fn run_script(script: &Script, desired: &DesiredConfig) -> Result<Report, Error> {
        run_with(script, desired, Config::new())
    }

    fn run_with(
        script: &Script,
        desired: &DesiredConfig,
        config: Config,
    ) -> Result<Report, Error> {
        let mut transport = MockTransport::new(script);
        let mut delay = NoopDelay;
        let result = Configurator::new(&mut transport, &mut delay)
            .with_config(config)
            .run(desired);
        if result.is_ok() {
            // A success must consume the script exactly: no extra writes.
            transport.finish();
        }
        result
    }

    fn desired(entries: &[(&str, &str, Value)]) -> DesiredConfig {
        let mut config = DesiredConfig::new();
        for (section, key, value) in entries {
            config.set(section, key, value.clone()).unwrap();
        }
        config
    }

    #[test]
    fn mismatched_value_is_set_and_verified() {
        // The CMEE walk-through: current 0, declared 2.
        let script = [
            ("AT+CMEE?", Ok("+CMEE: 0\r\n\r\nOK\r\n")),
            ("AT+CMEE=2", Ok("\r\nOK\r\n")),
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Changed);
        let summary = report.summary();
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.unknown, 0);
    }

    #[test]
    fn second_run_skips_without_writing() {
        let script = [("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n"))];
        let report = run_script(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Skipped);
        assert_eq!(report.summary().skipped, 1);
    }

    #[test]
    fn matching_config_costs_one_query_per_key() {
        let script = [
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
            ("AT+CTZU?", Ok("+CTZU: 1\r\n\r\nOK\r\n")),
            (
                "AT+QOPSCFG=\"displayrssi\"",
                Ok("+QOPSCFG: \"displayrssi\",1\r\n\r\nOK\r\n"),
            ),
        ];
        let report = run_script(
            &script,
            &desired(&[
                ("basic", "error_reporting", Value::Int(2)),
                ("basic", "time_zone_update", Value::Int(1)),
                ("network", "display_rssi_in_scan", Value::Int(1)),
            ]),
        )
        .unwrap();

        assert_eq!(report.summary().skipped, 3);
        assert_eq!(report.summary().changed, 0);
    }

    #[test]
    fn toggle_brackets_a_run_of_changes_once() {
        // Two GNSS parameters need changing: exactly one power-off before
        // the first write and one power-on after the last.
        let script = [
            (
                "AT+QGPSCFG=\"fixfreq\"",
                Ok("+QGPSCFG: \"fixfreq\",1\r\n\r\nOK\r\n"),
            ),
            ("AT+QGPSEND", Ok("\r\nOK\r\n")),
            ("AT+QGPSCFG=\"fixfreq\",10", Ok("\r\nOK\r\n")),
            (
                "AT+QGPSCFG=\"fixfreq\"",
                Ok("+QGPSCFG: \"fixfreq\",10\r\n\r\nOK\r\n"),
            ),
            (
                "AT+QGPSCFG=\"nmeasrc\"",
                Ok("+QGPSCFG: \"nmeasrc\",0\r\n\r\nOK\r\n"),
            ),
            ("AT+QGPSCFG=\"nmeasrc\",1", Ok("\r\nOK\r\n")),
            (
                "AT+QGPSCFG=\"nmeasrc\"",
                Ok("+QGPSCFG: \"nmeasrc\",1\r\n\r\nOK\r\n"),
            ),
            ("AT+QGPS=1", Ok("\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[
                ("gnss", "fix_frequency", Value::Int(10)),
                ("gnss", "nmea_source", Value::Int(1)),
            ]),
        )
        .unwrap();

        assert_eq!(report.summary().changed, 2);
    }

    #[test]
    fn matching_toggle_keys_issue_no_toggle_commands() {
        let script = [
            (
                "AT+QGPSCFG=\"fixfreq\"",
                Ok("+QGPSCFG: \"fixfreq\",10\r\n\r\nOK\r\n"),
            ),
            (
                "AT+QGPSCFG=\"nmeasrc\"",
                Ok("+QGPSCFG: \"nmeasrc\",1\r\n\r\nOK\r\n"),
            ),
        ];
        let report = run_script(
            &script,
            &desired(&[
                ("gnss", "fix_frequency", Value::Int(10)),
                ("gnss", "nmea_source", Value::Int(1)),
            ]),
        )
        .unwrap();

        assert_eq!(report.summary().skipped, 2);
    }

    #[test]
    fn reenable_runs_even_when_the_set_fails() {
        let script = [
            (
                "AT+QGPSCFG=\"fixfreq\"",
                Ok("+QGPSCFG: \"fixfreq\",1\r\n\r\nOK\r\n"),
            ),
            ("AT+QGPSEND", Ok("\r\nOK\r\n")),
            ("AT+QGPSCFG=\"fixfreq\",10", Ok("\r\nERROR\r\n")),
            ("AT+QGPS=1", Ok("\r\nOK\r\n")),
        ];
        let report = run_with(
            &script,
            &desired(&[("gnss", "fix_frequency", Value::Int(10))]),
            Config::new().with_retries(0),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Failed(Failure::Set));
    }

    #[test]
    fn unknown_key_is_isolated() {
        let script = [
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
            ("AT+CTZU?", Ok("+CTZU: 1\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[
                ("basic", "error_reporting", Value::Int(2)),
                ("basic", "carrier_pigeon", Value::Int(1)),
                ("basic", "time_zone_update", Value::Int(1)),
            ]),
        )
        .unwrap();

        let summary = report.summary();
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(report.outcomes()[1].outcome, Outcome::Unknown);
        assert_eq!(report.outcomes()[1].key.as_str(), "carrier_pigeon");
    }

    #[test]
    fn io_error_aborts_with_partial_report() {
        let script = [
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
            ("AT+CTZU?", Err(TransportError::Io)),
        ];
        let err = run_script(
            &script,
            &desired(&[
                ("basic", "error_reporting", Value::Int(2)),
                ("basic", "time_zone_update", Value::Int(1)),
            ]),
        )
        .unwrap_err();

        let Error::TransportLost(report) = err;
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(report.outcomes()[0].key.as_str(), "error_reporting");
        assert_eq!(report.summary().checked, 1);
    }

    #[test]
    fn timeouts_are_retried() {
        let script = [
            ("AT+CMEE?", Err(TransportError::Timeout)),
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Skipped);
    }

    #[test]
    fn exhausted_retries_fail_the_query() {
        let script = [
            ("AT+CMEE?", Err(TransportError::Timeout)),
            ("AT+CMEE?", Err(TransportError::Timeout)),
        ];
        let report = run_with(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
            Config::new().with_retries(1),
        )
        .unwrap();

        assert_eq!(
            report.outcomes()[0].outcome,
            Outcome::Failed(Failure::Query)
        );
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn modem_rejection_counts_as_query_failure() {
        let script = [("AT+CMEE?", Ok("\r\n+CME ERROR: 100\r\n"))];
        let report = run_with(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
            Config::new().with_retries(0),
        )
        .unwrap();

        assert_eq!(
            report.outcomes()[0].outcome,
            Outcome::Failed(Failure::Query)
        );
    }

    #[test]
    fn unparseable_current_value_is_set_anyway() {
        let script = [
            ("AT+CMEE?", Ok("+CMEE: banana\r\n\r\nOK\r\n")),
            ("AT+CMEE=2", Ok("\r\nOK\r\n")),
            ("AT+CMEE?", Ok("+CMEE: 2\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Changed);
    }

    #[test]
    fn stale_value_after_set_is_a_verify_mismatch() {
        let script = [
            ("AT+CMEE?", Ok("+CMEE: 0\r\n\r\nOK\r\n")),
            ("AT+CMEE=2", Ok("\r\nOK\r\n")),
            ("AT+CMEE?", Ok("+CMEE: 0\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("basic", "error_reporting", Value::Int(2))]),
        )
        .unwrap();

        assert_eq!(
            report.outcomes()[0].outcome,
            Outcome::Failed(Failure::Verify)
        );
    }

    #[test]
    fn populated_forbidden_plmn_list_is_cleared() {
        let script = [
            (
                "AT+QFPLMNCFG=\"list\"",
                Ok("+QFPLMNCFG: \"46001\",0\r\n+QFPLMNCFG: \"46000\",0\r\n\r\nOK\r\n"),
            ),
            ("AT+QFPLMNCFG=\"Delete\",\"all\"", Ok("\r\nOK\r\n")),
            ("AT+QFPLMNCFG=\"list\"", Ok("\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("network", "clear_forbidden_plmn", Value::Bool(true))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Changed);
    }

    #[test]
    fn empty_forbidden_plmn_list_is_skipped() {
        let script = [("AT+QFPLMNCFG=\"list\"", Ok("\r\nOK\r\n"))];
        let report = run_script(
            &script,
            &desired(&[("network", "clear_forbidden_plmn", Value::Bool(true))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Skipped);
    }

    #[test]
    fn gnss_power_switch_turns_the_engine_on() {
        let script = [
            ("AT+QGPS?", Ok("+QGPS: 0\r\n\r\nOK\r\n")),
            ("AT+QGPS=1", Ok("\r\nOK\r\n")),
            ("AT+QGPS?", Ok("+QGPS: 1\r\n\r\nOK\r\n")),
        ];
        let report = run_script(
            &script,
            &desired(&[("gnss", "enabled", Value::Bool(true))]),
        )
        .unwrap();

        assert_eq!(report.outcomes()[0].outcome, Outcome::Changed);
    }
}
