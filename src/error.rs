use crate::report::Report;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The serial device disappeared mid-run.
    ///
    /// Per-key trouble never surfaces here; it is recorded in the report
    /// and the run continues. Losing the transport is the one terminal
    /// failure, and the partial report travels with it so everything
    /// reconciled before the loss is not thrown away.
    TransportLost(Report),
}

impl Error {
    /// The outcomes of the keys processed strictly before the failure.
    pub fn partial_report(&self) -> &Report {
        match self {
            Error::TransportLost(report) => report,
        }
    }
}
