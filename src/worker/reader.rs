use crossbeam_channel::Sender;

use super::Report;
use crate::gate::ReaderWriterGate;

/// Reads the shared counter a fixed number of times and reports the last value it saw
#[derive(Clone, Copy, Debug)]
pub struct Reader {
    id: usize,
    iterations: u64,
}

impl Reader {
    pub fn new(id: usize, iterations: u64) -> Self {
        Self { id, iterations }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn run(&self, gate: &ReaderWriterGate<i64>, reports: &Sender<Report>) -> i64 {
        trace!("Reader {} starting {} reads", self.id, self.iterations);
        let mut last_observed = gate.read();
        for _ in 1..self.iterations {
            last_observed = gate.read();
        }

        let report = Report::ReaderDone {
            id: self.id,
            last_observed,
        };
        if reports.send(report).is_err() {
            warn!("Nobody is listening for reader {}'s report", self.id);
        }

        last_observed
    }
}
