use crossbeam_channel::Sender;

use super::Report;
use crate::gate::ReaderWriterGate;

/// Increments the shared counter a fixed number of times
#[derive(Clone, Copy, Debug)]
pub struct Writer {
    iterations: u64,
}

impl Writer {
    pub fn new(iterations: u64) -> Self {
        Self { iterations }
    }

    pub fn run(&self, gate: &ReaderWriterGate<i64>, reports: &Sender<Report>) {
        trace!("Writer starting {} writes", self.iterations);
        for _ in 0..self.iterations {
            gate.write(|counter| *counter += 1);
        }

        if reports.send(Report::WriterDone).is_err() {
            warn!("Nobody is listening for the writer's report");
        }
    }
}
