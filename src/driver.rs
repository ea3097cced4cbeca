use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    config::{Config, StartOrder},
    gate::ReaderWriterGate,
    worker::{Reader, Report, Writer},
};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to spawn worker '{name}'")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("worker '{name}' panicked")]
    WorkerPanicked { name: String },
}

/// Outcome of a full run, once every worker has been joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub final_counter: i64,
    pub reports: Vec<Report>,
}

/// A spawned worker thread
struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn<F>(name: String, f: F) -> Result<Worker, DriverError>
    where
        F: FnOnce() + Send + 'static,
    {
        trace!("Spawning worker {}", name);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(f)
            .map_err(|source| DriverError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Worker { name, handle })
    }

    fn join(self) -> Result<(), DriverError> {
        let Worker { name, handle } = self;
        if handle.join().is_err() {
            return Err(DriverError::WorkerPanicked { name });
        }
        trace!("Worker {} finished", name);
        Ok(())
    }
}

/// Runs one writer and `config.readers` readers against a fresh gate
///
/// `on_report` sees every worker report as it arrives.
pub fn run<F>(config: &Config, mut on_report: F) -> Result<Summary, DriverError>
where
    F: FnMut(&Report),
{
    let gate = Arc::new(ReaderWriterGate::new(0i64));
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut reports = Vec::with_capacity(config.readers + 1);

    let cpus = num_cpus::get();
    if config.readers + 1 > cpus {
        warn!(
            "{} workers on {} logical cpus, threads will be time sliced",
            config.readers + 1,
            cpus
        );
    }

    info!(
        "Starting 1 writer ({} writes) and {} readers ({} reads each), {:?}",
        config.writes, config.readers, config.reads, config.order
    );

    let t = Instant::now();
    match config.order {
        StartOrder::WriterFirst => {
            let writer = spawn_writer(config, &gate, &tx)?;
            writer.join()?;
            collect(&rx, &mut reports, &mut on_report);
            debug!("It took {:?} to run the writer", t.elapsed());

            let t = Instant::now();
            let readers = spawn_readers(config, &gate, &tx)?;
            drop(tx);
            drain(rx, &mut reports, &mut on_report);
            join_all(readers)?;
            debug!("It took {:?} to run {} readers", t.elapsed(), config.readers);
        }
        StartOrder::Interleaved => {
            let mut workers = vec![spawn_writer(config, &gate, &tx)?];
            workers.extend(spawn_readers(config, &gate, &tx)?);
            drop(tx);
            drain(rx, &mut reports, &mut on_report);
            join_all(workers)?;
            debug!("It took {:?} to run every worker", t.elapsed());
        }
    }

    // Every worker is joined, nobody else holds the gate
    let final_counter = match Arc::try_unwrap(gate) {
        Ok(gate) => gate.into_inner(),
        Err(gate) => gate.read(),
    };
    info!("Final counter value is {}", final_counter);

    Ok(Summary {
        final_counter,
        reports,
    })
}

fn spawn_writer(
    config: &Config,
    gate: &Arc<ReaderWriterGate<i64>>,
    tx: &Sender<Report>,
) -> Result<Worker, DriverError> {
    let writer = Writer::new(config.writes);
    let gate = gate.clone();
    let tx = tx.clone();
    Worker::spawn("writer".into(), move || writer.run(&gate, &tx))
}

fn spawn_readers(
    config: &Config,
    gate: &Arc<ReaderWriterGate<i64>>,
    tx: &Sender<Report>,
) -> Result<Vec<Worker>, DriverError> {
    let mut workers = Vec::with_capacity(config.readers);
    for id in 1..=config.readers {
        let reader = Reader::new(id, config.reads);
        let gate = gate.clone();
        let tx = tx.clone();
        workers.push(Worker::spawn(format!("reader-{}", reader.id()), move || {
            reader.run(&gate, &tx);
        })?);
    }

    Ok(workers)
}

fn join_all(workers: Vec<Worker>) -> Result<(), DriverError> {
    for w in workers {
        w.join()?;
    }
    Ok(())
}

/// Takes whatever reports are already queued
fn collect<F>(rx: &Receiver<Report>, reports: &mut Vec<Report>, on_report: &mut F)
where
    F: FnMut(&Report),
{
    for report in rx.try_iter() {
        on_report(&report);
        reports.push(report);
    }
}

/// Takes reports until every sender is gone
fn drain<F>(rx: Receiver<Report>, reports: &mut Vec<Report>, on_report: &mut F)
where
    F: FnMut(&Report),
{
    for report in rx.iter() {
        on_report(&report);
        reports.push(report);
    }
}
