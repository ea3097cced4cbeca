use std::fmt;

pub mod reader;
pub mod writer;

pub use self::{reader::Reader, writer::Writer};

/// Sent by a worker exactly once, right before it terminates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Report {
    WriterDone,
    ReaderDone { id: usize, last_observed: i64 },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::WriterDone => write!(f, "Writer Done!"),
            Report::ReaderDone { id, last_observed } => {
                write!(f, "I'm reader{}, counter = {}", id, last_observed)
            }
        }
    }
}
