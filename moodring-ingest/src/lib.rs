//! moodring-ingest: signal sources for the mood pipeline (device line protocol and a synthetic generator).

pub mod mock;
pub mod parsers;
pub mod types;

pub use mock::{MOCK_TICK_MS, MockSignal};
pub use parsers::gsr_line::{GsrLineParser, LineAssembler, scale_and_clamp};
pub use types::{SignalEvent, SourceKind};
