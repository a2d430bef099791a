//! The event loop behind `moodring run`.
//!
//! Everything that touches the pipeline happens on this task: source events,
//! the 50 ms timer poll, Ctrl-C, and the optional deadline. The device reader
//! lives on its own task and only talks to us through a channel.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use moodring_core::time::clock_time;
use moodring_core::{BlobStore, MoodPipeline, MoodState, MoodType, NotificationSink};
use moodring_ingest::{GsrLineParser, LineAssembler, MOCK_TICK_MS, MockSignal, SignalEvent, SourceKind};
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const POLL_INTERVAL_MS: u64 = 50;
const READ_CHUNK: usize = 256;
const CHANNEL_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Mock { seed: Option<u64> },
    Device(PathBuf),
}

impl SourceSpec {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSpec::Mock { .. } => SourceKind::Mock,
            SourceSpec::Device(_) => SourceKind::Device,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub readings: usize,
    pub admitted: usize,
    pub records: usize,
    pub notifications: usize,
    pub last_mood: Option<MoodType>,
}

enum ActiveSource {
    Mock {
        signal: MockSignal,
        tick: Interval,
    },
    Device {
        rx: mpsc::Receiver<SignalEvent>,
        reader: JoinHandle<()>,
    },
}

impl ActiveSource {
    async fn open(spec: &SourceSpec) -> Result<Self> {
        match spec {
            SourceSpec::Mock { seed } => {
                let signal = match seed {
                    Some(s) => MockSignal::seeded(*s),
                    None => MockSignal::new(),
                };
                let mut tick = tokio::time::interval(Duration::from_millis(MOCK_TICK_MS));
                tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ok(ActiveSource::Mock { signal, tick })
            }
            SourceSpec::Device(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("open device {}", path.display()))?;
                let parser = GsrLineParser::new()?;
                let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
                let reader = tokio::spawn(read_device(file, parser, tx));
                Ok(ActiveSource::Device { rx, reader })
            }
        }
    }

    async fn next(&mut self) -> SignalEvent {
        match self {
            ActiveSource::Mock { signal, tick } => {
                tick.tick().await;
                SignalEvent::Reading(signal.next_reading())
            }
            ActiveSource::Device { rx, .. } => rx.recv().await.unwrap_or(SignalEvent::Disconnected),
        }
    }

    fn stop(self) {
        if let ActiveSource::Device { reader, .. } = self {
            reader.abort();
        }
    }
}

async fn read_device<R>(mut input: R, parser: GsrLineParser, tx: mpsc::Sender<SignalEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = LineAssembler::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match input.read(&mut buf).await {
            Ok(0) => {
                debug!("device stream ended");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "device read failed");
                break;
            }
        };
        for line in lines.push(&buf[..n]) {
            match parser.parse(&line) {
                Some(v) => {
                    if tx.send(SignalEvent::Reading(v)).await.is_err() {
                        return;
                    }
                }
                None => debug!(line = %line, "ignored device line"),
            }
        }
    }
    let _ = tx.send(SignalEvent::Disconnected).await;
}

fn mood_line(at: DateTime<Utc>, tz: Tz, state: &MoodState) -> String {
    format!("{} {:>3}  {}", clock_time(at, tz), state.smoothed_value, state.mood.profile().label)
}

/// Drive `pipeline` from `spec` until Ctrl-C, the deadline, or the source ends.
pub async fn run_pipeline<B, R, S>(
    pipeline: &mut MoodPipeline<B, R>,
    spec: &SourceSpec,
    sink: &mut S,
    duration: Option<Duration>,
) -> Result<RunSummary>
where
    B: BlobStore,
    R: Rng,
    S: NotificationSink,
{
    let mut source = ActiveSource::open(spec).await?;
    let mut summary = RunSummary::default();

    let mut poll = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = duration.map(|d| Instant::now() + d);
    let stop_at = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop_at);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    pipeline.start(Utc::now(), sink);
    info!(source = %spec.kind(), "pipeline running");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = &mut stop_at => {
                info!("run duration elapsed");
                break;
            }
            _ = poll.tick() => {
                let out = pipeline.poll(Utc::now(), sink);
                if out.rolled_over {
                    println!("-- new day, today's stats reset --");
                }
                if out.dismissed.is_some() {
                    debug!("care notification dismissed");
                }
            }
            event = source.next() => {
                match event {
                    SignalEvent::Reading(v) => {
                        summary.readings += 1;
                        let prev = pipeline.state().mood;
                        let now = Utc::now();
                        let ev = pipeline.on_reading(v, now, sink);
                        if !ev.admitted {
                            continue;
                        }
                        summary.admitted += 1;
                        if ev.changed && ev.state.mood != prev && ev.state.smoothed_value > 0.0 {
                            println!("{}", mood_line(now, pipeline.tz(), &ev.state));
                        }
                        if let Some(rec) = &ev.record {
                            summary.records += 1;
                            debug!(id = %rec.id, "recorded");
                        }
                        if let Some(n) = &ev.notification {
                            summary.notifications += 1;
                            println!("[care] {}", n.message);
                        }
                        summary.last_mood = Some(ev.state.mood);
                    }
                    SignalEvent::Disconnected => {
                        info!("source disconnected");
                        break;
                    }
                }
            }
        }
    }

    source.stop();
    pipeline.shutdown(sink);
    Ok(summary)
}
