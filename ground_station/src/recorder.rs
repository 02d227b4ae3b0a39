// recorder.rs — bounded telemetry sample log ("black box") for plotting and export
use chrono::{DateTime, Utc};
use link_protocol::TelemetryState;
use std::io::{self, Write};
use std::time::Instant;
use tracing::info;

pub const DEFAULT_CAPACITY: usize = 10_000;
/// Rows shown by a live plot.
pub const DEFAULT_WINDOW: usize = 100;

pub const CHANNELS: usize = TelemetryState::CHANNELS;

pub const CHANNEL_LABELS: [&str; CHANNELS] = [
    "Roll",
    "Pitch",
    "Yaw",
    "Engine 1",
    "Engine 2",
    "Engine 3",
    "Engine 4",
    "Altitude",
    "Voltage",
    "Cycle time",
    "Armed",
];

/// One recorded row, in [`CHANNEL_LABELS`] order.
pub type Sample = [f64; CHANNELS];

/// Fixed-capacity, append-only while recording. Filling up stops the
/// recording; it is not an error.
#[derive(Debug)]
pub struct SampleRecorder {
    capacity: usize,
    rows: Vec<Sample>,
    timestamps: Vec<f64>,
    recording: bool,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

impl SampleRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rows: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            recording: false,
            started: None,
            started_at: None,
        }
    }

    /// Clear previous rows and begin a new recording at t = 0.
    pub fn start(&mut self) {
        self.rows.clear();
        self.timestamps.clear();
        self.started = Some(Instant::now());
        self.started_at = Some(Utc::now());
        self.recording = true;
        info!(capacity = self.capacity, "recorder: started");
    }

    /// Stop recording; filled rows stay readable.
    pub fn stop(&mut self) {
        if self.recording {
            info!(rows = self.rows.len(), "recorder: stopped");
        }
        self.recording = false;
    }

    pub fn record(&mut self, telemetry: &TelemetryState) {
        if !self.recording {
            return;
        }
        if self.rows.len() >= self.capacity {
            info!(rows = self.rows.len(), "recorder: capacity reached, stopping");
            self.recording = false;
            return;
        }
        let elapsed = self.started.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0);
        self.rows.push(telemetry.channels());
        self.timestamps.push(elapsed);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of filled rows.
    pub fn index(&self) -> usize {
        self.rows.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn rows(&self) -> &[Sample] {
        &self.rows
    }

    /// Seconds since `start()` for each filled row.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// The most recent `n` rows, once at least `n` exist.
    pub fn window(&self, n: usize) -> Option<&[Sample]> {
        let len = self.rows.len();
        if n == 0 || len < n {
            return None;
        }
        Some(&self.rows[len - n..])
    }

    /// (min, max) of one channel over the filled rows.
    pub fn channel_range(&self, channel: usize) -> Option<(f64, f64)> {
        if channel >= CHANNELS {
            return None;
        }
        self.rows.iter().map(|r| r[channel]).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// CSV export: header, then one line per filled row.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        if let Some(ts) = self.started_at {
            writeln!(out, "# started_at={}", ts.to_rfc3339())?;
        }
        writeln!(out, "t_s,{}", CHANNEL_LABELS.join(","))?;
        for (t, row) in self.timestamps.iter().zip(&self.rows) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
            writeln!(out, "{t:.4},{}", cells.join(","))?;
        }
        out.flush()
    }
}

impl Default for SampleRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
