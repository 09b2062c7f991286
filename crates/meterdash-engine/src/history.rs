//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::NaiveTime;
use serde::{Serialize, Serializer};

use meterdash_common::time::wall_clock_label;
use meterdash_logging::{md_debug, LogContext};

use crate::resolver::ResolvedMetrics;
use crate::roles::MetricGroup;

/// Samples retained per chart.
pub const HISTORY_CAPACITY: usize = 20;

/// One chart point: a wall-clock label plus the three series values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
    #[serde(serialize_with = "serialize_wall_clock")]
    pub time: NaiveTime,
    pub value1: f64,
    pub value2: f64,
    pub value3: f64,
}

fn serialize_wall_clock<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&wall_clock_label(*time))
}

impl HistorySample {
    pub fn new(time: NaiveTime, values: [f64; 3]) -> Self {
        let [value1, value2, value3] = values;
        Self {
            time,
            value1,
            value2,
            value3,
        }
    }

    pub fn values(&self) -> [f64; 3] {
        [self.value1, self.value2, self.value3]
    }

    /// `HH:MM:SS` label shown on the chart axis.
    pub fn label(&self) -> String {
        wall_clock_label(self.time)
    }
}

/// Append-only FIFO of chart samples, never longer than [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    samples: VecDeque<HistorySample>,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a sample, evicting the oldest one once the buffer is full.
    pub fn append(&mut self, sample: HistorySample) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// An empty buffer means "no data yet", not an error.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> + '_ {
        self.samples.iter()
    }

    pub fn oldest(&self) -> Option<&HistorySample> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    /// Copy of the samples, oldest first.
    pub fn to_vec(&self) -> Vec<HistorySample> {
        self.samples.iter().copied().collect()
    }
}

impl Serialize for HistoryBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.samples.iter())
    }
}

/// One history buffer per metric group, advanced together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySet {
    pub voltage: HistoryBuffer,
    pub current: HistoryBuffer,
    pub power: HistoryBuffer,
    pub thd: HistoryBuffer,
}

impl HistorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: MetricGroup) -> &HistoryBuffer {
        match group {
            MetricGroup::Voltage => &self.voltage,
            MetricGroup::Current => &self.current,
            MetricGroup::Power => &self.power,
            MetricGroup::Thd => &self.thd,
        }
    }

    fn get_mut(&mut self, group: MetricGroup) -> &mut HistoryBuffer {
        match group {
            MetricGroup::Voltage => &mut self.voltage,
            MetricGroup::Current => &mut self.current,
            MetricGroup::Power => &mut self.power,
            MetricGroup::Thd => &mut self.thd,
        }
    }

    /// Append one sample to every group, all stamped with the same `time`.
    pub fn record_tick(&mut self, time: NaiveTime, resolved: &ResolvedMetrics) {
        for group in MetricGroup::ALL {
            let values = resolved.triple(group.series_roles());
            let buffer = self.get_mut(group);
            buffer.append(HistorySample::new(time, values));
            md_debug!(
                context = LogContext::new().with_group(group.as_str()),
                "chart sample at {} ({} retained)",
                wall_clock_label(time),
                buffer.len()
            );
        }
    }
}
