use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::StokerClient;
use crate::coordinator::MetricCoordinator;
use crate::extract::MetricValue;
use crate::metric::{default_descriptors, default_setpoints, MetricDescriptor, SetpointSpec};

/// Write handle for one remote setting, paired with the coordinator of the
/// metric that reflects it. A confirmed write updates the cached value
/// immediately; the next scheduled poll remains authoritative and may
/// legitimately report something else (device-side rounding or clamping).
#[derive(Clone)]
pub struct SetpointControl {
    client: Arc<StokerClient>,
    spec: SetpointSpec,
    coordinator: MetricCoordinator,
}

impl SetpointControl {
    pub fn spec(&self) -> &SetpointSpec {
        &self.spec
    }

    pub fn value(&self) -> MetricValue {
        self.coordinator.value()
    }

    pub fn available(&self) -> bool {
        self.coordinator.available()
    }

    /// Send the new value upstream; on success apply it optimistically to the
    /// paired metric without waiting for a poll tick. Failures are logged and
    /// reported as `false`, never raised, and leave the cached value alone.
    pub async fn set_value(&self, value: f64) -> bool {
        if value < self.spec.min || value > self.spec.max {
            warn!(
                metric = %self.spec.metric,
                value,
                min = self.spec.min,
                max = self.spec.max,
                "setpoint out of range, not sent"
            );
            return false;
        }

        let rounded = round_to_step(value, self.spec.step);
        let ok = self
            .client
            .write(&self.spec.menu, &self.spec.name, &format_value(rounded))
            .await;

        if ok {
            debug!(metric = %self.spec.metric, value = rounded, "setpoint written, applying optimistic value");
            self.coordinator.apply_optimistic(MetricValue::Number(rounded));
        } else {
            warn!(metric = %self.spec.metric, value = rounded, "setpoint write failed, cached value unchanged");
        }
        ok
    }
}

fn round_to_step(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).round() * step
    } else {
        value
    }
}

fn format_value(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Per-instance context owning the client, one coordinator per metric and the
/// refresh tasks. Nothing here is process-wide; drop the monitor and the
/// instance is gone.
pub struct StokerMonitor {
    client: Arc<StokerClient>,
    coordinators: HashMap<String, MetricCoordinator>,
    setpoints: Vec<SetpointSpec>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    started: bool,
}

impl StokerMonitor {
    /// Monitor with the stock descriptor and setpoint tables.
    pub fn new(client: StokerClient) -> Self {
        Self::with_config(client, default_descriptors(), default_setpoints())
    }

    /// Monitor with caller-supplied tables, for installations whose schema
    /// differs from the stock guesses.
    pub fn with_config(
        client: StokerClient,
        descriptors: Vec<MetricDescriptor>,
        setpoints: Vec<SetpointSpec>,
    ) -> Self {
        let client = Arc::new(client);
        let coordinators = descriptors
            .into_iter()
            .map(|d| (d.key.clone(), MetricCoordinator::new(client.clone(), d)))
            .collect();
        Self {
            client,
            coordinators,
            setpoints,
            tasks: Vec::new(),
            started: false,
        }
    }

    /// Perform the initial refresh of every metric, then start the scheduled
    /// loops. Returns only after every metric has completed its first cycle
    /// (success or failure), so readers never see a "never polled" state.
    pub async fn start(&mut self) {
        if self.started {
            return;
        }
        for coordinator in self.coordinators.values() {
            coordinator.refresh().await;
        }
        for coordinator in self.coordinators.values() {
            self.tasks.push(coordinator.spawn());
        }
        self.started = true;
        debug!(serial = %self.client.serial(), metrics = self.coordinators.len(), "monitor started");
    }

    /// Stop the refresh loops. In-flight fetches are abandoned; cached state
    /// stays consistent because replacement is atomic.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.started = false;
    }

    pub fn client(&self) -> &StokerClient {
        &self.client
    }

    pub fn metric(&self, key: &str) -> Option<&MetricCoordinator> {
        self.coordinators.get(key)
    }

    pub fn metric_keys(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }

    pub fn value(&self, key: &str) -> MetricValue {
        self.coordinators
            .get(key)
            .map(|c| c.value())
            .unwrap_or(MetricValue::Unset)
    }

    pub fn available(&self, key: &str) -> bool {
        self.coordinators.get(key).is_some_and(|c| c.available())
    }

    /// Write handle for a writable metric, if one is configured.
    pub fn setpoint(&self, key: &str) -> Option<SetpointControl> {
        let spec = self.setpoints.iter().find(|s| s.metric == key)?;
        let coordinator = self.coordinators.get(key)?.clone();
        Some(SetpointControl {
            client: self.client.clone(),
            spec: spec.clone(),
            coordinator,
        })
    }

    /// Write `value` to the setting paired with `key`. `false` when the key
    /// is not writable or the write fails; the cached value is only touched
    /// on success.
    pub async fn set_value(&self, key: &str, value: f64) -> bool {
        match self.setpoint(key) {
            Some(control) => control.set_value(value).await,
            None => {
                warn!(metric = key, "no writable setpoint for metric");
                false
            }
        }
    }

    pub async fn set_power(&self, on: bool) -> bool {
        self.client.set_power(on).await
    }
}

impl Drop for StokerMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
