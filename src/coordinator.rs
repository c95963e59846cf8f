use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::StokerClient;
use crate::extract::MetricValue;
use crate::metric::MetricDescriptor;

/// Snapshot of one metric's cached state.
#[derive(Debug, Clone)]
pub struct MetricState {
    pub value: MetricValue,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl MetricState {
    pub fn available(&self) -> bool {
        self.value.is_set()
    }
}

struct StateInner {
    value: MetricValue,
    last_error: Option<String>,
    last_attempt: Option<DateTime<Utc>>,
    // Bumped once per completed fetch; lets a waiting refresh detect that the
    // attempt it queued behind already produced a fresh value.
    cycle: u64,
}

struct Inner {
    client: Arc<StokerClient>,
    descriptor: MetricDescriptor,
    state: Mutex<StateInner>,
    gate: tokio::sync::Mutex<()>,
}

/// Owns one metric's cached value, freshness and refresh scheduling. Cheap to
/// clone; all clones share the same state.
///
/// A refresh cycle either replaces the cached value atomically or leaves it
/// untouched and records the error, so readers never observe a partial
/// update and a transient upstream failure keeps the last good value on
/// display.
#[derive(Clone)]
pub struct MetricCoordinator {
    inner: Arc<Inner>,
}

impl MetricCoordinator {
    pub fn new(client: Arc<StokerClient>, descriptor: MetricDescriptor) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                descriptor,
                state: Mutex::new(StateInner {
                    value: MetricValue::Unset,
                    last_error: None,
                    last_attempt: None,
                    cycle: 0,
                }),
                gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.inner.descriptor
    }

    pub fn state(&self) -> MetricState {
        let st = self.inner.state.lock().expect("metric state poisoned");
        MetricState {
            value: st.value.clone(),
            last_error: st.last_error.clone(),
            last_attempt: st.last_attempt,
        }
    }

    pub fn value(&self) -> MetricValue {
        self.inner.state.lock().expect("metric state poisoned").value.clone()
    }

    pub fn available(&self) -> bool {
        self.state().available()
    }

    /// Fetch, extract and cache one cycle. Concurrent calls coalesce: a call
    /// that queues behind an in-flight fetch returns as soon as that fetch
    /// completes, without issuing a second request. Client errors are
    /// recorded, never propagated.
    pub async fn refresh(&self) {
        let entered = self.inner.state.lock().expect("metric state poisoned").cycle;

        let _gate = self.inner.gate.lock().await;
        {
            let st = self.inner.state.lock().expect("metric state poisoned");
            if st.cycle != entered {
                debug!(metric = %self.inner.descriptor.key, "refresh coalesced into in-flight fetch");
                return;
            }
        }

        let outcome = self.inner.client.read_metric(&self.inner.descriptor).await;

        let mut st = self.inner.state.lock().expect("metric state poisoned");
        st.cycle += 1;
        st.last_attempt = Some(Utc::now());
        match outcome {
            Ok(value) => {
                // An Unset extraction is still a successful cycle; the field
                // is genuinely absent upstream, which is not a failure.
                st.value = value;
                st.last_error = None;
            }
            Err(e) => {
                warn!(metric = %self.inner.descriptor.key, error = %e, "refresh failed, keeping cached value");
                st.last_error = Some(e.to_string());
            }
        }
    }

    /// Replace the cached value locally after a confirmed write. The next
    /// scheduled refresh is authoritative and will overwrite this.
    pub fn apply_optimistic(&self, value: MetricValue) {
        let mut st = self.inner.state.lock().expect("metric state poisoned");
        st.value = value;
    }

    /// Drive the scheduled refresh loop at the descriptor's scan interval. A
    /// tick that lands while the previous fetch is still in flight is
    /// skipped, not queued, so a hung request never piles up work. The caller
    /// is expected to have done the initial refresh already; the immediate
    /// first tick is consumed.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.inner.descriptor.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }

    /// Spawn `run` on the current runtime. Aborting the returned handle is
    /// the intended teardown; value replacement is atomic so an abandoned
    /// in-flight fetch leaves no partial state.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run().await })
    }
}
