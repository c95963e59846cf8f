use std::time::Duration;

use crate::extract::{Selector, Strategy};

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MetricKind {
    Temperature,
    Mass,
    Power,
    Percentage,
    State,
    Raw,
}

/// Static description of one telemetry reading: where to look for it in the
/// raw payload and how to type it. Immutable once constructed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricDescriptor {
    pub key: String,
    pub kind: MetricKind,
    pub strategies: Vec<Strategy>,
    #[serde(default = "default_interval", with = "duration_secs")]
    pub scan_interval: Duration,
}

fn default_interval() -> Duration {
    DEFAULT_SCAN_INTERVAL
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl MetricDescriptor {
    pub fn new(key: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            key: key.into(),
            kind,
            strategies: Vec::new(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }
}

/// A writable remote setting paired with the read metric that reflects it.
/// The write endpoint addresses settings by `menu` and `name`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SetpointSpec {
    pub metric: String,
    pub menu: String,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

fn scan(group: &str, id: &str) -> Strategy {
    Strategy::TaggedScan {
        group: group.into(),
        id: id.into(),
    }
}

fn keys(names: &[&str]) -> Strategy {
    Strategy::FlatKeys(names.iter().map(|s| s.to_string()).collect())
}

fn path(selectors: &[&str]) -> Strategy {
    Strategy::Path(selectors.iter().map(|s| Selector::Key(s.to_string())).collect())
}

/// The stock descriptor table for an NBE controller. The upstream schema was
/// never documented and drifts between firmware revisions, so each metric
/// carries fallback locations; callers with a known schema can supply their
/// own table instead.
pub fn default_descriptors() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::new("boiler_temperature", MetricKind::Temperature).with_strategies(vec![
            scan("frontdata", "boilertemp"),
            keys(&["boiler.temp.current", "boilertemp"]),
        ]),
        MetricDescriptor::new("external_temperature", MetricKind::Temperature).with_strategies(
            vec![
                scan("frontdata", "externaltemp"),
                scan("weatherdata", "outdoortemp"),
                keys(&["external.temp"]),
            ],
        ),
        MetricDescriptor::new("wanted_boiler_temperature", MetricKind::Temperature)
            .with_strategies(vec![
                scan("frontdata", "wantedboilertemp"),
                keys(&["boiler.temp"]),
            ]),
        MetricDescriptor::new("hot_water_temperature", MetricKind::Temperature).with_strategies(
            vec![scan("frontdata", "dhw"), keys(&["hotwater.temp"])],
        ),
        MetricDescriptor::new("hot_water_wanted_temperature", MetricKind::Temperature)
            .with_strategies(vec![
                scan("frontdata", "dhwwanted"),
                keys(&["hotwater.wanted"]),
            ]),
        MetricDescriptor::new("shaft_temperature", MetricKind::Temperature)
            .with_strategies(vec![scan("frontdata", "shafttemp")]),
        MetricDescriptor::new("output_power_kw", MetricKind::Power).with_strategies(vec![
            scan("frontdata", "boilereffect"),
            keys(&["boiler.effect"]),
        ]),
        MetricDescriptor::new("output_power_pct", MetricKind::Percentage).with_strategies(vec![
            scan("frontdata", "boilerpower"),
            keys(&["boiler.power"]),
        ]),
        MetricDescriptor::new("oxygen", MetricKind::Percentage)
            .with_strategies(vec![scan("boilerdata", "12")]),
        MetricDescriptor::new("state", MetricKind::State).with_strategies(vec![
            path(&["miscdata", "state", "value"]),
            keys(&["miscdata.state"]),
        ]),
        MetricDescriptor::new("pump_state", MetricKind::Raw)
            .with_strategies(vec![path(&["leftoutput", "output-2", "val"])]),
        MetricDescriptor::new("hopper_consumption_24h", MetricKind::Mass).with_strategies(vec![
            scan("hopperdata", "3"),
            scan("hopperdata", "hopper2"),
        ]),
        MetricDescriptor::new("hopper_content", MetricKind::Mass).with_strategies(vec![
            scan("hopperdata", "1"),
            keys(&["hopper.content"]),
        ]),
        MetricDescriptor::new("hot_water_difference_under", MetricKind::Temperature)
            .with_strategies(vec![keys(&["hotwater.diff_under", "dhw.diff_under"])]),
        // Schema location for the photo sensor is not reliably known; search
        // the whole tree for its (id, selection) pair.
        MetricDescriptor::new("photo_level", MetricKind::Percentage).with_strategies(vec![
            Strategy::DeepSearch {
                id: "13".into(),
                selection: "photosensor".into(),
            },
        ]),
    ]
}

/// Writable settings and the number-box limits the controller enforces.
pub fn default_setpoints() -> Vec<SetpointSpec> {
    vec![
        SetpointSpec {
            metric: "wanted_boiler_temperature".into(),
            menu: "boiler.temp".into(),
            name: "boiler.temp".into(),
            min: 30.0,
            max: 90.0,
            step: 1.0,
        },
        SetpointSpec {
            metric: "hopper_content".into(),
            menu: "hopper.content".into(),
            name: "hopper.content".into(),
            min: 0.0,
            max: 5000.0,
            step: 1.0,
        },
        SetpointSpec {
            metric: "hot_water_difference_under".into(),
            menu: "hotwater.diff_under".into(),
            name: "hotwater.diff_under".into(),
            min: 5.0,
            max: 30.0,
            step: 1.0,
        },
    ]
}
