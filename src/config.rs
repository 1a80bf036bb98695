use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const VATSPY_DATA_URL: &str =
    "https://raw.githubusercontent.com/vatsimnetwork/vatspy-data-project/master/VATSpy.dat";
pub const VATSPY_BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/vatsimnetwork/vatspy-data-project/master/Boundaries.geojson";
pub const VATSIM_API_URL: &str = "https://data.vatsim.net/v3/vatsim-data.json";
pub const OURAIRPORTS_RUNWAYS_URL: &str = "https://ourairports.com/data/runways.csv";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    pub period_secs: u64,
    pub timeout_secs: u64,
}

impl PollConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootConfig {
    pub retries: u32,
    pub retry_cooldown_secs: u64,
}

impl BootConfig {
    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VatspyConfig {
    pub data_url: String,
    pub boundaries_url: String,
    pub poll: PollConfig,
    pub boot: BootConfig,
}

impl Default for VatspyConfig {
    fn default() -> Self {
        Self {
            data_url: VATSPY_DATA_URL.to_string(),
            boundaries_url: VATSPY_BOUNDARIES_URL.to_string(),
            poll: PollConfig {
                period_secs: 24 * 3600,
                timeout_secs: 5,
            },
            boot: BootConfig {
                retries: 3,
                retry_cooldown_secs: 3,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VatsimConfig {
    pub url: String,
    pub poll: PollConfig,
    pub boot: BootConfig,
}

impl Default for VatsimConfig {
    fn default() -> Self {
        Self {
            url: VATSIM_API_URL.to_string(),
            poll: PollConfig {
                period_secs: 15,
                timeout_secs: 3,
            },
            boot: BootConfig {
                retries: 5,
                retry_cooldown_secs: 3,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OurairportsConfig {
    pub url: String,
    pub poll: PollConfig,
    pub boot: BootConfig,
}

impl Default for OurairportsConfig {
    fn default() -> Self {
        Self {
            url: OURAIRPORTS_RUNWAYS_URL.to_string(),
            poll: PollConfig {
                period_secs: 24 * 3600,
                timeout_secs: 10,
            },
            boot: BootConfig {
                retries: 3,
                retry_cooldown_secs: 3,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MergedConfig {
    pub data: VatspyConfig,
    pub api: VatsimConfig,
    pub runways: OurairportsConfig,
}
