use serde::{Deserialize, Serialize};

/// Output profile selected when a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputProfile {
    /// Low bit-rate, narrowband speech
    Narrowband,
    /// Higher bit-rate, wideband audio
    Wideband,
}

impl std::str::FromStr for OutputProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "narrowband" | "amr" => Ok(Self::Narrowband),
            "wideband" | "aac" => Ok(Self::Wideband),
            other => Err(format!("unknown output profile: {}", other)),
        }
    }
}

/// Encoding parameters for one output profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// File extension of the produced artifact (without the dot)
    pub extension: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Target bit rate in bits per second
    ///
    /// Only recorders that encode natively apply it; PCM output such as
    /// `WavRecorder` logs it and otherwise ignores it.
    pub bit_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl ProfileSettings {
    pub fn narrowband() -> Self {
        Self {
            extension: "amr".to_string(),
            sample_rate: 8000,
            bit_rate: 12200,
            channels: 1,
        }
    }

    pub fn wideband() -> Self {
        Self {
            extension: "m4a".to_string(),
            sample_rate: 32000,
            bit_rate: 64000,
            channels: 1,
        }
    }
}

/// Settings for every profile, looked up at `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTable {
    #[serde(default = "ProfileSettings::narrowband")]
    pub narrowband: ProfileSettings,
    #[serde(default = "ProfileSettings::wideband")]
    pub wideband: ProfileSettings,
}

impl ProfileTable {
    pub fn get(&self, profile: OutputProfile) -> &ProfileSettings {
        match profile {
            OutputProfile::Narrowband => &self.narrowband,
            OutputProfile::Wideband => &self.wideband,
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            narrowband: ProfileSettings::narrowband(),
            wideband: ProfileSettings::wideband(),
        }
    }
}
