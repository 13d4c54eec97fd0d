use serde::Deserialize;
use serde::Serialize;
use strum::Display;

/// Temperature assigned to newly added climate devices, in °C.
pub const DEFAULT_TEMPERATURE: i64 = 24;

const INTENT_LIGHTS_ON: &str = "smarthome.lights.switch.on";
const INTENT_LIGHTS_OFF: &str = "smarthome.lights.switch.off";
const INTENT_DEVICE_ON: &str = "smarthome.device.switch.on";
const INTENT_DEVICE_OFF: &str = "smarthome.device.switch.off";
const INTENT_TEMP_SET: &str = "smarthome.temp.set";

/// Power state of a device, stored as `"ON"` / `"OFF"` in the device file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

/// Broad class of a device, derived from its name when it is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Light,
    Climate,
    Generic,
}

impl DeviceKind {
    /// Classify a device name.
    ///
    /// `light` wins over the climate keywords, so "Heater Light" is a light.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("light") {
            DeviceKind::Light
        } else if lower.contains("ac") || lower.contains("heater") {
            DeviceKind::Climate
        } else {
            DeviceKind::Generic
        }
    }
}

/// A device record as persisted in the device file.
///
/// `temperature` is present only for climate devices. Keys this type does
/// not know about are carried in `extra` so a load/save cycle keeps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,

    pub status: PowerState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_off: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_temp: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Device {
    /// Build a new, switched-off device with the defaults for its class.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = DeviceKind::classify(&name);

        let (intent_on, intent_off) = match kind {
            DeviceKind::Light => (INTENT_LIGHTS_ON, INTENT_LIGHTS_OFF),
            DeviceKind::Climate | DeviceKind::Generic => (INTENT_DEVICE_ON, INTENT_DEVICE_OFF),
        };
        let (temperature, intent_temp) = match kind {
            DeviceKind::Climate => (Some(DEFAULT_TEMPERATURE), Some(INTENT_TEMP_SET.to_string())),
            DeviceKind::Light | DeviceKind::Generic => (None, None),
        };

        Self {
            name,
            status: PowerState::Off,
            temperature,
            intent_on: Some(intent_on.to_string()),
            intent_off: Some(intent_off.to_string()),
            intent_temp,
            extra: serde_json::Map::new(),
        }
    }

    /// Whether this device carries a temperature setting.
    pub fn is_climate(&self) -> bool {
        self.temperature.is_some()
    }

    pub fn is_on(&self) -> bool {
        self.status.is_on()
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Whether the device name occurs anywhere in an already lower-cased utterance.
    pub fn is_mentioned_in(&self, utterance_lower: &str) -> bool {
        let name = self.name.trim().to_lowercase();
        !name.is_empty() && utterance_lower.contains(&name)
    }

    /// Text shown on the device's row in the UI.
    pub fn label(&self) -> String {
        match self.temperature {
            Some(t) => format!("{} is {} | Temp: {}°C", self.name, self.status, t),
            None => format!("{} is {}", self.name, self.status),
        }
    }
}
