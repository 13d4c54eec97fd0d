use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use homevoice::nlu::NluError;
use homevoice::Assistant;
use homevoice::Console;
use homevoice::DetectedIntent;
use homevoice::Device;
use homevoice::DeviceStore;
use homevoice::IntentDetector;
use serde_json::json;
use tempfile::TempDir;

/// Detector answering from a fixed table of utterance -> (intent, params).
struct TableDetector {
    table: HashMap<&'static str, (&'static str, serde_json::Value)>,
}

#[async_trait]
impl IntentDetector for TableDetector {
    async fn detect_intent(&self, text: &str) -> Result<DetectedIntent, NluError> {
        let Some((intent, params)) = self.table.get(text) else {
            return Ok(DetectedIntent {
                intent: None,
                fulfillment: "Sorry, I didn't get that.".to_string(),
                params: Default::default(),
            });
        };
        Ok(DetectedIntent {
            intent: Some(intent.to_string()),
            fulfillment: String::new(),
            params: params.as_object().cloned().unwrap_or_default(),
        })
    }
}

#[derive(Default)]
struct Lines(Mutex<Vec<String>>);

impl Console for Lines {
    fn log(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_string());
    }

    fn device_changed(&self, device: &Device) {
        self.0.lock().unwrap().push(format!("[row] {}", device.label()));
    }

    fn devices_refreshed(&self, devices: &[Device]) {
        for device in devices {
            self.0.lock().unwrap().push(format!("[list] {}", device.label()));
        }
    }
}

#[tokio::test]
async fn test_conversation_persists_device_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devices.json");

    let detector = TableDetector {
        table: HashMap::from([
            ("turn on the bedroom ac", ("smarthome.device.switch.on", json!({}))),
            ("set it to 20 degrees", ("smarthome.heating.set", json!({"final-value": 20}))),
            ("two degrees warmer", ("smarthome.heating.up", json!({"change-value": 2}))),
            ("turn off the bedroom ac", ("smarthome.device.switch.off", json!({}))),
        ]),
    };
    let console = Arc::new(Lines::default());
    let assistant = Assistant::new(
        DeviceStore::open(&path).unwrap(),
        Arc::new(detector),
        console.clone(),
    );

    assistant.add_device("Bedroom AC").await.unwrap();
    assistant.add_device("Hall Light").await.unwrap();

    let replies = [
        assistant.ask("set it to 20 degrees").await,
        assistant.ask("turn on the bedroom ac").await,
        assistant.ask("set it to 20 degrees").await,
        assistant.ask("two degrees warmer").await,
        assistant.ask("turn off the bedroom ac").await,
        assistant.ask("tell me a joke").await,
    ];
    let replies: Vec<_> = replies.into_iter().map(Option::unwrap).collect();

    assert_eq!(
        replies,
        [
            "Please turn on the AC before setting the temperature.",
            "Turning on the Bedroom AC.",
            "Setting Bedroom AC from 24°C to 20°C.",
            "Increasing Bedroom AC from 20°C to 22°C.",
            "Turning off the Bedroom AC.",
            "Sorry, I didn't get that.",
        ]
    );

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["devices"][0]["name"], "Bedroom AC");
    assert_eq!(on_disk["devices"][0]["status"], "OFF");
    assert_eq!(on_disk["devices"][0]["temperature"], 22);
    assert_eq!(on_disk["devices"][1]["name"], "Hall Light");
    assert!(on_disk["devices"][1].get("temperature").is_none());

    let rows: Vec<_> = console
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|l| l.starts_with("[row]"))
        .cloned()
        .collect();
    assert_eq!(
        rows,
        [
            "[row] Bedroom AC is ON | Temp: 24°C",
            "[row] Bedroom AC is ON | Temp: 20°C",
            "[row] Bedroom AC is ON | Temp: 22°C",
            "[row] Bedroom AC is OFF | Temp: 22°C",
        ]
    );
}

#[tokio::test]
async fn test_remove_then_command_asks_which_device() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devices.json");
    std::fs::write(
        &path,
        r#"{"devices": [{"name": "Fan", "status": "OFF"}, {"name": "fan", "status": "ON"}]}"#,
    )
    .unwrap();

    let detector = TableDetector {
        table: HashMap::from([("turn on the fan", ("smarthome.device.switch.on", json!({})))]),
    };
    let assistant = Assistant::new(
        DeviceStore::open(&path).unwrap(),
        Arc::new(detector),
        Arc::new(Lines::default()),
    );

    assert_eq!(assistant.remove_device("FAN").await.unwrap(), 2);
    assert_eq!(
        assistant.ask("turn on the fan").await.unwrap(),
        "Which device would you like to turn on?"
    );
    assert_eq!(
        std::fs::read_to_string(&path).unwrap().replace(char::is_whitespace, ""),
        r#"{"devices":[]}"#
    );
}
