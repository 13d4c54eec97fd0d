use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::device::Device;

/// Placeholder shown in an empty "new device" input; never a valid name.
pub const DEVICE_NAME_PLACEHOLDER: &str = "Enter name of new device...";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read device file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write device file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse device file {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to serialize devices: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Please enter a valid device name.")]
    InvalidName,

    #[error("Device '{0}' already exists.")]
    Duplicate(String),
}

/// On-disk layout of the device file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceFile {
    devices: Vec<Device>,
}

/// Ordered device records mirrored to a single JSON file.
///
/// Every mutating operation rewrites the whole file. There is no locking and
/// no atomic replace: a single process is assumed to own the file.
#[derive(Debug)]
pub struct DeviceStore {
    path: PathBuf,
    devices: Vec<Device>,
}

impl DeviceStore {
    /// Open the store at `path`, loading its current contents.
    ///
    /// A missing file is an empty store; it is created on the first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let devices = read_devices(&path)?;
        info!("Loaded {} devices from {}", devices.len(), path.display());
        Ok(Self { path, devices })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    /// Replace the in-memory devices with the file's current contents.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.devices = read_devices(&self.path)?;
        debug!("Reloaded {} devices", self.devices.len());
        Ok(())
    }

    /// Overwrite the backing file with the in-memory devices.
    pub fn save(&self) -> Result<(), StoreError> {
        let file = DeviceFile {
            devices: self.devices.clone(),
        };
        let json = to_json_pretty(&file)?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Write(self.path.clone(), e))?;
        debug!("Saved {} devices to {}", self.devices.len(), self.path.display());
        Ok(())
    }

    /// Index of the first device (in store order) whose name occurs in the utterance.
    pub fn find_mentioned(&self, utterance: &str) -> Option<usize> {
        let lower = utterance.to_lowercase();
        self.devices.iter().position(|d| d.is_mentioned_in(&lower))
    }

    /// Add a new device, classified by its name.
    ///
    /// The file is re-read first so duplicates are checked against what is on
    /// disk, then the new record is appended and everything is written back.
    pub fn add(&mut self, name: &str) -> Result<&Device, StoreError> {
        let name = name.trim();
        if name.is_empty() || name == DEVICE_NAME_PLACEHOLDER {
            return Err(StoreError::InvalidName);
        }

        self.reload()?;

        if self.devices.iter().any(|d| d.has_name(name)) {
            return Err(StoreError::Duplicate(name.to_string()));
        }

        let device = Device::new(name);
        info!("Adding device '{}' ({})", name, super::DeviceKind::classify(name));
        self.devices.push(device);
        self.save()?;
        self.reload()?;

        let index = self.devices.len() - 1;
        Ok(&self.devices[index])
    }

    /// Remove every device whose name equals `name`, ignoring case.
    ///
    /// Returns the number of records removed. The file is rewritten and
    /// re-read even when nothing matched.
    pub fn remove(&mut self, name: &str) -> Result<usize, StoreError> {
        let before = self.devices.len();
        self.devices.retain(|d| !d.has_name(name));
        let removed = before - self.devices.len();
        info!("Removed {} device(s) named '{}'", removed, name);

        self.save()?;
        self.reload()?;
        Ok(removed)
    }

    /// Apply `update` to the device at `index` and persist the result.
    ///
    /// Returns a copy of the updated record, or `None` if the index is out of range.
    pub fn update<F>(&mut self, index: usize, update: F) -> Result<Option<Device>, StoreError>
    where
        F: FnOnce(&mut Device),
    {
        let Some(device) = self.devices.get_mut(index) else {
            return Ok(None);
        };
        update(device);
        let updated = device.clone();
        self.save()?;
        Ok(Some(updated))
    }
}

fn read_devices(path: &Path) -> Result<Vec<Device>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Device file {} does not exist yet", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(StoreError::Read(path.to_path_buf(), e)),
    };

    let file: DeviceFile =
        serde_json::from_str(&contents).map_err(|e| StoreError::Parse(path.to_path_buf(), e))?;
    Ok(file.devices)
}

/// Serialize with four-space indentation, the layout the device file has always used.
fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(StoreError::Serialize)?;
    Ok(buf)
}
