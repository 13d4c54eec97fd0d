mod device;
mod store;

pub use device::Device;
pub use device::DeviceKind;
pub use device::PowerState;
pub use device::DEFAULT_TEMPERATURE;
pub use store::DeviceStore;
pub use store::StoreError;
pub use store::DEVICE_NAME_PLACEHOLDER;
