//! Intent handlers for switching devices and adjusting temperature.
//!
//! Devices are located by plain substring search: the first device, in store
//! order, whose lower-cased name occurs in the lower-cased utterance wins.
//! There is no scoring, so "Light" also matches an utterance about "Light2".

use serde_json::Value;
use tracing::info;

use super::Params;
use super::Reply;
use crate::devices::DeviceStore;
use crate::devices::PowerState;
use crate::devices::StoreError;

const PARAM_FINAL_VALUE: &str = "final-value";
const PARAM_CHANGE_VALUE: &str = "change-value";

pub fn turn_on(store: &mut DeviceStore, utterance: &str, _params: &Params) -> Result<Reply, StoreError> {
    switch(store, utterance, PowerState::On)
}

pub fn turn_off(store: &mut DeviceStore, utterance: &str, _params: &Params) -> Result<Reply, StoreError> {
    switch(store, utterance, PowerState::Off)
}

fn switch(store: &mut DeviceStore, utterance: &str, status: PowerState) -> Result<Reply, StoreError> {
    let verb = match status {
        PowerState::On => "on",
        PowerState::Off => "off",
    };

    let Some(index) = store.find_mentioned(utterance) else {
        return Ok(Reply::text(format!("Which device would you like to turn {}?", verb)));
    };

    match store.update(index, |d| d.status = status)? {
        Some(device) => {
            info!("{} switched {}", device.name, status);
            let text = format!("Turning {} the {}.", verb, device.name);
            Ok(Reply::with_update(text, device))
        }
        None => Ok(Reply::text(format!("Which device would you like to turn {}?", verb))),
    }
}

pub fn set_temperature(
    store: &mut DeviceStore,
    utterance: &str,
    params: &Params,
) -> Result<Reply, StoreError> {
    let Some(index) = climate_target(store, utterance) else {
        return Ok(Reply::text(
            "Please turn on the AC before setting the temperature.",
        ));
    };
    let Some(value) = numeric_param(params, PARAM_FINAL_VALUE) else {
        return Ok(Reply::text("Please provide a valid temperature value."));
    };

    adjust(store, index, "Setting", |_| value)
}

pub fn increase_temperature(
    store: &mut DeviceStore,
    utterance: &str,
    params: &Params,
) -> Result<Reply, StoreError> {
    let Some(index) = climate_target(store, utterance) else {
        return Ok(Reply::text(
            "Please turn on the heater or AC before adjusting the temperature.",
        ));
    };
    let Some(change) = numeric_param(params, PARAM_CHANGE_VALUE) else {
        return Ok(Reply::text("Please provide a valid temperature increment."));
    };

    adjust(store, index, "Increasing", |t| t.saturating_add(change))
}

pub fn decrease_temperature(
    store: &mut DeviceStore,
    utterance: &str,
    params: &Params,
) -> Result<Reply, StoreError> {
    let Some(index) = climate_target(store, utterance) else {
        return Ok(Reply::text(
            "Please turn on the heater or AC before adjusting the temperature.",
        ));
    };
    let Some(change) = numeric_param(params, PARAM_CHANGE_VALUE) else {
        return Ok(Reply::text("Please provide a valid temperature decrement."));
    };

    adjust(store, index, "Decreasing", |t| t.saturating_sub(change))
}

/// Pick the climate device a temperature command applies to.
///
/// A climate device named in the utterance is the target and must be on.
/// Otherwise the first climate device that is on is used.
fn climate_target(store: &DeviceStore, utterance: &str) -> Option<usize> {
    let lower = utterance.to_lowercase();
    let devices = store.devices();

    if let Some(index) = devices
        .iter()
        .position(|d| d.is_climate() && d.is_mentioned_in(&lower))
    {
        return devices[index].is_on().then_some(index);
    }

    devices.iter().position(|d| d.is_climate() && d.is_on())
}

fn adjust<F>(store: &mut DeviceStore, index: usize, verb: &str, apply: F) -> Result<Reply, StoreError>
where
    F: FnOnce(i64) -> i64,
{
    let Some(old) = store.get(index).and_then(|d| d.temperature) else {
        return Ok(Reply::text(
            "Please turn on the heater or AC before adjusting the temperature.",
        ));
    };
    let new = apply(old);

    match store.update(index, |d| d.temperature = Some(new))? {
        Some(device) => {
            info!("{} temperature {} -> {}", device.name, old, new);
            let text = format!("{} {} from {}°C to {}°C.", verb, device.name, old, new);
            Ok(Reply::with_update(text, device))
        }
        None => Ok(Reply::text(
            "Please turn on the heater or AC before adjusting the temperature.",
        )),
    }
}

/// Read a numeric parameter, truncating fractional values toward zero.
fn numeric_param(params: &Params, key: &str) -> Option<i64> {
    match params.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}
