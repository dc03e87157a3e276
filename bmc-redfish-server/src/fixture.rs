//! The `MockBus` fixture this demo registers its handlers against: one
//! chassis with a fan and a temperature sensor, in the
//! `xyz.openbmc_project` object-broker namespace real BMC firmware uses.

use redfish_core::bus::MockBus;
use serde_json::json;

pub const CHASSIS_SERVICE: &str = "xyz.openbmc_project.Inventory.Manager";
pub const CHASSIS_PATH: &str = "/xyz/openbmc_project/inventory/system/chassis0";
pub const SENSOR_SERVICE: &str = "xyz.openbmc_project.HwmonTempSensor";
pub const FAN_PATH: &str = "/xyz/openbmc_project/sensors/fan_tach/fan0";
pub const TEMP_PATH: &str = "/xyz/openbmc_project/sensors/temperature/ambient0";

pub fn build() -> MockBus {
    MockBus::new()
        .with_property(
            CHASSIS_SERVICE,
            CHASSIS_PATH,
            "xyz.openbmc_project.Inventory.Item",
            "PrettyName",
            json!("Main Chassis"),
        )
        .with_property(
            CHASSIS_SERVICE,
            CHASSIS_PATH,
            "xyz.openbmc_project.Inventory.Item",
            "Present",
            json!(true),
        )
        .with_property(
            SENSOR_SERVICE,
            FAN_PATH,
            "xyz.openbmc_project.Sensor.Value",
            "Value",
            json!(4200.0),
        )
        .with_property(
            SENSOR_SERVICE,
            TEMP_PATH,
            "xyz.openbmc_project.Sensor.Value",
            "Value",
            json!(36.5),
        )
        .with_sub_tree_entry(
            FAN_PATH,
            &[(SENSOR_SERVICE, &["xyz.openbmc_project.Sensor.Value"])],
        )
        .with_sub_tree_entry(
            TEMP_PATH,
            &[(SENSOR_SERVICE, &["xyz.openbmc_project.Sensor.Value"])],
        )
        .with_association(CHASSIS_PATH, &[FAN_PATH, TEMP_PATH])
}
