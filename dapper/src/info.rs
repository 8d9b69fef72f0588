// Dapper - dapper
// Module: Probe Information
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Identity block reported by the probe firmware.

use std::fmt;

use dapper_runtime::Value;

/// Placeholder for fields the firmware did not report
pub const NOT_AVAILABLE: &str = "N/A";

/// Probe and target identity returned by `getProbeDAPInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    /// USB vendor id
    pub vendor_id:        String,
    /// USB product id
    pub product_id:       String,
    /// Serial number
    pub serial_no:        String,
    /// CMSIS-DAP firmware version
    pub firmware_version: String,
    /// Target device vendor
    pub target_vendor:    String,
    /// Target device name
    pub target_name:      String,
    /// Board vendor
    pub board_vendor:     String,
    /// Board name
    pub board_name:       String,
    /// Product firmware version
    pub product_firmware_version: String,
}

fn field(value: &Value, key: &str) -> String {
    match value.field(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Int(number)) => number.to_string(),
        Some(Value::Float(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

impl ProbeInfo {
    /// Build from the object the module returns.
    ///
    /// Missing or non-scalar fields read as [`NOT_AVAILABLE`]; anything other
    /// than an object yields a block of placeholders.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            vendor_id:        field(value, "vendorId"),
            product_id:       field(value, "productId"),
            serial_no:        field(value, "serialNo"),
            firmware_version: field(value, "firmwareVer"),
            target_vendor:    field(value, "targetVendor"),
            target_name:      field(value, "targetName"),
            board_vendor:     field(value, "boardVendor"),
            board_name:       field(value, "boardName"),
            product_firmware_version: field(value, "productFwVer"),
        }
    }
}

impl fmt::Display for ProbeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vendor ID: {}", self.vendor_id)?;
        writeln!(f, "Product ID: {}", self.product_id)?;
        writeln!(f, "Serial No: {}", self.serial_no)?;
        writeln!(f, "Firmware Version: {}", self.firmware_version)?;
        writeln!(f, "Target Vendor: {}", self.target_vendor)?;
        writeln!(f, "Target Name: {}", self.target_name)?;
        writeln!(f, "Board Vendor: {}", self.board_vendor)?;
        writeln!(f, "Board Name: {}", self.board_name)?;
        write!(f, "Product Firmware Version: {}", self.product_firmware_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_object() {
        let value = Value::object([
            ("vendorId", Value::String("0x1FC9".into())),
            ("productId", Value::Int(0x0143)),
            ("serialNo", Value::String("ABCD1234".into())),
            ("firmwareVer", Value::String("2.1.0".into())),
            ("targetName", Value::String("LPC55S69".into())),
        ]);
        let info = ProbeInfo::from_value(&value);
        assert_eq!(info.vendor_id, "0x1FC9");
        assert_eq!(info.product_id, "323");
        assert_eq!(info.serial_no, "ABCD1234");
        assert_eq!(info.firmware_version, "2.1.0");
        assert_eq!(info.target_name, "LPC55S69");
        assert_eq!(info.board_vendor, NOT_AVAILABLE);
        assert_eq!(info.product_firmware_version, NOT_AVAILABLE);
    }

    #[test]
    fn test_non_object_is_all_placeholders() {
        let info = ProbeInfo::from_value(&Value::Undefined);
        assert_eq!(info.vendor_id, NOT_AVAILABLE);
        assert_eq!(info.board_name, NOT_AVAILABLE);
    }

    #[test]
    fn test_display_lists_every_field() {
        let text = ProbeInfo::from_value(&Value::Null).to_string();
        assert_eq!(text.lines().count(), 9);
        assert!(text.starts_with("Vendor ID: N/A"));
    }
}
