//! Kiosk identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable label in the form `WK-XXYYZZ` (last 3 bytes of the
//! 6-byte MAC in uppercase hex).  It is logged at boot and stands in for
//! the modem IMEI when the modem cannot report one.

use core::fmt::Write;

pub type KioskIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn kiosk_id(mac: &MacAddress) -> KioskIdString {
    let mut id = KioskIdString::new();
    let _ = write!(id, "WK-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}
