//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                      |
//! |------------|--------------|----------------------------------|
//! | `device_id`| -            | Factory MAC                      |
//! | `hardware` | ActuatorPort | Valves, indicator LEDs, buzzer   |
//! | `modem`    | ModemPort    | GSM module reset line + session  |
//! | `log_sink` | EventSink    | Serial log output                |
//! | `time`     | -            | ESP32 system timer               |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod modem;
pub mod time;
