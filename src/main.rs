//! WaterKiosk Firmware: Main Entry Point
//!
//! Hexagonal architecture with an interrupt-fed event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   CellularModem   LogEventSink   Esp32Time    │
//! │  (ActuatorPort)    (ModemPort)     (EventSink)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             KioskService (pure logic)                  │    │
//! │  │  Payment UI · Coordinator · Taps · Link                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ISRs: flow meters → pulse counters, buttons → event queue     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use waterkiosk::adapters::device_id;
use waterkiosk::adapters::hardware::HardwareAdapter;
use waterkiosk::adapters::log_sink::LogEventSink;
use waterkiosk::adapters::modem::CellularModem;
use waterkiosk::adapters::time::Esp32TimeAdapter;
use waterkiosk::app::service::KioskService;
use waterkiosk::config::KioskConfig;
use waterkiosk::drivers::button::ButtonBank;
use waterkiosk::drivers::watchdog::Watchdog;
use waterkiosk::drivers::{hw_init, hw_timer};
use waterkiosk::events::{self, Event};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  WaterKiosk v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = KioskConfig::default();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;

    // ── 3. Hardware peripherals ───────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Valves cannot be trusted; halt and let the watchdog reset us.
        log::error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service() {
        log::error!("ISR service init failed: {}, no flow metering, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    hw_timer::start_control_timer(config.control_loop_interval_ms);
    let watchdog = Watchdog::default();

    // ── 4. Adapters ───────────────────────────────────────────
    let kiosk_id = device_id::kiosk_id(&device_id::read_mac());
    info!("Kiosk ID: {}", kiosk_id);

    let time = Esp32TimeAdapter::new();
    let mut hw = HardwareAdapter::from_pins();
    let mut modem = CellularModem::new(&kiosk_id);
    let mut log_sink = LogEventSink::new();
    let mut buttons = ButtonBank::new();

    // ── 5. App service ────────────────────────────────────────
    let mut app = KioskService::new(config.clone());
    app.start(time.uptime_ms(), &mut log_sink);

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let now_ms = time.uptime_ms();

        buttons.tick(now_ms as u32);

        events::drain_events(|event| match event {
            Event::ControlTick => {
                app.tick(now_ms, &mut hw, &mut modem, &mut log_sink);
                watchdog.feed();
            }
            other => {
                let Some(cmd) = other.into_command() else { return };
                if let Err(e) = app.handle_command(cmd, now_ms, &mut hw, &mut log_sink) {
                    warn!("Command rejected: {}", e);
                }
            }
        });

        hw.update(now_ms);

        // Yield to the idle task between control ticks.
        esp_idf_hal::delay::FreeRtos::delay_ms(5);
    }
}
