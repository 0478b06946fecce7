//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and installs the per-pin ISRs for the flow
//! meters and tap buttons using raw ESP-IDF sys calls.  Called once from
//! `main()` before the event loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::config::NUM_OF_TAPS;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before event loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn config_input(pin: i32, intr: gpio_int_type_t) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: intr,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    for tap in &pins::TAP_PINS {
        unsafe {
            config_input(tap.flowmeter, gpio_int_type_t_GPIO_INTR_POSEDGE)?;
            config_input(tap.button, gpio_int_type_t_GPIO_INTR_NEGEDGE)?;
        }
    }
    info!("hw_init: GPIO inputs configured ({} flow meters, {} buttons)", NUM_OF_TAPS, NUM_OF_TAPS);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Inputs idle HIGH (pull-ups) on the host.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let mut output_pins: heapless::Vec<i32, { NUM_OF_TAPS * 3 + 2 }> = heapless::Vec::new();
    for tap in &pins::TAP_PINS {
        let _ = output_pins.extend_from_slice(&[tap.motor_open, tap.motor_close, tap.led]);
    }
    let _ = output_pins.push(pins::BUZZER_GPIO);
    let _ = output_pins.push(pins::GSM_RESET_GPIO);

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    // Reset is active-low: release the modem.
    unsafe { gpio_set_level(pins::GSM_RESET_GPIO, 1) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO ISR Service ──────────────────────────────────────────

/// ISR argument encoding: the tap index travels in the pointer value.
#[cfg(target_os = "espidf")]
fn tap_arg(tap: usize) -> *mut core::ffi::c_void {
    tap as *mut core::ffi::c_void
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn flow_gpio_isr(arg: *mut core::ffi::c_void) {
    crate::flow::on_flow_pulse(arg as usize);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a RTC counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    crate::drivers::button::button_isr_handler(arg as usize, now_ms);
}

#[cfg(target_os = "espidf")]
unsafe fn add_isr(
    pin: i32,
    intr: gpio_int_type_t,
    handler: unsafe extern "C" fn(*mut core::ffi::c_void),
    tap: usize,
) -> Result<(), HwInitError> {
    unsafe {
        gpio_set_intr_type(pin, intr);
        let ret = gpio_isr_handler_add(pin, Some(handler), tap_arg(tap));
        if ret != ESP_OK {
            return Err(HwInitError::IsrAddFailed(ret));
        }
        gpio_intr_enable(pin);
    }
    Ok(())
}

/// Install per-pin GPIO ISR service and register interrupt handlers.
/// Call after init_peripherals() and before the event loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handlers only touch
    // the pulse counters and button timestamps.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for (tap, p) in pins::TAP_PINS.iter().enumerate() {
            add_isr(p.flowmeter, gpio_int_type_t_GPIO_INTR_POSEDGE, flow_gpio_isr, tap)?;
            add_isr(p.button, gpio_int_type_t_GPIO_INTR_NEGEDGE, button_gpio_isr, tap)?;
        }
    }
    info!("hw_init: ISR service installed (flow×{0}, button×{0})", NUM_OF_TAPS);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
