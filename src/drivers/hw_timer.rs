//! Control tick timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer pushes [`Event::ControlTick`] into the input queue at
//! the configured control loop interval.  On simulation targets the main
//! loop's sleep stands in for it.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event().

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: CONTROL_TIMER is written once in `start_control_timer()` before
/// any callback fires.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn control_timer() -> esp_timer_handle_t {
    unsafe { CONTROL_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

/// Start the periodic control tick.
#[cfg(target_os = "espidf")]
pub fn start_control_timer(interval_ms: u32) {
    // SAFETY: CONTROL_TIMER is written here once at boot from the main task
    // before any timer callbacks fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"control\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut CONTROL_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer create failed (rc={})", ret);
            return;
        }
        let ret = esp_timer_start_periodic(control_timer(), u64::from(interval_ms) * 1_000);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return;
        }
        info!("hw_timer: control tick every {} ms", interval_ms);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_control_timer(_interval_ms: u32) {
    log::info!("hw_timer(sim): timer not started (ticks driven by sleep loop)");
}
