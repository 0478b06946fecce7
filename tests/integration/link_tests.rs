//! Connectivity bring-up, heartbeat and hard-reset behaviour seen through
//! the service.

use waterkiosk::app::events::AppEvent;
use waterkiosk::config::KioskConfig;
use waterkiosk::link::LinkState;

use super::mock_hw::{CYCLE_MS, IMEI, Kiosk};

#[test]
fn brings_up_one_phase_per_cycle() {
    let mut k = Kiosk::new(KioskConfig::default());
    let mut seen = vec![k.app.link_state()];
    for _ in 0..3 {
        k.tick();
        seen.push(k.app.link_state());
    }
    assert_eq!(
        seen,
        vec![LinkState::Down, LinkState::ModemUp, LinkState::DataUp, LinkState::Connected]
    );
    assert_eq!(k.app.link().rx_topic(), format!("kiosk/{IMEI}/rx"));

    let changes = k
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::LinkChanged { .. }))
        .count();
    assert_eq!(changes, 3);
}

#[test]
fn heartbeat_loss_demotes_then_reconnects() {
    let mut k = Kiosk::connected();
    let connects = k.modem.connects;

    k.modem.liveness_ok = false;
    k.advance(60_000);
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::DataUp);
    assert_eq!(k.app.link().failures(), 0, "demotion is not a bring-up failure");

    k.modem.liveness_ok = true;
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::Connected);
    assert_eq!(k.modem.connects, connects + 1);
}

#[test]
fn session_that_never_answers_pings_resets_the_modem() {
    let mut k = Kiosk::connected();
    k.modem.liveness_ok = false;
    let connects = k.modem.connects;

    for _ in 0..2 {
        k.advance(60_000);
        k.tick();
        assert_eq!(k.app.link_state(), LinkState::DataUp);
        k.tick();
        assert_eq!(k.app.link_state(), LinkState::Connected);
    }
    assert_eq!(k.modem.connects, connects + 2);

    k.advance(60_000);
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::Resetting);
    k.tick();
    assert_eq!(k.modem.reset_line, vec![true]);
}

#[test]
fn inbound_traffic_counts_as_heartbeat() {
    let mut k = Kiosk::connected();
    k.modem.liveness_ok = false;

    k.advance(50_000);
    k.modem.inbox.push_back("cardtopup_ABC123_5");
    k.tick();

    k.advance(20_000);
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::Connected);
}

#[test]
fn broker_drop_is_detected_next_cycle() {
    let mut k = Kiosk::connected();
    k.modem.session_alive = false;
    k.modem.broker_ok = false;
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::DataUp);
}

#[test]
fn repeated_failures_hard_reset_the_modem() {
    let mut k = Kiosk::new(KioskConfig::default());
    k.modem.responsive = false;

    // Failure 1 at once, then 2 s and 4 s backoff.
    k.tick();
    assert_eq!(k.app.link().failures(), 1);
    k.advance(2_000);
    k.tick();
    assert_eq!(k.app.link().failures(), 2);
    k.advance(1_000);
    k.tick();
    assert_eq!(k.app.link().failures(), 2, "still backing off");
    k.advance(3_000);
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::Resetting);
    assert_eq!(k.app.link().failures(), 0);

    // Reset line asserted, held, released.
    k.tick();
    assert_eq!(k.modem.reset_line, vec![true]);
    k.advance(200);
    k.tick();
    assert_eq!(k.modem.reset_line, vec![true, false]);
    assert_eq!(k.app.link_state(), LinkState::Down);

    k.modem.responsive = true;
    for _ in 0..3 {
        k.tick();
    }
    assert_eq!(k.app.link_state(), LinkState::Connected);
}

#[test]
fn failed_publish_keeps_message_and_retries() {
    let mut k = Kiosk::connected();
    k.modem.publish_ok = false;
    k.keys("A0712345678");
    k.keys("0100");
    k.keys("1");
    k.tick();
    assert_eq!(k.app.link_state(), LinkState::DataUp);
    assert_eq!(k.app.link().outbound_len(), 1);

    k.modem.publish_ok = true;
    k.tick();
    k.tick();
    assert_eq!(k.modem.payloads(), vec!["mpesapay_0712345678_0100_1"]);
    assert_eq!(k.app.link().outbound_len(), 0);
}

#[test]
fn telemetry_is_emitted_on_interval() {
    let mut k = Kiosk::connected();
    k.advance(300_000 - 3 * CYCLE_MS);
    k.tick();
    let telem = k
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(telem.len(), 1);
    assert_eq!(telem[0].imei.as_str(), IMEI);
    assert!(telem[0].to_json().unwrap().contains("\"Connected\""));
}
