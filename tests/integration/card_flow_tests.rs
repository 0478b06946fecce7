//! RFID card credit: top-up from the broker, dispense on tag scan.

use heapless::String;
use waterkiosk::app::commands::KioskCommand;
use waterkiosk::app::events::AppEvent;
use waterkiosk::error::{Error, TransactionError};
use waterkiosk::tap::TapPhase;

use super::mock_hw::Kiosk;

fn scan(k: &mut Kiosk, tag: &str) {
    let mut id = String::new();
    id.push_str(tag).unwrap();
    let now = k.now;
    k.app
        .handle_command(KioskCommand::TagScanned(id), now, &mut k.hw, &mut k.sink)
        .unwrap();
}

#[test]
fn topped_up_card_dispenses_on_first_idle_tap() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("cardtopup_A1B2C3_50");
    k.tick();
    assert_eq!(k.app.coordinator().ledger().balance("A1B2C3"), 50);

    scan(&mut k, "A1B2C3");
    assert_eq!(k.app.taps().phase(0), Ok(TapPhase::PendingOpen));
    assert_eq!(k.app.taps().status(0).unwrap().target_pulses, 200);
    assert_eq!(k.app.coordinator().ledger().balance("A1B2C3"), 30);

    k.tick();
    assert!(k.hw.valve_open(0));
    assert_eq!(k.modem.payloads(), vec!["cardpay_A1B2C3_20_1"]);

    // Second scan goes to the next idle tap.
    scan(&mut k, "A1B2C3");
    assert_eq!(k.app.taps().phase(1), Ok(TapPhase::PendingOpen));

    // Remaining 10 units are less than a full card dispense.
    scan(&mut k, "A1B2C3");
    assert_eq!(k.app.taps().status(2).unwrap().target_pulses, 100);
    assert_eq!(k.app.coordinator().ledger().balance("A1B2C3"), 0);
}

#[test]
fn unknown_card_is_refused() {
    let mut k = Kiosk::connected();
    scan(&mut k, "FFFF");
    assert!(k.app.taps().all_idle());
    assert!(k.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::TransactionRejected(Error::Transaction(TransactionError::NoCredit))
    )));
}

#[test]
fn card_refused_when_every_tap_is_busy() {
    let mut k = Kiosk::connected();
    k.modem.inbox.extend([
        "remotedispense_1_1",
        "remotedispense_2_1",
        "remotedispense_3_1",
        "remotedispense_4_1",
    ]);
    k.modem.inbox.push_back("cardtopup_CAFE_5");
    k.tick();

    scan(&mut k, "CAFE");
    assert!(k.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::TransactionRejected(Error::Transaction(TransactionError::NoIdleTap))
    )));
    assert_eq!(k.app.coordinator().ledger().balance("CAFE"), 5, "no debit without dispense");
}
