//! Fuzz target: `StreamCommand::parse_str`
//!
//! Feeds arbitrary bytes as the JSON body of every known trigger event.
//! Parsing must never panic, and an accepted command must carry a
//! non-zero entity id.
//!
//! cargo fuzz run fuzz_trigger_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use petvitals::StreamCommand;

const EVENTS: [&str; 5] = [
    "subscribe",
    "subscribe_pet",
    "unsubscribe",
    "unsubscribe_pet",
    "live_reading",
];

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    for event in EVENTS {
        if let Some(cmd) = StreamCommand::parse_str(event, body) {
            assert!(cmd.entity().get() > 0, "zero id accepted");
            assert_ne!(event, "live_reading", "outbound event accepted as a trigger");
        }
    }
});
