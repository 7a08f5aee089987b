#![no_main]

use gamewire::utils::crypto::Crypto;
use gamewire::{Buffer, Connection, Dispatcher};
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    // First byte picks plain or encrypted; the rest is split into datagrams on 0xFF
    let Some((&mode, rest)) = data.split_first() else {
        return;
    };

    let mut connection = Connection::new(|_: &Buffer| {}, Dispatcher::new());
    if mode & 1 == 1 {
        if let Ok(crypto) = Crypto::new(&[mode; 32]) {
            connection.enable_encryption(crypto);
        }
    }

    for (tick, datagram) in rest.split(|&b| b == 0xFF).enumerate() {
        let _ = connection.receive_datagram(datagram);
        if connection.update(Duration::from_millis(16), tick as u32) {
            break;
        }
    }
});
