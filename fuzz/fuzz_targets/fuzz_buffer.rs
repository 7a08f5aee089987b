#![no_main]

use gamewire::{Buffer, SymbolTable};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Every reader must fail cleanly on arbitrary bytes
    let mut buffer = Buffer::new();
    if buffer.load(data).is_err() {
        return;
    }

    let mut symbols = SymbolTable::new();
    while buffer.has_data() {
        let before = buffer.position();
        let _ = buffer.get_symbol(&mut symbols);
        let _ = buffer.get_string();
        let _ = buffer.get_blob();
        let _ = buffer.get_position();
        let _ = buffer.get_u16_array();
        if buffer.position() == before {
            break;
        }
    }
});
