#![no_main]

use libfuzzer_sys::fuzz_target;
use mmdbforge::Reader;

fuzz_target!(|data: &[u8]| {
    if let Ok(reader) = Reader::from_bytes(data.to_vec()) {
        for address in ["1.2.3.4", "::1", "2001:db8::1"] {
            let _ = reader.lookup(address.parse().unwrap());
        }
    }
});
