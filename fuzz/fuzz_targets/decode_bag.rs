#![no_main]

use libfuzzer_sys::fuzz_target;
use ymut::harness::Verifier;
use ymut_core::abi;

fuzz_target!(|data: &[u8]| {
    // Payloads come straight from component memory; decoding must never panic
    if let Ok(bag) = abi::decode_bag(data) {
        let mut verifier = Verifier::new("Fuzz", Ok(&bag));
        for key in bag.keys() {
            verifier.assert_key_true(key, None);
        }
        let _ = verifier.finish();
    }
    let _ = abi::decode_names(data);
    let _ = abi::decode_message(data);
});
