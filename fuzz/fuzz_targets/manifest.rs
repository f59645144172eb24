#![no_main]

use libfuzzer_sys::fuzz_target;
use ymut::harness::SuiteManifest;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(manifest) = SuiteManifest::from_json(s) {
            let _ = manifest.validate();
            let _ = manifest.config().library_file_name();
        }
    }
});
