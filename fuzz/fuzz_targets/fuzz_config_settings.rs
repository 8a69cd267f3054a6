//! Fuzz target for settings parsing.
//!
//! Parsing and validation must return errors, never panic, for any input
//! in any supported format.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lh_config::{Configuration, FileFormat, Settings};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for format in [FileFormat::Json, FileFormat::Toml, FileFormat::Yaml] {
        if let Ok(settings) = Settings::parse(text, format) {
            let _ = settings.validate();
            let _ = Configuration::new(settings);
        }
    }
});
