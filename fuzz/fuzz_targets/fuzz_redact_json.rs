//! Fuzz target for recursive redaction.
//!
//! Any JSON document must redact without panicking and keep its shape.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lh_redact::Redactor;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let redactor = Redactor::with_builtin_patterns().expect("built-in patterns compile");
    let once = redactor.redact(&value);

    if let (Some(before), Some(after)) = (value.as_array(), once.as_array()) {
        assert_eq!(before.len(), after.len());
    }
    if let (Some(before), Some(after)) = (value.as_object(), once.as_object()) {
        assert!(before.keys().eq(after.keys()));
    }
});
