//! Shared helpers for the `LiveStage` API
//!
//! Console logging for the JS-facing layer, serde-wasm-bindgen conversions
//! that log what went wrong, and argument checks.

use wasm_bindgen::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

// ============================================================================
// Console
// ============================================================================

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = info)]
    fn console_info(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(s: &str);
}

/// Console method a stage message goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    fn prefix(self) -> &'static str {
        match self {
            ConsoleLevel::Info => "[LiveStage]",
            ConsoleLevel::Warn => "[LiveStage] ⚠️",
            ConsoleLevel::Error => "[LiveStage] ❌",
        }
    }
}

/// Write one prefixed line to the browser console
pub fn console(level: ConsoleLevel, msg: &str) {
    let line = format!("{} {}", level.prefix(), msg);
    match level {
        ConsoleLevel::Info => console_info(&line),
        ConsoleLevel::Warn => console_warn(&line),
        ConsoleLevel::Error => console_error(&line),
    }
}

#[macro_export]
macro_rules! wasm_info {
    ($($arg:tt)*) => {
        $crate::api::helpers::console($crate::api::helpers::ConsoleLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! wasm_warn {
    ($($arg:tt)*) => {
        $crate::api::helpers::console($crate::api::helpers::ConsoleLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! wasm_error {
    ($($arg:tt)*) => {
        $crate::api::helpers::console($crate::api::helpers::ConsoleLevel::Error, &format!($($arg)*))
    };
}

// ============================================================================
// JS value conversion
// ============================================================================

/// Deserialize a JS argument; the error names `what` was being read
pub fn deserialize<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| validation_error(format!("{}: {}", what, e)))
}

/// Like `deserialize`, with `T::default()` for `undefined`/`null`
pub fn deserialize_or_default<T: DeserializeOwned + Default>(value: JsValue, what: &str) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    deserialize(value, what)
}

pub fn serialize<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| validation_error(format!("{}: {}", what, e)))
}

// ============================================================================
// Argument checks
// ============================================================================

/// Reject NaN and infinite playback times
pub fn validate_time(time: f64, what: &str) -> Result<(), String> {
    if !time.is_finite() {
        return Err(format!("{} must be a finite time, got {}", what, time));
    }
    Ok(())
}

/// Log `msg` as an error and turn it into the value thrown to JS
pub fn validation_error(msg: impl Into<String>) -> JsValue {
    let msg = msg.into();
    console(ConsoleLevel::Error, &msg);
    JsValue::from_str(&msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_prefixes() {
        assert_eq!(ConsoleLevel::Info.prefix(), "[LiveStage]");
        assert!(ConsoleLevel::Warn.prefix().starts_with("[LiveStage]"));
        assert!(ConsoleLevel::Error.prefix().starts_with("[LiveStage]"));
        assert_ne!(ConsoleLevel::Warn.prefix(), ConsoleLevel::Error.prefix());
    }

    #[test]
    fn test_validate_time() {
        assert!(validate_time(0.0, "seek time").is_ok());
        assert!(validate_time(-250.0, "seek time").is_ok());
        let err = validate_time(f64::NAN, "seek time").unwrap_err();
        assert!(err.starts_with("seek time must be a finite time"));
        assert!(validate_time(f64::INFINITY, "seek time").is_err());
    }
}
