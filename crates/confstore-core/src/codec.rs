//! Value codec for the `val` column
//!
//! Values are stored as JSON text. Reads never fail: text that is not valid
//! JSON (hand-edited rows, legacy formats) is handed back verbatim as a
//! string value.

use crate::error::{ConfigError, Result};
use crate::value::ConfigValue;

/// Deepest list/map nesting that `serde_json` will parse back
pub const MAX_NESTING: usize = 127;

/// Encode a value for storage.
///
/// Values nested deeper than [`MAX_NESTING`] are rejected: their text would
/// only decode as a raw string.
pub fn encode(value: &ConfigValue) -> Result<String> {
    let depth = nesting_depth(value);
    if depth > MAX_NESTING {
        return Err(ConfigError::NestingTooDeep {
            depth,
            limit: MAX_NESTING,
        });
    }
    Ok(serde_json::to_string(value)?)
}

/// Container nesting of `value`; scalars are 0. Iterative so arbitrarily
/// deep values cannot overflow the stack here.
pub fn nesting_depth(value: &ConfigValue) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0usize)];
    while let Some((value, depth)) = pending.pop() {
        match value {
            ConfigValue::List(items) => {
                deepest = deepest.max(depth + 1);
                pending.extend(items.iter().map(|v| (v, depth + 1)));
            }
            ConfigValue::Map(map) => {
                deepest = deepest.max(depth + 1);
                pending.extend(map.values().map(|v| (v, depth + 1)));
            }
            _ => {}
        }
    }
    deepest
}

/// Strict decode, failing on anything that is not JSON
pub fn decode(text: &str) -> Result<ConfigValue> {
    Ok(serde_json::from_str(text)?)
}

/// Decode, degrading to the raw text when it is not JSON
pub fn decode_lossy(text: &str) -> ConfigValue {
    match decode(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Stored value is not JSON, keeping raw text: {}", e);
            ConfigValue::String(text.to_string())
        }
    }
}
