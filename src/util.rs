use byte_unit::{Byte, UnitType};

use crate::error::KeyValError;

pub trait IntoAdjustedByte {
    fn adjusted(self) -> byte_unit::AdjustedByte;
}

impl IntoAdjustedByte for u64 {
    fn adjusted(self) -> byte_unit::AdjustedByte {
        Byte::from_u64(self).get_appropriate_unit(UnitType::Decimal)
    }
}

/// Split `input` on `pair_delim` into pairs, then each pair on `kv_delim`
/// into a key and a value, trimming whitespace around both.
///
/// `parse_key_val("key1: val2, key3 : val4,key5:val6", ",", ":")` yields
/// `[("key1", "val2"), ("key3", "val4"), ("key5", "val6")]`. Pair order is
/// preserved and duplicate keys are kept.
pub fn parse_key_val(
    input: &str,
    pair_delim: &str,
    kv_delim: &str,
) -> Result<Vec<(String, String)>, KeyValError> {
    if pair_delim == kv_delim {
        return Err(KeyValError::EqualDelimiters);
    }
    let mut pairs = Vec::new();
    for pair in input.split(pair_delim) {
        let (key, val) = pair
            .split_once(kv_delim)
            .ok_or_else(|| KeyValError::Malformed(pair.to_string()))?;
        let (key, val) = (key.trim(), val.trim());
        if key.is_empty() || val.is_empty() {
            return Err(KeyValError::EmptyKeyOrVal(pair.to_string()));
        }
        pairs.push((key.to_string(), val.to_string()));
    }
    Ok(pairs)
}
