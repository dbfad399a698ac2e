//! BigDecimal 按 JSON 数字输出 (bigdecimal 自带的 serde 实现输出字符串)

use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};
use std::str::FromStr;

pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    let text = value.to_string();
    match serde_json::Number::from_str(&text) {
        Ok(number) => number.serialize(serializer),
        Err(_) => serializer.serialize_str(&text),
    }
}

pub fn serialize_opt<S: Serializer>(
    value: &Option<BigDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize(v, serializer),
        None => serializer.serialize_none(),
    }
}
