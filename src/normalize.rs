//! Turns raw `/coins/markets` records into `AssetSnapshotRow`s.
//!
//! Numeric fields are coerced leniently: numbers pass through, numeric strings are
//! parsed, and anything else (null, garbage text, NaN, objects) becomes 0. Rows whose
//! market cap ends up non-positive are dropped; missing price-change data alone never
//! drops a row.

use crate::models::AssetSnapshotRow;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use tracing::debug;

// --- Raw records & lenient deserialization ---

/// Upstream asset record. The aliases let already-normalized rows (short keys)
/// be read back in, which keeps normalization idempotent.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawAssetRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub total_volume: Option<f64>,
    #[serde(
        default,
        rename = "price_change_percentage_1h_in_currency",
        alias = "%1h",
        deserialize_with = "deserialize_f64_lenient"
    )]
    pub pct_change_1h: Option<f64>,
    #[serde(
        default,
        rename = "price_change_percentage_24h_in_currency",
        alias = "%24h",
        deserialize_with = "deserialize_f64_lenient"
    )]
    pub pct_change_24h: Option<f64>,
    #[serde(
        default,
        rename = "price_change_percentage_7d_in_currency",
        alias = "%7d",
        deserialize_with = "deserialize_f64_lenient"
    )]
    pub pct_change_7d: Option<f64>,
}

struct LenientF64Visitor;

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value, ideally a number or a numeric string")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(finite(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v.trim().parse::<f64>().ok().and_then(finite))
    }

    fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientF64Visitor)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64Visitor)
}

// --- Normalization ---

impl RawAssetRecord {
    fn into_row(self) -> AssetSnapshotRow {
        AssetSnapshotRow {
            symbol: self.symbol.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            current_price: self.current_price.unwrap_or(0.0),
            market_cap: self.market_cap.unwrap_or(0.0),
            total_volume: self.total_volume.unwrap_or(0.0),
            pct_change_1h: self.pct_change_1h.unwrap_or(0.0),
            pct_change_24h: self.pct_change_24h.unwrap_or(0.0),
            pct_change_7d: self.pct_change_7d.unwrap_or(0.0),
        }
    }
}

/// Coerces every numeric field and keeps only rows with `market_cap > 0`, in input order.
pub fn normalize(records: Vec<RawAssetRecord>) -> Vec<AssetSnapshotRow> {
    let total = records.len();
    let rows: Vec<AssetSnapshotRow> = records
        .into_iter()
        .map(RawAssetRecord::into_row)
        .filter(|row| row.market_cap > 0.0)
        .collect();

    if rows.len() < total {
        debug!("dropped {} of {} rows with non-positive market cap", total - rows.len(), total);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn parse(value: Value) -> Vec<RawAssetRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn drops_zero_market_cap_and_keeps_positive() {
        let raw = parse(json!([
            { "market_cap": 0, "symbol": "XXX", "price_change_percentage_24h_in_currency": null },
            { "market_cap": 100, "symbol": "YYY", "price_change_percentage_24h_in_currency": 5.2 }
        ]));

        let rows = normalize(raw);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "YYY");
        assert_eq!(rows[0].pct_change_24h, 5.2);
    }

    #[test]
    fn missing_price_changes_are_zero_not_disqualifying() {
        let raw = parse(json!([{ "symbol": "btc", "name": "Bitcoin", "market_cap": 1.0e12 }]));

        let rows = normalize(raw);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pct_change_1h, 0.0);
        assert_eq!(rows[0].pct_change_24h, 0.0);
        assert_eq!(rows[0].pct_change_7d, 0.0);
    }

    #[test]
    fn garbage_values_coerce_to_zero() {
        let raw = parse(json!([{
            "symbol": "eth",
            "market_cap": "4.5e11",
            "current_price": "n/a",
            "total_volume": { "nested": true },
            "price_change_percentage_1h_in_currency": [1, 2],
            "price_change_percentage_24h_in_currency": " -3.5 ",
            "price_change_percentage_7d_in_currency": true
        }]));

        let rows = normalize(raw);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.market_cap, 4.5e11);
        assert_eq!(row.current_price, 0.0);
        assert_eq!(row.total_volume, 0.0);
        assert_eq!(row.pct_change_1h, 0.0);
        assert_eq!(row.pct_change_24h, -3.5);
        assert_eq!(row.pct_change_7d, 0.0);
    }

    #[test]
    fn non_numeric_and_negative_market_caps_are_dropped() {
        let raw = parse(json!([
            { "symbol": "a", "market_cap": "unknown" },
            { "symbol": "b", "market_cap": -5 },
            { "symbol": "c", "market_cap": "NaN" },
            { "symbol": "d" },
            { "symbol": "e", "market_cap": 1 }
        ]));

        let symbols: Vec<String> = normalize(raw).into_iter().map(|r| r.symbol).collect();

        assert_eq!(symbols, vec!["e"]);
    }

    #[test]
    fn normalizing_normalized_output_is_idempotent() {
        let raw = parse(json!([
            { "symbol": "btc", "name": "Bitcoin", "current_price": 67000.1, "market_cap": 1.3e12,
              "total_volume": 2.0e10, "price_change_percentage_1h_in_currency": 0.1,
              "price_change_percentage_24h_in_currency": -1.2, "price_change_percentage_7d_in_currency": 4.0 },
            { "symbol": "dead", "market_cap": 0 }
        ]));
        let once = normalize(raw);

        let round_trip: Vec<RawAssetRecord> =
            serde_json::from_value(serde_json::to_value(&once).unwrap()).unwrap();
        let twice = normalize(round_trip);

        assert_eq!(once, twice);
    }

    fn any_json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1.0e12f64..1.0e12).prop_map(|v| json!(v)),
            any::<i64>().prop_map(|v| json!(v)),
            "[a-z0-9.\\-]{0,8}".prop_map(Value::String),
        ]
    }

    proptest! {
        #[test]
        fn normalized_rows_satisfy_invariants(
            fields in prop::collection::vec(
                (any_json_scalar(), any_json_scalar(), any_json_scalar(), any_json_scalar()),
                0..40,
            )
        ) {
            let raw: Vec<Value> = fields
                .into_iter()
                .map(|(cap, h1, h24, d7)| json!({
                    "symbol": "s",
                    "market_cap": cap,
                    "price_change_percentage_1h_in_currency": h1,
                    "price_change_percentage_24h_in_currency": h24,
                    "price_change_percentage_7d_in_currency": d7,
                }))
                .collect();

            let rows = normalize(parse(Value::Array(raw)));

            for row in &rows {
                prop_assert!(row.market_cap > 0.0);
                prop_assert!(row.market_cap.is_finite());
                prop_assert!(row.pct_change_1h.is_finite());
                prop_assert!(row.pct_change_24h.is_finite());
                prop_assert!(row.pct_change_7d.is_finite());
            }
        }
    }
}
