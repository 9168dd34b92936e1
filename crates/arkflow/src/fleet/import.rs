//! Weekly platform earnings CSV import.

use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::money::Money;

/// One row of a platform earnings export: driver name, gross earnings, commission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EarningsRow {
    #[serde(alias = "Driver", alias = "driver", alias = "Driver Name", alias = "driverName")]
    pub driver_name: String,
    #[serde(alias = "Earnings", alias = "earnings", deserialize_with = "lenient_money")]
    pub earnings: Money,
    #[serde(
        alias = "Commission",
        alias = "commission",
        default,
        deserialize_with = "lenient_money"
    )]
    pub commission: Money,
}

pub fn parse_earnings_csv<R: Read>(reader: R) -> Result<Vec<EarningsRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<EarningsRow>() {
        let row = record?;
        if row.driver_name.is_empty() {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Currency markers platform exports put in front of amounts, longest first.
const CURRENCY_PREFIXES: [&str; 4] = ["INR", "Rs.", "Rs", "₹"];

/// Accepts `15000`, `15,000.50`, `₹15000`, `Rs. 15000` and `INR 15000`; blank cells read
/// as zero. Anything else is an error rather than a guess.
fn lenient_money<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_amount(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid amount '{raw}'")))
}

fn parse_amount(raw: &str) -> Option<Money> {
    let mut text = raw.trim();
    if text.is_empty() {
        return Some(Money::ZERO);
    }
    for prefix in CURRENCY_PREFIXES {
        let matches = text
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            text = text[prefix.len()..].trim_start();
            break;
        }
    }

    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let digits = cleaned.strip_prefix('-').unwrap_or(cleaned.as_str());
    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1;
    if !well_formed {
        return None;
    }
    cleaned.parse::<rust_decimal::Decimal>().ok().map(Money::new)
}
