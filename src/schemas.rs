use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input.validate().map_err(AppError::Validation)
}

// ---------- Statuses ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenancyStatus {
    Pending,
    Approved,
    Terminated,
    Cancelled,
}

impl FromStr for TenancyStatus {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "TERMINATED" => Ok(Self::Terminated),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Cancelled,
    Terminated,
}

impl FromStr for InvoiceStatus {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" => Ok(Self::Paid),
            "PENDING" => Ok(Self::Pending),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            "TERMINATED" => Ok(Self::Terminated),
            _ => Err(()),
        }
    }
}

// ---------- Remote records ----------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(
        default,
        alias = "invoice_status",
        deserialize_with = "lenient_enum"
    )]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Building {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "building_name", deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Room {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "room_name", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(
        default,
        alias = "dailyRate",
        alias = "room_cost",
        deserialize_with = "lenient_decimal"
    )]
    pub daily_rate: Option<Decimal>,
    #[serde(default)]
    pub building: Option<Building>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TraineeRef {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "fullName", deserialize_with = "lenient_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// A trainee's stay in a dormitory room as returned by the remote API.
///
/// Every field decodes leniently: a malformed value becomes `None` instead of
/// failing the whole list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Tenancy {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "fromDate", deserialize_with = "lenient_date")]
    pub from_date: Option<NaiveDate>,
    #[serde(default, alias = "toDate", deserialize_with = "lenient_date")]
    pub to_date: Option<NaiveDate>,
    #[serde(default, alias = "dailyRate", deserialize_with = "lenient_decimal")]
    pub daily_rate: Option<Decimal>,
    #[serde(default, alias = "tenant_status", deserialize_with = "lenient_enum")]
    pub status: Option<TenancyStatus>,
    #[serde(default, alias = "invoice", deserialize_with = "one_or_many")]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub room: Option<Room>,
    #[serde(default, alias = "user")]
    pub trainee: Option<TraineeRef>,
}

impl Tenancy {
    /// Room cost per day: the tenancy's own rate, else the room's.
    pub fn effective_daily_rate(&self) -> Option<Decimal> {
        self.daily_rate
            .or_else(|| self.room.as_ref().and_then(|room| room.daily_rate))
    }

    pub fn trainee_name(&self) -> String {
        self.trainee
            .as_ref()
            .and_then(|trainee| trainee.full_name.clone().or_else(|| trainee.name.clone()))
            .unwrap_or_default()
    }

    pub fn room_name(&self) -> Option<String> {
        self.room.as_ref().and_then(|room| room.name.clone())
    }

    pub fn id_string(&self) -> String {
        value_to_id(self.id.as_ref())
    }
}

pub fn value_to_id(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

/// Accepts a bare array or a `{ "data": [...] }` envelope.
pub fn unwrap_list(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(Value::Object(inner)) => unwrap_list(Value::Object(inner)),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub fn decode_tenancies(payload: Value) -> Vec<Tenancy> {
    unwrap_list(payload)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Tenancy>(item) {
            Ok(tenancy) => Some(tenancy),
            Err(error) => {
                tracing::warn!(error = %error, "Skipping undecodable tenancy record");
                None
            }
        })
        .collect()
}

// ---------- Lenient decoders ----------

pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }
    // "2025-01-11 08:30:00" and "2025-01-11T08:30:00" without an offset.
    text.get(..10)
        .filter(|_| text.len() > 10 && matches!(text.as_bytes()[10], b' ' | b'T'))
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_calendar_day))
}

pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Some(Decimal::from(integer));
            }
            Decimal::from_str(&number.to_string())
                .ok()
                .or_else(|| number.as_f64().and_then(|float| Decimal::try_from(float).ok()))
        }
        Value::String(text) => Decimal::from_str(text.trim().replace(',', "").as_str()).ok(),
        _ => None,
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|text| text.parse::<T>().ok()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Invoice>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(object @ Value::Object(_)) => vec![object],
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Invoice>(item).ok())
        .collect())
}

// ---------- Inputs ----------

fn default_false() -> bool {
    false
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomPath {
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationStepPath {
    pub step: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AsOfQuery {
    pub as_of: Option<String>,
}

impl AsOfQuery {
    pub fn pinned_day(&self) -> Result<Option<NaiveDate>, AppError> {
        match self.as_of.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| AppError::BadRequest("as_of must be YYYY-MM-DD.".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentSummaryQuery {
    pub tenancy_id: Option<String>,
    pub as_of: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteInput {
    #[serde(default, alias = "fromDate", deserialize_with = "lenient_date")]
    pub from_date: Option<NaiveDate>,
    #[serde(default, alias = "toDate", deserialize_with = "lenient_date")]
    pub to_date: Option<NaiveDate>,
    #[serde(default, alias = "dailyRate", deserialize_with = "lenient_decimal")]
    pub daily_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
    #[serde(default = "default_false")]
    pub remember: bool,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::{
        decode_tenancies, parse_calendar_day, unwrap_list, AsOfQuery, InvoiceStatus, Tenancy,
        TenancyStatus,
    };

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_dates_and_timestamps_to_calendar_days() {
        assert_eq!(parse_calendar_day("2025-01-11"), Some(day(2025, 1, 11)));
        assert_eq!(
            parse_calendar_day("2025-01-11T23:59:00+08:00"),
            Some(day(2025, 1, 11))
        );
        assert_eq!(
            parse_calendar_day("2025-01-11 08:30:00"),
            Some(day(2025, 1, 11))
        );
        assert_eq!(parse_calendar_day("11/01/2025"), None);
        assert_eq!(parse_calendar_day(""), None);
    }

    #[test]
    fn decodes_snake_case_remote_record() {
        let tenancy: Tenancy = serde_json::from_value(json!({
            "id": 42,
            "from_date": "2025-01-01",
            "to_date": "2025-01-11T00:00:00.000000Z",
            "tenant_status": "approved",
            "room": { "id": 7, "room_name": "B-204", "room_cost": "1000.00" },
            "invoice": { "status": "PAID" },
            "user": { "full_name": "Juan Dela Cruz" }
        }))
        .expect("decodes");

        assert_eq!(tenancy.id_string(), "42");
        assert_eq!(tenancy.from_date, Some(day(2025, 1, 1)));
        assert_eq!(tenancy.to_date, Some(day(2025, 1, 11)));
        assert_eq!(tenancy.status, Some(TenancyStatus::Approved));
        assert_eq!(tenancy.effective_daily_rate(), Some(dec!(1000.00)));
        assert_eq!(tenancy.invoices.len(), 1);
        assert_eq!(tenancy.invoices[0].status, Some(InvoiceStatus::Paid));
        assert_eq!(tenancy.trainee_name(), "Juan Dela Cruz");
        assert_eq!(tenancy.room_name().as_deref(), Some("B-204"));
    }

    #[test]
    fn decodes_camel_case_record_from_the_browser_shape() {
        let tenancy: Tenancy = serde_json::from_value(json!({
            "fromDate": "2025-01-01",
            "toDate": null,
            "dailyRate": 500,
            "status": "PENDING",
            "invoices": []
        }))
        .expect("decodes");

        assert_eq!(tenancy.to_date, None);
        assert_eq!(tenancy.daily_rate, Some(dec!(500)));
        assert_eq!(tenancy.status, Some(TenancyStatus::Pending));
        assert!(tenancy.invoices.is_empty());
    }

    #[test]
    fn malformed_fields_become_absent() {
        let tenancy: Tenancy = serde_json::from_value(json!({
            "from_date": "someday",
            "to_date": 20250111,
            "daily_rate": "n/a",
            "status": "ARCHIVED",
            "invoices": "none"
        }))
        .expect("decodes");

        assert_eq!(tenancy.from_date, None);
        assert_eq!(tenancy.to_date, None);
        assert_eq!(tenancy.daily_rate, None);
        assert_eq!(tenancy.status, None);
        assert!(tenancy.invoices.is_empty());
    }

    #[test]
    fn tenancy_rate_wins_over_room_rate() {
        let tenancy: Tenancy = serde_json::from_value(json!({
            "daily_rate": "750.50",
            "room": { "room_cost": 1000 }
        }))
        .expect("decodes");
        assert_eq!(tenancy.effective_daily_rate(), Some(dec!(750.50)));
    }

    #[test]
    fn unwraps_list_envelopes() {
        assert_eq!(unwrap_list(json!([1, 2])).len(), 2);
        assert_eq!(unwrap_list(json!({ "data": [1, 2, 3] })).len(), 3);
        assert_eq!(unwrap_list(json!({ "data": { "data": [1] } })).len(), 1);
        assert!(unwrap_list(json!({ "message": "ok" })).is_empty());
        assert!(unwrap_list(json!(null)).is_empty());
    }

    #[test]
    fn skips_non_object_rows() {
        let rows = decode_tenancies(json!({ "data": [{ "id": 1 }, "garbage", { "id": 2 }] }));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn as_of_rejects_bad_dates() {
        let pinned = AsOfQuery {
            as_of: Some("2025-01-14".to_string()),
        };
        assert_eq!(pinned.pinned_day().expect("ok"), Some(day(2025, 1, 14)));

        let empty = AsOfQuery { as_of: None };
        assert_eq!(empty.pinned_day().expect("ok"), None);

        let bad = AsOfQuery {
            as_of: Some("Jan 14".to_string()),
        };
        assert!(bad.pinned_day().is_err());
    }
}
