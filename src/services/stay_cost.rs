//! Stay cost and overdue penalty for dormitory tenancies.
//!
//! Every billing surface (room tenant list, overdue list, trainee payment
//! summary, cost quote) derives its figures here. The functions are pure and
//! never fail: a missing date or rate degrades the dependent amounts to zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::schemas::{Invoice, InvoiceStatus, Tenancy, TenancyStatus};

/// Anything that can be reduced to a calendar day. Time of day is dropped, so
/// a checkout "today" at 23:59 is still the same day as the contract end.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for NaiveDateTime {
    fn calendar_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> CalendarDay for DateTime<Tz> {
    fn calendar_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StayPayment {
    pub nights: i64,
    pub amount: Decimal,
}

impl StayPayment {
    pub const ZERO: Self = Self {
        nights: 0,
        amount: Decimal::ZERO,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overdue {
    pub is_overdue: bool,
    pub days: i64,
    pub amount: Decimal,
}

impl Overdue {
    pub const NONE: Self = Self {
        is_overdue: false,
        days: 0,
        amount: Decimal::ZERO,
    };
}

/// Whether an overdue penalty needs the tenancy to be APPROVED first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverduePolicy {
    RequireApproval,
    DateOnly,
}

impl OverduePolicy {
    pub fn from_requires_approval(requires_approval: bool) -> Self {
        if requires_approval {
            Self::RequireApproval
        } else {
            Self::DateOnly
        }
    }

    pub fn requires_approval(self) -> bool {
        matches!(self, Self::RequireApproval)
    }
}

fn normalize_rate(daily_rate: Option<Decimal>) -> Decimal {
    daily_rate
        .filter(|rate| rate.is_sign_positive())
        .unwrap_or(Decimal::ZERO)
}

fn prorate(days: i64, rate: Decimal) -> Decimal {
    Decimal::from(days).checked_mul(rate).unwrap_or_else(|| {
        tracing::warn!(days, %rate, "Stay amount overflowed, reporting zero");
        Decimal::ZERO
    })
}

pub fn compute_stay_payment(
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
    daily_rate: Option<Decimal>,
) -> StayPayment {
    let (Some(from_date), Some(to_date)) = (from_date, to_date) else {
        return StayPayment::ZERO;
    };

    let nights = (to_date - from_date).num_days().abs();
    StayPayment {
        nights,
        amount: prorate(nights, normalize_rate(daily_rate)),
    }
}

pub fn compute_overdue<T>(
    to_date: Option<NaiveDate>,
    daily_rate: Option<Decimal>,
    today: &T,
    tenancy_status: Option<TenancyStatus>,
    requires_approval: bool,
) -> Overdue
where
    T: CalendarDay + ?Sized,
{
    let Some(to_date) = to_date else {
        return Overdue::NONE;
    };
    if requires_approval && tenancy_status != Some(TenancyStatus::Approved) {
        return Overdue::NONE;
    }

    let today = today.calendar_day();
    if today <= to_date {
        return Overdue::NONE;
    }

    let days = (today - to_date).num_days();
    Overdue {
        is_overdue: true,
        days,
        amount: prorate(days, normalize_rate(daily_rate)),
    }
}

pub fn compute_grand_total(stay_amount: Decimal, overdue_amount: Decimal) -> Decimal {
    stay_amount
        .checked_add(overdue_amount)
        .unwrap_or_else(|| {
            tracing::warn!("Grand total overflowed, reporting zero");
            Decimal::ZERO
        })
}

/// Status of the current invoice. The remote API returns the relation as a
/// list; only its first element counts.
pub fn resolve_invoice_status(invoices: &[Invoice]) -> InvoiceStatus {
    invoices
        .first()
        .and_then(|invoice| invoice.status)
        .unwrap_or(InvoiceStatus::Pending)
}

/// All derived figures for one tenancy, as shown on any billing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TenancyBilling {
    pub daily_rate: Decimal,
    pub stay: StayPayment,
    pub overdue: Overdue,
    pub grand_total: Decimal,
    pub invoice_status: InvoiceStatus,
}

impl TenancyBilling {
    pub fn compute<T>(tenancy: &Tenancy, today: &T, policy: OverduePolicy) -> Self
    where
        T: CalendarDay + ?Sized,
    {
        let rate = tenancy.effective_daily_rate();
        let stay = compute_stay_payment(tenancy.from_date, tenancy.to_date, rate);
        let overdue = compute_overdue(
            tenancy.to_date,
            rate,
            today,
            tenancy.status,
            policy.requires_approval(),
        );

        Self {
            daily_rate: normalize_rate(rate),
            stay,
            overdue,
            grand_total: compute_grand_total(stay.amount, overdue.amount),
            invoice_status: resolve_invoice_status(&tenancy.invoices),
        }
    }
}
