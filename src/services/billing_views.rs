use std::cmp::Reverse;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    schemas::{InvoiceStatus, Tenancy, TenancyStatus},
    services::{
        formatting::{format_display_date, format_nights, format_peso},
        stay_cost::{compute_stay_payment, OverduePolicy, StayPayment, TenancyBilling},
    },
};

/// One row of an admin tenant table.
#[derive(Debug, Clone, Serialize)]
pub struct TenantBillingRow {
    pub tenancy_id: String,
    pub trainee_name: String,
    pub room_name: Option<String>,
    pub status: Option<TenancyStatus>,
    pub invoice_status: InvoiceStatus,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub from_date_display: String,
    pub to_date_display: String,
    pub nights: i64,
    pub nights_display: String,
    pub daily_rate: Decimal,
    pub daily_rate_display: String,
    pub stay_payment: Decimal,
    pub stay_payment_display: String,
    pub is_overdue: bool,
    pub overdue_days: i64,
    pub overdue_amount: Decimal,
    pub overdue_amount_display: String,
    pub grand_total: Decimal,
    pub grand_total_display: String,
}

impl TenantBillingRow {
    fn build(tenancy: &Tenancy, billing: &TenancyBilling) -> Self {
        Self {
            tenancy_id: tenancy.id_string(),
            trainee_name: tenancy.trainee_name(),
            room_name: tenancy.room_name(),
            status: tenancy.status,
            invoice_status: billing.invoice_status,
            from_date: tenancy.from_date,
            to_date: tenancy.to_date,
            from_date_display: format_display_date(tenancy.from_date),
            to_date_display: format_display_date(tenancy.to_date),
            nights: billing.stay.nights,
            nights_display: format_nights(billing.stay.nights),
            daily_rate: billing.daily_rate,
            daily_rate_display: format_peso(billing.daily_rate),
            stay_payment: billing.stay.amount,
            stay_payment_display: format_peso(billing.stay.amount),
            is_overdue: billing.overdue.is_overdue,
            overdue_days: billing.overdue.days,
            overdue_amount: billing.overdue.amount,
            overdue_amount_display: format_peso(billing.overdue.amount),
            grand_total: billing.grand_total,
            grand_total_display: format_peso(billing.grand_total),
        }
    }
}

/// Tenants of one room. Overdue penalties only accrue on APPROVED stays.
pub fn room_tenant_rows(tenancies: &[Tenancy], today: NaiveDate) -> Vec<TenantBillingRow> {
    tenancies
        .iter()
        .map(|tenancy| {
            let billing = TenancyBilling::compute(tenancy, &today, OverduePolicy::RequireApproval);
            TenantBillingRow::build(tenancy, &billing)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueTenantList {
    pub as_of: NaiveDate,
    pub policy: OverduePolicy,
    pub count: usize,
    pub total_outstanding: Decimal,
    pub total_outstanding_display: String,
    pub rows: Vec<TenantBillingRow>,
}

/// Only the overdue tenancies, longest overdue first.
pub fn overdue_tenant_rows(
    tenancies: &[Tenancy],
    today: NaiveDate,
    policy: OverduePolicy,
) -> OverdueTenantList {
    let mut rows = tenancies
        .iter()
        .filter_map(|tenancy| {
            let billing = TenancyBilling::compute(tenancy, &today, policy);
            billing
                .overdue
                .is_overdue
                .then(|| TenantBillingRow::build(tenancy, &billing))
        })
        .collect::<Vec<_>>();

    rows.sort_by_key(|row| (Reverse(row.overdue_days), row.trainee_name.to_lowercase()));

    let total_outstanding = sum_outstanding(rows.iter().map(|row| row.grand_total));

    OverdueTenantList {
        as_of: today,
        policy,
        count: rows.len(),
        total_outstanding,
        total_outstanding_display: format_peso(total_outstanding),
        rows,
    }
}

fn sum_outstanding(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .unwrap_or_else(|| {
            tracing::warn!("Total outstanding overflowed, reporting zero");
            Decimal::ZERO
        })
}

/// The card a trainee sees before paying for a stay.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub as_of: NaiveDate,
    pub tenancy_id: String,
    pub room_name: Option<String>,
    pub building_name: Option<String>,
    pub status: Option<TenancyStatus>,
    pub invoice_status: InvoiceStatus,
    pub from_date_display: String,
    pub to_date_display: String,
    pub nights: i64,
    pub daily_rate: Decimal,
    pub daily_rate_display: String,
    pub stay_payment: Decimal,
    pub stay_payment_display: String,
    pub is_overdue: bool,
    pub overdue_days: i64,
    pub overdue_amount: Decimal,
    pub overdue_amount_display: String,
    pub grand_total: Decimal,
    pub grand_total_display: String,
}

pub fn payment_summary(tenancy: &Tenancy, today: NaiveDate) -> PaymentSummary {
    let billing = TenancyBilling::compute(tenancy, &today, OverduePolicy::RequireApproval);
    PaymentSummary {
        as_of: today,
        tenancy_id: tenancy.id_string(),
        room_name: tenancy.room_name(),
        building_name: tenancy
            .room
            .as_ref()
            .and_then(|room| room.building.as_ref())
            .and_then(|building| building.name.clone()),
        status: tenancy.status,
        invoice_status: billing.invoice_status,
        from_date_display: format_display_date(tenancy.from_date),
        to_date_display: format_display_date(tenancy.to_date),
        nights: billing.stay.nights,
        daily_rate: billing.daily_rate,
        daily_rate_display: format_peso(billing.daily_rate),
        stay_payment: billing.stay.amount,
        stay_payment_display: format_peso(billing.stay.amount),
        is_overdue: billing.overdue.is_overdue,
        overdue_days: billing.overdue.days,
        overdue_amount: billing.overdue.amount,
        overdue_amount_display: format_peso(billing.overdue.amount),
        grand_total: billing.grand_total,
        grand_total_display: format_peso(billing.grand_total),
    }
}

/// Picks the requested tenancy, else the one ending last.
pub fn select_tenancy<'a>(tenancies: &'a [Tenancy], tenancy_id: Option<&str>) -> Option<&'a Tenancy> {
    match tenancy_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => tenancies.iter().find(|tenancy| tenancy.id_string() == id),
        None => tenancies.iter().max_by_key(|tenancy| tenancy.to_date),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StayQuote {
    pub nights: i64,
    pub nights_display: String,
    pub amount: Decimal,
    pub amount_display: String,
}

pub fn quote(
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
    daily_rate: Option<Decimal>,
) -> StayQuote {
    let StayPayment { nights, amount } = compute_stay_payment(from_date, to_date, daily_rate);
    StayQuote {
        nights,
        nights_display: format_nights(nights),
        amount,
        amount_display: format_peso(amount),
    }
}
