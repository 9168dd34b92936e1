//! Business report views built on top of the ledger collections.

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Driver, DriverId, RegistrationNumber, SettlementRecord, SettlementStatus, Vehicle,
    VehicleStatus,
};
use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverBillingEntry {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub cycles: usize,
    pub revenue: Money,
    pub deductions: Money,
    pub net_payable: Money,
    pub pending: Money,
}

/// Per-driver revenue and deductions, drivers in input order.
///
/// Settlements that reference an unknown driver are ignored.
pub fn driver_billing(
    drivers: &[Driver],
    settlements: &[SettlementRecord],
) -> Vec<DriverBillingEntry> {
    drivers
        .iter()
        .map(|driver| {
            let mut entry = DriverBillingEntry {
                driver_id: driver.id.clone(),
                driver_name: driver.name.clone(),
                cycles: 0,
                revenue: Money::ZERO,
                deductions: Money::ZERO,
                net_payable: Money::ZERO,
                pending: Money::ZERO,
            };

            for settlement in settlements.iter().filter(|s| s.driver_id == driver.id) {
                entry.cycles += 1;
                entry.revenue += settlement.gross_earnings;
                entry.deductions += settlement.total_deductions();
                entry.net_payable += settlement.net_payable;
                if settlement.status == SettlementStatus::Pending {
                    entry.pending += settlement.net_payable;
                }
            }

            entry
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtilizationEntry {
    pub status: VehicleStatus,
    pub status_label: &'static str,
    pub vehicles: usize,
}

/// Vehicle counts per status, always listing every status.
pub fn utilization(vehicles: &[Vehicle]) -> Vec<UtilizationEntry> {
    VehicleStatus::ordered()
        .into_iter()
        .map(|status| UtilizationEntry {
            status,
            status_label: status.label(),
            vehicles: vehicles.iter().filter(|v| v.status == status).count(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceDocument {
    Insurance,
    PollutionCertificate,
}

impl ComplianceDocument {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insurance => "Insurance Renewal",
            Self::PollutionCertificate => "PUC Renewal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceSeverity {
    DueSoon,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceAlert {
    pub registration: RegistrationNumber,
    pub document: ComplianceDocument,
    pub document_label: &'static str,
    pub expires_on: NaiveDate,
    pub days_remaining: i64,
    pub severity: ComplianceSeverity,
}

/// Insurance and PUC expiries that are past or fall within `horizon_days` of `today`.
///
/// Expired documents sort first, then by expiry date.
pub fn compliance_alerts(
    vehicles: &[Vehicle],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<ComplianceAlert> {
    let mut alerts: Vec<ComplianceAlert> = vehicles
        .iter()
        .flat_map(|vehicle| {
            [
                (ComplianceDocument::Insurance, vehicle.insurance_end),
                (ComplianceDocument::PollutionCertificate, vehicle.puc_expiry),
            ]
            .into_iter()
            .filter_map(move |(document, expiry)| {
                let expires_on = expiry?;
                let days_remaining = (expires_on - today).num_days();
                let severity = if days_remaining < 0 {
                    ComplianceSeverity::Expired
                } else if days_remaining <= horizon_days {
                    ComplianceSeverity::DueSoon
                } else {
                    return None;
                };
                Some(ComplianceAlert {
                    registration: vehicle.registration.clone(),
                    document,
                    document_label: document.label(),
                    expires_on,
                    days_remaining,
                    severity,
                })
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.expires_on.cmp(&b.expires_on))
    });
    alerts
}
