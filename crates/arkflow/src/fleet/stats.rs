use serde::Serialize;

use super::domain::{
    Driver, DriverStatus, SettlementRecord, SettlementStatus, Vehicle, VehicleStatus,
};
use super::money::Money;

/// Dashboard headline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    pub total_drivers: usize,
    pub active_drivers: usize,
    /// Sum of gross earnings across settlements.
    pub total_revenue: Money,
    /// Sum of every deduction component across settlements.
    pub total_expenses: Money,
    pub total_net_payable: Money,
    /// Sum of accumulated maintenance cost across vehicles.
    pub total_maintenance: Money,
    pub active_vehicles: usize,
    pub pending_settlements: usize,
}

/// Fold the three collections into dashboard totals. Empty input yields all zeros.
pub fn compute_stats(
    drivers: &[Driver],
    vehicles: &[Vehicle],
    settlements: &[SettlementRecord],
) -> FleetStats {
    let mut stats = FleetStats {
        total_drivers: drivers.len(),
        active_drivers: drivers
            .iter()
            .filter(|driver| driver.status == DriverStatus::Active)
            .count(),
        ..FleetStats::default()
    };

    for vehicle in vehicles {
        stats.total_maintenance += vehicle.maintenance_cost;
        if vehicle.status == VehicleStatus::Active {
            stats.active_vehicles += 1;
        }
    }

    for settlement in settlements {
        stats.total_revenue += settlement.gross_earnings;
        stats.total_expenses += settlement.total_deductions();
        stats.total_net_payable += settlement.net_payable;
        if settlement.status == SettlementStatus::Pending {
            stats.pending_settlements += 1;
        }
    }

    stats
}
