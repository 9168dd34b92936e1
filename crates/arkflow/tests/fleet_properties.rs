//! Randomised checks for the settlement calculator, matcher and stats reducer.

use arkflow::fleet::{
    apply_assignment, compute_settlement, compute_stats, eligible_pairs, AssignmentError,
    Commission, Driver, DriverId, DriverStatus, InvalidAmountError, Money, NegativePayoutPolicy,
    PaymentModel, RegistrationNumber, SettlementCalculator, SettlementInput, Vehicle, VehicleId,
    VehicleStatus,
};
use chrono::NaiveDate;
use proptest::prelude::*;

fn cycle_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).expect("valid date")
}

fn input(gross: i64, commission: i64, charges: [i64; 4]) -> SettlementInput {
    SettlementInput {
        driver_id: DriverId("d1".to_string()),
        vehicle_registration: RegistrationNumber::parse("MH-12-AB-1234").expect("valid plate"),
        cycle_end: cycle_end(),
        gross_earnings: Money::from_minor(gross),
        commission: Commission::Flat(Money::from_minor(commission)),
        fast_tag_charge: Money::from_minor(charges[0]),
        rto_fine: Money::from_minor(charges[1]),
        private_toll_charges: Money::from_minor(charges[2]),
        other_charges: Money::from_minor(charges[3]),
    }
}

/// Amounts in paise, up to ten lakh rupees.
fn arb_paise() -> impl Strategy<Value = i64> {
    0i64..100_000_000
}

fn arb_driver_status() -> impl Strategy<Value = DriverStatus> {
    prop_oneof![
        Just(DriverStatus::Onboarding),
        Just(DriverStatus::Active),
        Just(DriverStatus::Inactive),
    ]
}

fn arb_vehicle_status() -> impl Strategy<Value = VehicleStatus> {
    prop_oneof![
        Just(VehicleStatus::Active),
        Just(VehicleStatus::Idle),
        Just(VehicleStatus::Maintenance),
    ]
}

fn arb_drivers() -> impl Strategy<Value = Vec<Driver>> {
    proptest::collection::vec((arb_driver_status(), any::<bool>()), 0..12).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (status, assigned))| Driver {
                id: DriverId(format!("d{index}")),
                code: format!("d{index}"),
                name: format!("Driver {index}"),
                phone: "9876543210".to_string(),
                license_number: format!("MH12 {index:011}"),
                aadhaar_number: None,
                pan_number: None,
                city: None,
                state: None,
                status,
                assigned_vehicle: assigned.then(|| {
                    RegistrationNumber::parse(&format!("MH-01-AA-{index:04}")).expect("plate")
                }),
                payment_model: assigned.then_some(PaymentModel::Commission),
                onboarded_on: cycle_end(),
            })
            .collect()
    })
}

fn arb_vehicles() -> impl Strategy<Value = Vec<Vehicle>> {
    proptest::collection::vec(arb_vehicle_status(), 0..12).prop_map(|statuses| {
        statuses
            .into_iter()
            .enumerate()
            .map(|(index, status)| Vehicle {
                id: VehicleId(format!("v{index}")),
                registration: RegistrationNumber::parse(&format!("MH-12-BB-{index:04}"))
                    .expect("plate"),
                make: "Tata".to_string(),
                model: "Tigor".to_string(),
                chassis_number: None,
                insurance_start: None,
                insurance_end: None,
                puc_expiry: None,
                status,
                odometer_km: 0,
                odometer_read_on: cycle_end(),
                maintenance_cost: Money::from_minor(index as i64 * 10_000),
                maintenance_history: Vec::new(),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Net payable is gross minus the five deductions, to the paisa.
    #[test]
    fn net_payable_matches_arithmetic_identity(
        gross in arb_paise(),
        commission in arb_paise(),
        charges in proptest::array::uniform4(0i64..5_000_000),
    ) {
        let calculator = SettlementCalculator::new(NegativePayoutPolicy::Clamp);
        prop_assume!(commission <= gross);

        let record = calculator
            .compute(input(gross, commission, charges))
            .expect("valid input computes");

        let deductions = commission + charges.iter().sum::<i64>();
        let expected = gross - deductions;
        prop_assert_eq!(record.total_deductions(), Money::from_minor(deductions));
        prop_assert_eq!(
            record.net_payable - record.shortfall,
            Money::from_minor(expected)
        );
        if expected >= 0 {
            prop_assert_eq!(record.net_payable, Money::from_minor(expected));
            prop_assert!(record.shortfall.is_zero());
        } else {
            prop_assert!(record.net_payable.is_zero());
        }
    }

    /// Under the default policy a non-negative result is returned exactly, anything else fails.
    #[test]
    fn default_policy_never_yields_negative_payout(
        gross in arb_paise(),
        commission in arb_paise(),
        charges in proptest::array::uniform4(0i64..5_000_000),
    ) {
        prop_assume!(commission <= gross);
        match compute_settlement(input(gross, commission, charges)) {
            Ok(record) => prop_assert!(!record.net_payable.is_negative()),
            Err(err) => prop_assert!(
                matches!(err, InvalidAmountError::NegativeNetPayable(_)),
                "unexpected error {:?}",
                err
            ),
        }
    }

    /// Commission above gross is always refused.
    #[test]
    fn commission_above_gross_is_rejected(
        gross in arb_paise(),
        excess in 1i64..10_000_000,
    ) {
        let result = compute_settlement(input(gross, gross + excess, [0; 4]));
        let is_commission_rejection =
            matches!(result, Err(InvalidAmountError::CommissionExceedsGross { .. }));
        prop_assert!(is_commission_rejection);
    }

    /// Every listed pair has an active, unassigned driver and an idle vehicle.
    #[test]
    fn eligible_pairs_respect_invariant(
        drivers in arb_drivers(),
        vehicles in arb_vehicles(),
    ) {
        let mut count = 0usize;
        for (driver, vehicle) in eligible_pairs(&drivers, &vehicles) {
            prop_assert!(driver.assigned_vehicle.is_none());
            prop_assert_eq!(driver.status, DriverStatus::Active);
            prop_assert_eq!(vehicle.status, VehicleStatus::Idle);
            count += 1;
        }

        let eligible = drivers
            .iter()
            .filter(|d| d.status == DriverStatus::Active && d.assigned_vehicle.is_none())
            .count();
        let idle = vehicles.iter().filter(|v| v.status == VehicleStatus::Idle).count();
        prop_assert_eq!(count, eligible * idle);
    }

    /// A driver assigned once cannot be assigned again.
    #[test]
    fn reassignment_is_refused(
        drivers in arb_drivers(),
        vehicles in arb_vehicles(),
    ) {
        let first = eligible_pairs(&drivers, &vehicles).next();
        if let Some((driver, vehicle)) = first {
            let assignment = apply_assignment(driver, vehicle, PaymentModel::Daily)
                .expect("eligible pair assigns");
            let again = apply_assignment(&assignment.driver, vehicle, PaymentModel::Daily);
            let refused = matches!(again, Err(AssignmentError::AlreadyAssigned { .. }));
            prop_assert!(refused);
        }
    }

    /// Stats counts and sums agree with the fixture.
    #[test]
    fn stats_follow_collections(
        drivers in arb_drivers(),
        vehicles in arb_vehicles(),
        grosses in proptest::collection::vec(arb_paise(), 0..10),
    ) {
        let settlements: Vec<_> = grosses
            .iter()
            .map(|gross| compute_settlement(input(*gross, 0, [0; 4])).expect("valid"))
            .collect();

        let stats = compute_stats(&drivers, &vehicles, &settlements);

        prop_assert_eq!(stats.total_drivers, drivers.len());
        prop_assert_eq!(
            stats.active_drivers,
            drivers.iter().filter(|d| d.status == DriverStatus::Active).count()
        );
        prop_assert_eq!(
            stats.total_revenue,
            Money::from_minor(grosses.iter().sum::<i64>())
        );
        prop_assert_eq!(stats.pending_settlements, settlements.len());
    }
}
