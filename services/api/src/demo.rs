use crate::infra::{parse_date, InMemoryFleetStore, RuleBasedAdvisor};
use crate::ledger::{demo_settings, render_ledger, render_settlement};
use arkflow::error::AppError;
use arkflow::fleet::{
    AssignmentRequest, Commission, DriverRegistration, FleetService, MaintenanceRequest, Money,
    PaymentModel, SettlementInput, VehicleRegistration,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Last day of the demo settlement cycle (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) cycle_end: Option<NaiveDate>,
    /// Skip the earnings CSV import step.
    #[arg(long)]
    pub(crate) skip_import: bool,
}

const DEMO_EARNINGS_CSV: &str = "\
Driver Name,Earnings,Commission
Rahul Sharma,18450,3690
Anil Kumar,9800,1960
";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        cycle_end,
        skip_import,
    } = args;
    let cycle_end = cycle_end.unwrap_or_else(|| Local::now().date_naive());
    let onboarded_on = cycle_end - Duration::days(30);

    println!("ArkFlow fleet ledger demo (cycle ending {cycle_end})");
    let service = FleetService::new(
        Arc::new(InMemoryFleetStore::default()),
        Arc::new(RuleBasedAdvisor),
        demo_settings(),
    );

    let driver = service
        .onboard_driver(DriverRegistration {
            code: Some("DRV-001".to_string()),
            name: "Rahul Sharma".to_string(),
            phone: "+91 98765 43210".to_string(),
            license_number: "MH1220190012345".to_string(),
            aadhaar_number: None,
            pan_number: None,
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            onboarded_on,
        })
        .await?;
    let driver = service.activate_driver(&driver.id).await?;
    println!(
        "\nOnboarded {} ({}) and marked them {}",
        driver.name,
        driver.code,
        driver.status.label()
    );

    let vehicle = service
        .register_vehicle(VehicleRegistration {
            registration: "MH-12-AB-1234".to_string(),
            make: "Maruti Suzuki".to_string(),
            model: "Dzire".to_string(),
            chassis_number: None,
            insurance_start: Some(onboarded_on),
            insurance_end: Some(cycle_end + Duration::days(20)),
            puc_expiry: Some(cycle_end - Duration::days(3)),
            odometer_km: 42_000,
            registered_on: onboarded_on,
        })
        .await?;
    let vehicle = service
        .log_maintenance(
            &vehicle.registration,
            MaintenanceRequest {
                service_date: cycle_end - Duration::days(10),
                service_type: "General service".to_string(),
                expense: Money::from_major(3_500),
                odometer_km: 43_150,
            },
        )
        .await?;
    println!(
        "Registered {} {} ({}), maintenance to date {}",
        vehicle.make, vehicle.model, vehicle.registration, vehicle.maintenance_cost
    );

    let advice = service.suggest_match().await?;
    println!("\nEligible pairs: {}", advice.candidates.len());
    if let Some(suggestion) = &advice.suggestion {
        println!("Advisor: {suggestion}");
    }

    let assignment = service
        .assign(AssignmentRequest {
            driver_id: driver.id.clone(),
            registration: vehicle.registration.clone(),
            payment_model: PaymentModel::Commission,
        })
        .await?;
    println!(
        "Assigned {} to {} on the {} model; vehicle now {}",
        assignment.driver.name,
        assignment.link.registration,
        assignment.link.payment_model.label(),
        assignment.vehicle.status.label()
    );

    println!("\nWeekly settlement");
    let record = service
        .record_settlement(SettlementInput {
            driver_id: driver.id.clone(),
            vehicle_registration: vehicle.registration.clone(),
            cycle_end: cycle_end - Duration::days(7),
            gross_earnings: Money::from_major(15_400),
            commission: Commission::Rate(Decimal::new(20, 2)),
            fast_tag_charge: Money::from_major(450),
            rto_fine: Money::ZERO,
            private_toll_charges: Money::from_major(200),
            other_charges: Money::ZERO,
        })
        .await?;
    let record = service.settle(&record.id).await?;
    render_settlement(&record);

    if !skip_import {
        let import = service
            .import_earnings(DEMO_EARNINGS_CSV.as_bytes(), cycle_end)
            .await?;
        println!(
            "\nEarnings import: {} settlement(s) created, {} row(s) skipped",
            import.created.len(),
            import.skipped.len()
        );
        for skipped in &import.skipped {
            println!("- skipped {}: {}", skipped.driver_name, skipped.reason);
        }
    }

    render_ledger(&service, cycle_end).await
}
