use crate::infra::{parse_date, parse_money, InMemoryFleetStore, RuleBasedAdvisor};
use arkflow::config::AppConfig;
use arkflow::error::AppError;
use arkflow::fleet::{
    AdvisoryService, Commission, ComplianceSeverity, DriverId, FleetDataSource, FleetService,
    FleetServiceError, FleetStats, JsonFileStore, LedgerSettings, Money, NegativePayoutPolicy,
    RegistrationNumber, SettlementCalculator, SettlementInput, SettlementRecord,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SettlementComputeArgs {
    /// Driver identifier the settlement belongs to
    #[arg(long)]
    pub(crate) driver_id: String,
    /// Vehicle registration plate driven during the cycle
    #[arg(long)]
    pub(crate) vehicle: String,
    /// Last day of the settlement cycle (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) cycle_end: NaiveDate,
    /// Gross platform earnings for the cycle
    #[arg(long, value_parser = parse_money)]
    pub(crate) gross: Money,
    /// Flat commission amount
    #[arg(long, value_parser = parse_money, conflicts_with = "commission_rate")]
    pub(crate) commission: Option<Money>,
    /// Commission as a fraction of gross earnings (0 to 1)
    #[arg(long)]
    pub(crate) commission_rate: Option<Decimal>,
    #[arg(long, value_parser = parse_money)]
    pub(crate) fast_tag: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    pub(crate) rto_fine: Option<Money>,
    /// Private toll charges
    #[arg(long, value_parser = parse_money)]
    pub(crate) toll: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    pub(crate) other: Option<Money>,
    /// Pay zero and record a shortfall instead of rejecting a negative payout
    #[arg(long)]
    pub(crate) clamp: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StatsArgs {
    /// Ledger directory; defaults to ARKFLOW_DATA_DIR
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Reference date for compliance alerts (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_settlement_compute(args: SettlementComputeArgs) -> Result<(), AppError> {
    let policy = if args.clamp {
        NegativePayoutPolicy::Clamp
    } else {
        NegativePayoutPolicy::Reject
    };
    let input = settlement_input(args)?;

    let record = SettlementCalculator::new(policy)
        .compute(input)
        .map_err(FleetServiceError::from)?;
    render_settlement(&record);
    Ok(())
}

fn settlement_input(args: SettlementComputeArgs) -> Result<SettlementInput, AppError> {
    let vehicle_registration =
        RegistrationNumber::parse(&args.vehicle).map_err(FleetServiceError::from)?;
    let commission = match args.commission_rate {
        Some(rate) => Commission::Rate(rate),
        None => Commission::Flat(args.commission.unwrap_or(Money::ZERO)),
    };

    Ok(SettlementInput {
        driver_id: DriverId(args.driver_id),
        vehicle_registration,
        cycle_end: args.cycle_end,
        gross_earnings: args.gross,
        commission,
        fast_tag_charge: args.fast_tag.unwrap_or(Money::ZERO),
        rto_fine: args.rto_fine.unwrap_or(Money::ZERO),
        private_toll_charges: args.toll.unwrap_or(Money::ZERO),
        other_charges: args.other.unwrap_or(Money::ZERO),
    })
}

pub(crate) async fn run_stats(args: StatsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let settings = config.ledger.settings();
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    match args.data_dir.or(config.ledger.data_dir) {
        Some(dir) => {
            println!("Ledger: {}", dir.display());
            let service = FleetService::new(
                Arc::new(JsonFileStore::new(dir)),
                Arc::new(RuleBasedAdvisor),
                settings,
            );
            render_ledger(&service, today).await
        }
        None => {
            println!("Ledger: in-memory (no data directory configured)");
            let service = FleetService::new(
                Arc::new(InMemoryFleetStore::default()),
                Arc::new(RuleBasedAdvisor),
                settings,
            );
            render_ledger(&service, today).await
        }
    }
}

pub(crate) async fn render_ledger<D, A>(
    service: &FleetService<D, A>,
    today: NaiveDate,
) -> Result<(), AppError>
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    render_stats(&service.dashboard().await?);

    let billing = service.billing_report().await?;
    if !billing.is_empty() {
        println!("\nPer-driver billing");
        for entry in &billing {
            println!(
                "- {} ({}): {} cycles | revenue {} | deductions {} | net {} | pending {}",
                entry.driver_name,
                entry.driver_id.0,
                entry.cycles,
                entry.revenue,
                entry.deductions,
                entry.net_payable,
                entry.pending
            );
        }
    }

    let alerts = service.compliance(today).await?;
    if alerts.is_empty() {
        println!("\nCompliance alerts: none");
    } else {
        println!("\nCompliance alerts (as of {today})");
        for alert in &alerts {
            let severity = match alert.severity {
                ComplianceSeverity::Expired => "EXPIRED",
                ComplianceSeverity::DueSoon => "due soon",
            };
            println!(
                "- {} {}: {} on {} ({} days)",
                alert.registration,
                alert.document_label,
                severity,
                alert.expires_on,
                alert.days_remaining
            );
        }
    }
    Ok(())
}

pub(crate) fn render_stats(stats: &FleetStats) {
    println!("\nFleet dashboard");
    println!(
        "- Drivers: {} total | {} active",
        stats.total_drivers, stats.active_drivers
    );
    println!("- Vehicles on the road: {}", stats.active_vehicles);
    println!(
        "- Revenue {} | expenses {} | net payable {}",
        stats.total_revenue, stats.total_expenses, stats.total_net_payable
    );
    println!("- Maintenance spend: {}", stats.total_maintenance);
    println!("- Pending settlements: {}", stats.pending_settlements);
}

pub(crate) fn render_settlement(record: &SettlementRecord) {
    println!(
        "Settlement {} for driver {} ({}), cycle ending {}",
        record.id.0, record.driver_id.0, record.vehicle_registration, record.cycle_end
    );
    println!("- Gross earnings:  {}", record.gross_earnings);
    println!("- Commission:      {}", record.commission);
    println!("- FASTag:          {}", record.fast_tag_charge);
    println!("- RTO fines:       {}", record.rto_fine);
    println!("- Private tolls:   {}", record.private_toll_charges);
    println!("- Other charges:   {}", record.other_charges);
    println!("- Net payable:     {}", record.net_payable);
    if !record.shortfall.is_zero() {
        println!("- Shortfall owed:  {}", record.shortfall);
    }
    println!("- Status:          {}", record.status.label());
}

/// Settings used when the CLI runs without loading configuration.
pub(crate) fn demo_settings() -> LedgerSettings {
    LedgerSettings {
        negative_payout: NegativePayoutPolicy::Clamp,
        ..LedgerSettings::default()
    }
}
