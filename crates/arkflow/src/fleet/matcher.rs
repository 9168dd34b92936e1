//! Driver–vehicle pairing rules.
//!
//! The driver's `assigned_vehicle` and the vehicle's `status` form one relationship; the
//! functions here are the only place that changes both, and they always return both sides
//! together inside an [`Assignment`].

use serde::{Deserialize, Serialize};

use super::domain::{
    Driver, DriverId, DriverStatus, PaymentModel, RegistrationNumber, Vehicle, VehicleId,
    VehicleStatus,
};

/// Matcher invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("vehicle {registration} is {status:?}, only idle vehicles can be assigned")]
    Conflict {
        registration: RegistrationNumber,
        status: VehicleStatus,
    },
    #[error("driver {driver_id:?} already drives {registration}")]
    AlreadyAssigned {
        driver_id: DriverId,
        registration: RegistrationNumber,
    },
    #[error("driver {driver_id:?} is {status:?}, only active drivers can be assigned")]
    DriverNotActive {
        driver_id: DriverId,
        status: DriverStatus,
    },
    #[error("driver {0:?} holds no vehicle assignment")]
    NotAssigned(DriverId),
    #[error("driver holds {held}, not {requested}")]
    Mismatch {
        held: RegistrationNumber,
        requested: RegistrationNumber,
    },
}

/// Lightweight view of an eligible pairing, suitable for advisory input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub vehicle_id: VehicleId,
    pub registration: RegistrationNumber,
    pub vehicle_label: String,
}

/// The link produced by a successful assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentLink {
    pub driver_id: DriverId,
    pub registration: RegistrationNumber,
    pub payment_model: PaymentModel,
}

/// Both sides of an assignment change, updated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub link: AssignmentLink,
    pub driver: Driver,
    pub vehicle: Vehicle,
}

/// Both sides of a released assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub driver: Driver,
    pub vehicle: Vehicle,
}

pub fn is_eligible_driver(driver: &Driver) -> bool {
    driver.status == DriverStatus::Active && !driver.is_assigned()
}

pub fn is_available_vehicle(vehicle: &Vehicle) -> bool {
    vehicle.status == VehicleStatus::Idle
}

/// Drivers that may receive a vehicle, in input order.
pub fn eligible_drivers(drivers: &[Driver]) -> impl Iterator<Item = &Driver> + Clone {
    drivers.iter().filter(|driver| is_eligible_driver(driver))
}

/// Vehicles that may be handed out, in input order.
pub fn idle_vehicles(vehicles: &[Vehicle]) -> impl Iterator<Item = &Vehicle> + Clone {
    vehicles.iter().filter(|vehicle| is_available_vehicle(vehicle))
}

/// Lazy cross product of eligible drivers and idle vehicles.
///
/// Ordering follows the inputs: drivers outer, vehicles inner. Cloning the iterator restarts
/// the walk from the clone point.
#[derive(Debug, Clone)]
pub struct EligiblePairs<'a> {
    drivers: &'a [Driver],
    vehicles: &'a [Vehicle],
    driver_index: usize,
    vehicle_index: usize,
}

impl<'a> Iterator for EligiblePairs<'a> {
    type Item = (&'a Driver, &'a Vehicle);

    fn next(&mut self) -> Option<Self::Item> {
        while self.driver_index < self.drivers.len() {
            let driver = &self.drivers[self.driver_index];
            if !is_eligible_driver(driver) {
                self.driver_index += 1;
                self.vehicle_index = 0;
                continue;
            }

            while self.vehicle_index < self.vehicles.len() {
                let vehicle = &self.vehicles[self.vehicle_index];
                self.vehicle_index += 1;
                if is_available_vehicle(vehicle) {
                    return Some((driver, vehicle));
                }
            }

            self.driver_index += 1;
            self.vehicle_index = 0;
        }
        None
    }
}

pub fn eligible_pairs<'a>(drivers: &'a [Driver], vehicles: &'a [Vehicle]) -> EligiblePairs<'a> {
    EligiblePairs {
        drivers,
        vehicles,
        driver_index: 0,
        vehicle_index: 0,
    }
}

/// Materialise the eligible pairs as advisory-friendly views.
pub fn candidate_pairs(drivers: &[Driver], vehicles: &[Vehicle]) -> Vec<CandidatePair> {
    eligible_pairs(drivers, vehicles)
        .map(|(driver, vehicle)| CandidatePair {
            driver_id: driver.id.clone(),
            driver_name: driver.name.clone(),
            vehicle_id: vehicle.id.clone(),
            registration: vehicle.registration.clone(),
            vehicle_label: format!("{} {}", vehicle.make, vehicle.model)
                .trim()
                .to_string(),
        })
        .collect()
}

/// Pair a driver with an idle vehicle without touching the inputs.
pub fn apply_assignment(
    driver: &Driver,
    vehicle: &Vehicle,
    payment_model: PaymentModel,
) -> Result<Assignment, AssignmentError> {
    if let Some(registration) = &driver.assigned_vehicle {
        return Err(AssignmentError::AlreadyAssigned {
            driver_id: driver.id.clone(),
            registration: registration.clone(),
        });
    }
    if vehicle.status != VehicleStatus::Idle {
        return Err(AssignmentError::Conflict {
            registration: vehicle.registration.clone(),
            status: vehicle.status,
        });
    }
    if driver.status != DriverStatus::Active {
        return Err(AssignmentError::DriverNotActive {
            driver_id: driver.id.clone(),
            status: driver.status,
        });
    }

    let driver = Driver {
        assigned_vehicle: Some(vehicle.registration.clone()),
        payment_model: Some(payment_model),
        ..driver.clone()
    };
    let vehicle = Vehicle {
        status: VehicleStatus::Active,
        ..vehicle.clone()
    };

    Ok(Assignment {
        link: AssignmentLink {
            driver_id: driver.id.clone(),
            registration: vehicle.registration.clone(),
            payment_model,
        },
        driver,
        vehicle,
    })
}

/// Undo an assignment: the driver loses the plate, the vehicle returns to `Idle`.
pub fn release_assignment(driver: &Driver, vehicle: &Vehicle) -> Result<Release, AssignmentError> {
    let held = driver
        .assigned_vehicle
        .as_ref()
        .ok_or_else(|| AssignmentError::NotAssigned(driver.id.clone()))?;
    if held != &vehicle.registration {
        return Err(AssignmentError::Mismatch {
            held: held.clone(),
            requested: vehicle.registration.clone(),
        });
    }

    Ok(Release {
        driver: Driver {
            assigned_vehicle: None,
            payment_model: None,
            ..driver.clone()
        },
        vehicle: Vehicle {
            status: VehicleStatus::Idle,
            ..vehicle.clone()
        },
    })
}
