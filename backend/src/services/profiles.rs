use chrono::{Datelike, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        account::{AccountProfile, Profile, UpdateAccountRequest},
        child::{Child, CreateChildRequest, DeleteChildResponse, UpdateChildRequest},
        driver::{
            CreateDriverRequest, Driver, DriverProfile, UpdateDriverRequest, Vehicle, VIN_LENGTH,
        },
    },
    services::{
        auth::{normalize_email, validate_email},
        metrics::ACCOUNT_CASCADES_COUNTER,
    },
    store::Store,
};

const MAX_CHILD_AGE: i32 = 25;

/// Reject any VIN that is not exactly 17 characters.
pub fn check_vin(vin: &str) -> AppResult<()> {
    let len = vin.chars().count();
    if len != VIN_LENGTH {
        return Err(AppError::InvalidVin(len));
    }
    Ok(())
}

/// Vehicles created from the driver form only carry a VIN.
fn placeholder_vehicle(driver_id: Uuid, vin: &str) -> Vehicle {
    let now = Utc::now();
    Vehicle {
        id: Uuid::new_v4(),
        driver_id,
        vin: vin.to_string(),
        make: "Unknown".into(),
        model: "Unknown".into(),
        year: now.year(),
        created_at: now,
    }
}

pub struct ProfileService;

impl ProfileService {
    pub async fn get_profile(store: &dyn Store, account_id: Uuid) -> AppResult<Profile> {
        let account = store
            .find_account(account_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        let children = store.list_children(account_id).await?;

        let mut drivers = Vec::new();
        for driver in store.list_drivers(account_id).await? {
            let vehicles = store.list_vehicles(driver.id).await?;
            drivers.push(DriverProfile { driver, vehicles });
        }

        Ok(Profile {
            account: AccountProfile::from(account),
            children,
            drivers,
        })
    }

    pub async fn update_account(
        store: &dyn Store,
        account_id: Uuid,
        req: &UpdateAccountRequest,
    ) -> AppResult<AccountProfile> {
        let mut account = store
            .find_account(account_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if let Some(name) = &req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::InvalidInput("Name is required".into()));
            }
            account.name = name.to_string();
        }

        if let Some(email) = &req.email {
            let email = normalize_email(email);
            validate_email(&email)?;
            if let Some(other) = store.find_account_by_email(&email).await? {
                if other.id != account_id {
                    return Err(AppError::DuplicateEmail);
                }
            }
            account.email = email;
        }

        store.update_account(&account).await?;
        info!("Account updated: {}", account_id);
        Ok(account.into())
    }

    pub fn validate_child(name: &str, age: i32) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Child name is required".into()));
        }
        if !(0..=MAX_CHILD_AGE).contains(&age) {
            return Err(AppError::InvalidInput(format!(
                "Child age must be between 0 and {MAX_CHILD_AGE}"
            )));
        }
        Ok(())
    }

    pub async fn add_child(
        store: &dyn Store,
        account_id: Uuid,
        req: &CreateChildRequest,
    ) -> AppResult<Child> {
        Self::validate_child(&req.name, req.age)?;

        let child = Child {
            id: Uuid::new_v4(),
            account_id,
            name: req.name.trim().to_string(),
            age: req.age,
            grade: req.grade.trim().to_string(),
            school: req.school.trim().to_string(),
            created_at: Utc::now(),
        };
        store.insert_child(&child).await?;

        info!("Child {} added to account {}", child.id, account_id);
        Ok(child)
    }

    /// Merge the provided fields into a child owned by `account_id`.
    pub async fn update_child(
        store: &dyn Store,
        child_id: Uuid,
        account_id: Uuid,
        req: &UpdateChildRequest,
    ) -> AppResult<Child> {
        let mut child = store
            .find_child(child_id)
            .await?
            .filter(|c| c.account_id == account_id)
            .ok_or(AppError::NotFound("Child"))?;

        if let Some(name) = &req.name {
            child.name = name.trim().to_string();
        }
        if let Some(age) = req.age {
            child.age = age;
        }
        if let Some(grade) = &req.grade {
            child.grade = grade.trim().to_string();
        }
        if let Some(school) = &req.school {
            child.school = school.trim().to_string();
        }
        Self::validate_child(&child.name, child.age)?;

        store.update_child(&child).await?;
        Ok(child)
    }

    /// Delete a child. Removing the last one deletes the whole account.
    pub async fn delete_child(
        store: &dyn Store,
        child_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<DeleteChildResponse> {
        let account_deleted = store.delete_child(child_id, account_id).await?;

        if account_deleted {
            ACCOUNT_CASCADES_COUNTER.inc();
            info!(
                "Last child {} removed; account {} deleted with its drivers and vehicles",
                child_id, account_id
            );
        } else {
            info!("Child {} removed from account {}", child_id, account_id);
        }

        Ok(DeleteChildResponse { account_deleted })
    }

    /// Create a driver together with the vehicle identified by `req.vin`.
    pub async fn add_driver(
        store: &dyn Store,
        account_id: Uuid,
        req: &CreateDriverRequest,
    ) -> AppResult<DriverProfile> {
        check_vin(&req.vin)?;

        let driver = Driver {
            id: Uuid::new_v4(),
            account_id,
            name: req.name.trim().to_string(),
            license_number: req.license_number.trim().to_string(),
            phone_number: req.phone_number.trim().to_string(),
            created_at: Utc::now(),
        };
        let vehicle = placeholder_vehicle(driver.id, &req.vin);
        store.insert_driver(&driver, &vehicle).await?;

        info!(
            "Driver {} with vehicle {} added to account {}",
            driver.id, vehicle.id, account_id
        );
        Ok(DriverProfile {
            driver,
            vehicles: vec![vehicle],
        })
    }

    /// Merge the provided fields into a driver; a new VIN updates the driver's
    /// vehicle, or registers one if they have none.
    pub async fn update_driver(
        store: &dyn Store,
        driver_id: Uuid,
        account_id: Uuid,
        req: &UpdateDriverRequest,
    ) -> AppResult<DriverProfile> {
        let mut driver = Self::owned_driver(store, driver_id, account_id).await?;
        if let Some(vin) = &req.vin {
            check_vin(vin)?;
        }

        if let Some(name) = &req.name {
            driver.name = name.trim().to_string();
        }
        if let Some(license) = &req.license_number {
            driver.license_number = license.trim().to_string();
        }
        if let Some(phone) = &req.phone_number {
            driver.phone_number = phone.trim().to_string();
        }
        store.update_driver(&driver).await?;

        if let Some(vin) = &req.vin {
            match store.list_vehicles(driver.id).await?.into_iter().next() {
                Some(mut vehicle) => {
                    vehicle.vin = vin.clone();
                    store.update_vehicle(&vehicle).await?;
                }
                None => {
                    store
                        .insert_vehicle(&placeholder_vehicle(driver.id, vin))
                        .await?;
                }
            }
        }

        let vehicles = store.list_vehicles(driver.id).await?;
        Ok(DriverProfile { driver, vehicles })
    }

    /// Delete a driver and their vehicles. Returns the removed vehicle ids.
    pub async fn delete_driver(
        store: &dyn Store,
        driver_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        let driver = Self::owned_driver(store, driver_id, account_id).await?;
        let vehicle_ids = store
            .list_vehicles(driver.id)
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();

        store.delete_driver(driver.id).await?;
        info!("Driver {} removed from account {}", driver_id, account_id);
        Ok(vehicle_ids)
    }

    /// Look up a vehicle that belongs to one of the account's drivers.
    pub async fn vehicle_for_account(
        store: &dyn Store,
        vehicle_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<Vehicle> {
        let vehicle = store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or(AppError::NotFound("Vehicle"))?;

        let owned = store
            .find_driver(vehicle.driver_id)
            .await?
            .is_some_and(|d| d.account_id == account_id);
        if !owned {
            return Err(AppError::NotFound("Vehicle"));
        }
        Ok(vehicle)
    }

    async fn owned_driver(store: &dyn Store, driver_id: Uuid, account_id: Uuid) -> AppResult<Driver> {
        store
            .find_driver(driver_id)
            .await?
            .filter(|d| d.account_id == account_id)
            .ok_or(AppError::NotFound("Driver"))
    }
}
