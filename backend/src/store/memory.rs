use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    models::{
        account::Account,
        auth::Session,
        child::Child,
        driver::{Driver, Vehicle},
        location::LocationSample,
    },
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    // Vecs keep insertion order, which is the order the dashboard lists them in.
    children: Vec<Child>,
    drivers: Vec<Driver>,
    vehicles: Vec<Vehicle>,
    locations: Vec<LocationSample>,
    sessions: HashMap<Uuid, Session>,
}

impl Tables {
    /// Drop an account and everything it owns.
    fn cascade_account(&mut self, account_id: Uuid) {
        let driver_ids: Vec<Uuid> = self
            .drivers
            .iter()
            .filter(|d| d.account_id == account_id)
            .map(|d| d.id)
            .collect();

        self.vehicles.retain(|v| !driver_ids.contains(&v.driver_id));
        self.drivers.retain(|d| d.account_id != account_id);
        self.children.retain(|c| c.account_id != account_id);
        self.sessions.retain(|_, s| s.account_id != account_id);
        self.accounts.remove(&account_id);
    }
}

/// Volatile store; everything lives behind one lock so multi-table
/// operations are applied as a unit.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if t.accounts.values().any(|a| a.email == account.email) {
            return Err(AppError::DuplicateEmail);
        }
        t.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let t = self.tables.read().await;
        Ok(t.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: &Account) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if t
            .accounts
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(AppError::DuplicateEmail);
        }
        match t.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Account")),
        }
    }

    async fn insert_child(&self, child: &Child) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if !t.accounts.contains_key(&child.account_id) {
            return Err(AppError::NotFound("Account"));
        }
        t.children.push(child.clone());
        Ok(())
    }

    async fn find_child(&self, id: Uuid) -> AppResult<Option<Child>> {
        let t = self.tables.read().await;
        Ok(t.children.iter().find(|c| c.id == id).cloned())
    }

    async fn list_children(&self, account_id: Uuid) -> AppResult<Vec<Child>> {
        let t = self.tables.read().await;
        Ok(t.children
            .iter()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn update_child(&self, child: &Child) -> AppResult<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .children
            .iter_mut()
            .find(|c| c.id == child.id)
            .ok_or(AppError::NotFound("Child"))?;
        *slot = child.clone();
        Ok(())
    }

    async fn delete_child(&self, child_id: Uuid, account_id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        let idx = t
            .children
            .iter()
            .position(|c| c.id == child_id && c.account_id == account_id)
            .ok_or(AppError::NotFound("Child"))?;
        t.children.remove(idx);

        if t.children.iter().any(|c| c.account_id == account_id) {
            return Ok(false);
        }
        t.cascade_account(account_id);
        Ok(true)
    }

    async fn insert_driver(&self, driver: &Driver, vehicle: &Vehicle) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if !t.accounts.contains_key(&driver.account_id) {
            return Err(AppError::NotFound("Account"));
        }
        t.drivers.push(driver.clone());
        t.vehicles.push(vehicle.clone());
        Ok(())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers.iter().find(|d| d.id == id).cloned())
    }

    async fn list_drivers(&self, account_id: Uuid) -> AppResult<Vec<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn update_driver(&self, driver: &Driver) -> AppResult<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .drivers
            .iter_mut()
            .find(|d| d.id == driver.id)
            .ok_or(AppError::NotFound("Driver"))?;
        *slot = driver.clone();
        Ok(())
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<()> {
        let mut t = self.tables.write().await;
        t.vehicles.retain(|v| v.driver_id != id);
        t.drivers.retain(|d| d.id != id);
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if !t.drivers.iter().any(|d| d.id == vehicle.driver_id) {
            return Err(AppError::NotFound("Driver"));
        }
        t.vehicles.push(vehicle.clone());
        Ok(())
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let t = self.tables.read().await;
        Ok(t.vehicles.iter().find(|v| v.id == id).cloned())
    }

    async fn list_vehicles(&self, driver_id: Uuid) -> AppResult<Vec<Vehicle>> {
        let t = self.tables.read().await;
        Ok(t.vehicles
            .iter()
            .filter(|v| v.driver_id == driver_id)
            .cloned()
            .collect())
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let mut t = self.tables.write().await;
        let slot = t
            .vehicles
            .iter_mut()
            .find(|v| v.id == vehicle.id)
            .ok_or(AppError::NotFound("Vehicle"))?;
        *slot = vehicle.clone();
        Ok(())
    }

    async fn insert_location(&self, sample: &LocationSample) -> AppResult<()> {
        self.tables.write().await.locations.push(sample.clone());
        Ok(())
    }

    async fn latest_location(&self, vehicle_id: Uuid) -> AppResult<Option<LocationSample>> {
        let t = self.tables.read().await;
        // max_by_key keeps the last of equal timestamps, i.e. the newest insert.
        Ok(t.locations
            .iter()
            .filter(|l| l.vehicle_id == vehicle_id)
            .max_by_key(|l| l.timestamp)
            .cloned())
    }

    async fn list_locations(&self, vehicle_id: Uuid) -> AppResult<Vec<LocationSample>> {
        let t = self.tables.read().await;
        let mut samples: Vec<LocationSample> = t
            .locations
            .iter()
            .filter(|l| l.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        samples.sort_by_key(|l| l.timestamp);
        Ok(samples)
    }

    async fn insert_session(&self, session: &Session) -> AppResult<()> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn revoke_session(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        match t.sessions.get_mut(&id) {
            Some(s) if !s.revoked => {
                s.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
