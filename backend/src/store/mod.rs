//! Storage seam between the services and whatever holds the records.
//!
//! Services only talk to [`Store`]. `MemoryStore` keeps everything in the
//! process (data resets on restart); `PgStore` persists to Postgres.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        account::Account,
        auth::Session,
        child::Child,
        driver::{Driver, Vehicle},
        location::LocationSample,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness check for the health endpoint.
    async fn ping(&self) -> AppResult<()>;

    // Accounts
    /// Fails with `DuplicateEmail` if another account holds the same email.
    async fn insert_account(&self, account: &Account) -> AppResult<()>;
    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn update_account(&self, account: &Account) -> AppResult<()>;

    // Children
    async fn insert_child(&self, child: &Child) -> AppResult<()>;
    async fn find_child(&self, id: Uuid) -> AppResult<Option<Child>>;
    async fn list_children(&self, account_id: Uuid) -> AppResult<Vec<Child>>;
    async fn update_child(&self, child: &Child) -> AppResult<()>;

    /// Remove a child owned by `account_id`.
    ///
    /// If it was the account's last child, the account is removed in the
    /// same operation together with its drivers, their vehicles and its
    /// sessions. Returns `true` in that case. Fails with `NotFound` when the
    /// child does not exist or belongs to someone else.
    async fn delete_child(&self, child_id: Uuid, account_id: Uuid) -> AppResult<bool>;

    // Drivers & vehicles
    /// A driver is always created with its first vehicle.
    async fn insert_driver(&self, driver: &Driver, vehicle: &Vehicle) -> AppResult<()>;
    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;
    async fn list_drivers(&self, account_id: Uuid) -> AppResult<Vec<Driver>>;
    async fn update_driver(&self, driver: &Driver) -> AppResult<()>;
    /// Removes the driver and every vehicle registered under them.
    async fn delete_driver(&self, id: Uuid) -> AppResult<()>;

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()>;
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self, driver_id: Uuid) -> AppResult<Vec<Vehicle>>;
    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()>;

    // Locations (append-only)
    async fn insert_location(&self, sample: &LocationSample) -> AppResult<()>;
    async fn latest_location(&self, vehicle_id: Uuid) -> AppResult<Option<LocationSample>>;
    /// Oldest first.
    async fn list_locations(&self, vehicle_id: Uuid) -> AppResult<Vec<LocationSample>>;

    // Sessions
    async fn insert_session(&self, session: &Session) -> AppResult<()>;
    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>>;
    /// Returns whether a live session was revoked. Revoking twice is fine.
    async fn revoke_session(&self, id: Uuid) -> AppResult<bool>;
}
