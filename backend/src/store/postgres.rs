use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
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

/// Postgres-backed store. Schema lives in ./migrations/.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_unique_email(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateEmail,
        _ => AppError::Database(e),
    }
}

/// Remove an account with its drivers, their vehicles and its sessions.
/// Runs inside the caller's transaction.
async fn cascade_account(tx: &mut Transaction<'_, Postgres>, account_id: Uuid) -> AppResult<()> {
    sqlx::query(
        "DELETE FROM vehicles
         WHERE driver_id IN (SELECT id FROM drivers WHERE account_id = $1)",
    )
    .bind(account_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM drivers WHERE account_id = $1")
        .bind(account_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE account_id = $1")
        .bind(account_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(account_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, name, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_email)?;
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn update_account(&self, account: &Account) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET name = $1, email = $2, password_hash = $3 WHERE id = $4",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_email)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account"));
        }
        Ok(())
    }

    async fn insert_child(&self, child: &Child) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO children (id, account_id, name, age, grade, school, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(child.id)
        .bind(child.account_id)
        .bind(&child.name)
        .bind(child.age)
        .bind(&child.grade)
        .bind(&child.school)
        .bind(child.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_child(&self, id: Uuid) -> AppResult<Option<Child>> {
        let child = sqlx::query_as::<_, Child>("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(child)
    }

    async fn list_children(&self, account_id: Uuid) -> AppResult<Vec<Child>> {
        let children = sqlx::query_as::<_, Child>(
            "SELECT * FROM children WHERE account_id = $1 ORDER BY created_at, name",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    async fn update_child(&self, child: &Child) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE children SET name = $1, age = $2, grade = $3, school = $4 WHERE id = $5",
        )
        .bind(&child.name)
        .bind(child.age)
        .bind(&child.grade)
        .bind(&child.school)
        .bind(child.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Child"));
        }
        Ok(())
    }

    async fn delete_child(&self, child_id: Uuid, account_id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM children WHERE id = $1 AND account_id = $2")
            .bind(child_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            // Dropping the transaction rolls it back.
            return Err(AppError::NotFound("Child"));
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM children WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&mut *tx)
                .await?;

        let account_deleted = remaining == 0;
        if account_deleted {
            cascade_account(&mut tx, account_id).await?;
        }

        tx.commit().await?;
        Ok(account_deleted)
    }

    async fn insert_driver(&self, driver: &Driver, vehicle: &Vehicle) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO drivers (id, account_id, name, license_number, phone_number, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(driver.id)
        .bind(driver.account_id)
        .bind(&driver.name)
        .bind(&driver.license_number)
        .bind(&driver.phone_number)
        .bind(driver.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO vehicles (id, driver_id, vin, make, model, year, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(vehicle.id)
        .bind(vehicle.driver_id)
        .bind(&vehicle.vin)
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn list_drivers(&self, account_id: Uuid) -> AppResult<Vec<Driver>> {
        let drivers = sqlx::query_as::<_, Driver>(
            "SELECT * FROM drivers WHERE account_id = $1 ORDER BY created_at, name",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(drivers)
    }

    async fn update_driver(&self, driver: &Driver) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE drivers SET name = $1, license_number = $2, phone_number = $3 WHERE id = $4",
        )
        .bind(&driver.name)
        .bind(&driver.license_number)
        .bind(&driver.phone_number)
        .bind(driver.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Driver"));
        }
        Ok(())
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM vehicles WHERE driver_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO vehicles (id, driver_id, vin, make, model, year, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(vehicle.id)
        .bind(vehicle.driver_id)
        .bind(&vehicle.vin)
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&self, driver_id: Uuid) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE driver_id = $1 ORDER BY created_at",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE vehicles SET vin = $1, make = $2, model = $3, year = $4 WHERE id = $5",
        )
        .bind(&vehicle.vin)
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vehicle"));
        }
        Ok(())
    }

    async fn insert_location(&self, sample: &LocationSample) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO location_samples (id, vehicle_id, latitude, longitude, timestamp)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sample.id)
        .bind(sample.vehicle_id)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_location(&self, vehicle_id: Uuid) -> AppResult<Option<LocationSample>> {
        let sample = sqlx::query_as::<_, LocationSample>(
            "SELECT * FROM location_samples WHERE vehicle_id = $1
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sample)
    }

    async fn list_locations(&self, vehicle_id: Uuid) -> AppResult<Vec<LocationSample>> {
        let samples = sqlx::query_as::<_, LocationSample>(
            "SELECT * FROM location_samples WHERE vehicle_id = $1 ORDER BY timestamp",
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(samples)
    }

    async fn insert_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, account_id, created_at, expires_at, revoked)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.account_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn revoke_session(&self, id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
