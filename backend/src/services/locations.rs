//! Vehicle position feed.
//!
//! Positions are simulated: when a vehicle has never reported, the feed
//! invents one near a fixed reference point through a [`PositionSource`].
//! No sensor or geolocation protocol is involved.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::location::{GeoPoint, LocationSample},
    services::metrics::LOCATION_SAMPLES_COUNTER,
    store::Store,
};

/// Produces simulated positions.
pub trait PositionSource: Send + Sync {
    /// Position for a vehicle that has none on record.
    fn next_position(&self, vehicle_id: Uuid) -> GeoPoint;

    /// Simulated movement from `from` over one tracking tick.
    fn step(&self, from: GeoPoint) -> GeoPoint {
        from
    }
}

/// Simulation strategy: the reference point plus a uniform offset in
/// `[0, spread)` on each axis. Each tick moves by at most `spread / 2`
/// in either direction.
#[derive(Debug, Clone)]
pub struct JitterSource {
    reference: GeoPoint,
    spread: f64,
}

impl JitterSource {
    pub fn new(reference: GeoPoint, spread: f64) -> Self {
        Self { reference, spread }
    }
}

impl PositionSource for JitterSource {
    fn next_position(&self, _vehicle_id: Uuid) -> GeoPoint {
        if self.spread <= 0.0 || !self.spread.is_finite() {
            return self.reference;
        }
        let mut rng = rand::thread_rng();
        GeoPoint {
            latitude: self.reference.latitude + rng.gen_range(0.0..self.spread),
            longitude: self.reference.longitude + rng.gen_range(0.0..self.spread),
        }
    }

    fn step(&self, from: GeoPoint) -> GeoPoint {
        if self.spread <= 0.0 || !self.spread.is_finite() {
            return from;
        }
        let half = self.spread / 2.0;
        let mut rng = rand::thread_rng();
        GeoPoint {
            latitude: (from.latitude + rng.gen_range(-half..=half)).clamp(-90.0, 90.0),
            longitude: (from.longitude + rng.gen_range(-half..=half)).clamp(-180.0, 180.0),
        }
    }
}

#[derive(Clone)]
pub struct LocationFeed {
    store: Arc<dyn Store>,
    source: Arc<dyn PositionSource>,
}

impl LocationFeed {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn PositionSource>) -> Self {
        Self { store, source }
    }

    /// Append a new sample. History is never overwritten.
    pub async fn record(
        &self,
        vehicle_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<LocationSample> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::InvalidInput(
                "Latitude must be between -90 and 90".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::InvalidInput(
                "Longitude must be between -180 and 180".into(),
            ));
        }

        let sample = self.append(vehicle_id, latitude, longitude).await?;
        LOCATION_SAMPLES_COUNTER.with_label_values(&["recorded"]).inc();
        Ok(sample)
    }

    /// Newest sample for the vehicle.
    ///
    /// On a miss a simulated position is recorded and returned, so the feed
    /// is never empty after the first query.
    pub async fn latest(&self, vehicle_id: Uuid) -> AppResult<LocationSample> {
        if let Some(sample) = self.store.latest_location(vehicle_id).await? {
            return Ok(sample);
        }

        let point = self.source.next_position(vehicle_id);
        let sample = self
            .append(vehicle_id, point.latitude, point.longitude)
            .await?;
        LOCATION_SAMPLES_COUNTER
            .with_label_values(&["synthesized"])
            .inc();
        debug!(
            "Synthesized position for vehicle {}: {:.5}, {:.5}",
            vehicle_id, sample.latitude, sample.longitude
        );
        Ok(sample)
    }

    /// Move a displayed position by one tick of simulated drift. Nothing is recorded.
    pub fn drift(&self, from: GeoPoint) -> GeoPoint {
        self.source.step(from)
    }

    /// All samples for the vehicle, oldest first.
    pub async fn history(&self, vehicle_id: Uuid) -> AppResult<Vec<LocationSample>> {
        self.store.list_locations(vehicle_id).await
    }

    async fn append(
        &self,
        vehicle_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<LocationSample> {
        let sample = LocationSample {
            id: Uuid::new_v4(),
            vehicle_id,
            latitude,
            longitude,
            timestamp: Utc::now(),
        };
        self.store.insert_location(&sample).await?;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const REFERENCE: GeoPoint = GeoPoint {
        latitude: 40.7128,
        longitude: -74.006,
    };

    fn feed() -> LocationFeed {
        LocationFeed::new(
            Arc::new(MemoryStore::new()),
            Arc::new(JitterSource::new(REFERENCE, 0.01)),
        )
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let source = JitterSource::new(REFERENCE, 0.01);
        for _ in 0..200 {
            let p = source.next_position(Uuid::new_v4());
            assert!(p.latitude >= REFERENCE.latitude && p.latitude < REFERENCE.latitude + 0.01);
            assert!(p.longitude >= REFERENCE.longitude && p.longitude < REFERENCE.longitude + 0.01);
        }
    }

    #[test]
    fn test_zero_spread_returns_reference() {
        let source = JitterSource::new(REFERENCE, 0.0);
        assert_eq!(source.next_position(Uuid::new_v4()), REFERENCE);
        assert_eq!(source.step(REFERENCE), REFERENCE);
    }

    #[test]
    fn test_step_moves_at_most_half_spread() {
        let source = JitterSource::new(REFERENCE, 0.01);
        let mut moved = false;
        for _ in 0..200 {
            let p = source.step(REFERENCE);
            assert!((p.latitude - REFERENCE.latitude).abs() <= 0.005 + 1e-12);
            assert!((p.longitude - REFERENCE.longitude).abs() <= 0.005 + 1e-12);
            moved |= p != REFERENCE;
        }
        assert!(moved);
    }

    #[test]
    fn test_step_stays_on_the_globe() {
        let source = JitterSource::new(REFERENCE, 1.0);
        let corner = GeoPoint { latitude: 90.0, longitude: -180.0 };
        for _ in 0..50 {
            let p = source.step(corner);
            assert!((-90.0..=90.0).contains(&p.latitude));
            assert!((-180.0..=180.0).contains(&p.longitude));
        }
    }

    #[tokio::test]
    async fn test_record_appends_history() {
        let feed = feed();
        let vehicle = Uuid::new_v4();
        feed.record(vehicle, 40.0, -74.0).await.unwrap();
        let second = feed.record(vehicle, 40.1, -74.1).await.unwrap();

        assert_eq!(feed.history(vehicle).await.unwrap().len(), 2);
        assert_eq!(feed.latest(vehicle).await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_record_rejects_out_of_range() {
        let feed = feed();
        let err = feed.record(Uuid::new_v4(), 91.0, 0.0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = feed.record(Uuid::new_v4(), 0.0, f64::NAN).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_latest_synthesizes_on_miss_and_records_it() {
        let feed = feed();
        let vehicle = Uuid::new_v4();

        let first = feed.latest(vehicle).await.unwrap();
        let second = feed.latest(vehicle).await.unwrap();

        assert!(second.timestamp >= first.timestamp);
        let history = feed.history(vehicle).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first.id);
        assert!((first.latitude - REFERENCE.latitude).abs() < 0.01);
    }
}
