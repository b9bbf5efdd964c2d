//! The `TrainingPlatform` trait -- the adapter interface for training
//! services that store workouts and a calendar.
//!
//! The trait is intentionally object-safe so callers can hold a
//! `Box<dyn TrainingPlatform>` and swap the real service for an in-memory
//! fake in tests.

mod garmin;

pub use garmin::{GarminConnect, months_between};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from a training platform backend.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: {detail}")]
    BadResponse { detail: String },
}

/// A workout as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: u64,
    pub name: String,
    pub sport: Option<String>,
}

/// A calendar entry pointing at a scheduled workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    /// Schedule entry ID, used to unschedule.
    pub id: u64,
    pub workout_id: Option<u64>,
    pub title: String,
    pub date: NaiveDate,
}

/// Adapter interface for a service holding workouts and a calendar.
///
/// Workout payloads travel as raw JSON values in the service's own DTO
/// shape; the compiler produces them and `export` passes them through.
#[async_trait]
pub trait TrainingPlatform: Send + Sync {
    /// List all stored workouts.
    async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>, PlatformError>;

    /// Fetch the full JSON payload of one workout.
    async fn get_workout(&self, id: u64) -> Result<Value, PlatformError>;

    /// Create a workout from a JSON payload, returning its summary.
    async fn create_workout(&self, payload: &Value) -> Result<WorkoutSummary, PlatformError>;

    /// Replace an existing workout's payload.
    async fn update_workout(&self, id: u64, payload: &Value) -> Result<(), PlatformError>;

    /// Delete a workout.
    async fn delete_workout(&self, id: u64) -> Result<(), PlatformError>;

    /// Put a workout on the calendar at `date`.
    async fn schedule_workout(&self, id: u64, date: NaiveDate) -> Result<(), PlatformError>;

    /// Remove one calendar entry by its schedule ID.
    async fn unschedule_workout(&self, schedule_id: u64) -> Result<(), PlatformError>;

    /// Workout entries on the calendar for one month.
    async fn calendar(&self, year: i32, month: u32) -> Result<Vec<CalendarItem>, PlatformError>;
}

// Compile-time assertion: the trait must stay object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TrainingPlatform) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyPlatform;

    #[async_trait]
    impl TrainingPlatform for EmptyPlatform {
        async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>, PlatformError> {
            Ok(Vec::new())
        }

        async fn get_workout(&self, id: u64) -> Result<Value, PlatformError> {
            Err(PlatformError::Api {
                status: 404,
                body: format!("no workout {id}"),
            })
        }

        async fn create_workout(&self, payload: &Value) -> Result<WorkoutSummary, PlatformError> {
            Ok(WorkoutSummary {
                id: 1,
                name: payload["workoutName"].as_str().unwrap_or("").to_owned(),
                sport: None,
            })
        }

        async fn update_workout(&self, _id: u64, _payload: &Value) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn delete_workout(&self, _id: u64) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn schedule_workout(&self, _id: u64, _date: NaiveDate) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn unschedule_workout(&self, _schedule_id: u64) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn calendar(&self, _year: i32, _month: u32) -> Result<Vec<CalendarItem>, PlatformError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn platform_is_object_safe() {
        let platform: Box<dyn TrainingPlatform> = Box::new(EmptyPlatform);
        drop(platform);
    }

    #[tokio::test]
    async fn empty_platform_round_trip() {
        let platform: Box<dyn TrainingPlatform> = Box::new(EmptyPlatform);
        assert!(platform.list_workouts().await.unwrap().is_empty());
        let created = platform
            .create_workout(&serde_json::json!({ "workoutName": "W01S01 Easy" }))
            .await
            .unwrap();
        assert_eq!(created.name, "W01S01 Easy");
        assert!(matches!(
            platform.get_workout(7).await.unwrap_err(),
            PlatformError::Api { status: 404, .. }
        ));
    }
}
