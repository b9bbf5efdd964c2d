//! Garmin Connect backend for [`TrainingPlatform`].
//!
//! A thin transport over the `workout-service` and `calendar-service`
//! endpoints. Authentication is a pre-obtained OAuth bearer token; there is
//! no retry or backoff here, callers decide what to do on failure.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Response;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{CalendarItem, PlatformError, TrainingPlatform, WorkoutSummary};

const DEFAULT_BASE_URL: &str = "https://connectapi.garmin.com";

/// Garmin Connect API client.
pub struct GarminConnect {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GarminConnect {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host (test servers).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn checked(response: Response) -> Result<Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PlatformError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkoutRow {
    workout_id: u64,
    workout_name: String,
    sport_type: Option<SportRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SportRow {
    sport_type_key: String,
}

impl From<WorkoutRow> for WorkoutSummary {
    fn from(row: WorkoutRow) -> Self {
        Self {
            id: row.workout_id,
            name: row.workout_name,
            sport: row.sport_type.map(|s| s.sport_type_key),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarPage {
    #[serde(default)]
    calendar_items: Vec<CalendarRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarRow {
    id: u64,
    #[serde(default)]
    workout_id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    item_type: Option<String>,
    date: NaiveDate,
}

#[async_trait]
impl TrainingPlatform for GarminConnect {
    async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>, PlatformError> {
        debug!("listing workouts");
        let response = self
            .request(
                reqwest::Method::GET,
                "/workout-service/workouts?start=0&limit=999",
            )
            .send()
            .await?;
        let rows: Vec<WorkoutRow> = Self::checked(response).await?.json().await?;
        Ok(rows.into_iter().map(WorkoutSummary::from).collect())
    }

    async fn get_workout(&self, id: u64) -> Result<Value, PlatformError> {
        debug!(id, "fetching workout");
        let response = self
            .request(reqwest::Method::GET, &format!("/workout-service/workout/{id}"))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn create_workout(&self, payload: &Value) -> Result<WorkoutSummary, PlatformError> {
        debug!("creating workout");
        let response = self
            .request(reqwest::Method::POST, "/workout-service/workout")
            .json(payload)
            .send()
            .await?;
        let row: WorkoutRow = Self::checked(response).await?.json().await?;
        Ok(row.into())
    }

    async fn update_workout(&self, id: u64, payload: &Value) -> Result<(), PlatformError> {
        debug!(id, "updating workout");
        let response = self
            .request(reqwest::Method::PUT, &format!("/workout-service/workout/{id}"))
            .json(payload)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn delete_workout(&self, id: u64) -> Result<(), PlatformError> {
        debug!(id, "deleting workout");
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/workout-service/workout/{id}"),
            )
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn schedule_workout(&self, id: u64, date: NaiveDate) -> Result<(), PlatformError> {
        debug!(id, %date, "scheduling workout");
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/workout-service/schedule/{id}"),
            )
            .json(&json!({ "date": date.to_string() }))
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn unschedule_workout(&self, schedule_id: u64) -> Result<(), PlatformError> {
        debug!(schedule_id, "unscheduling workout");
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/workout-service/schedule/{schedule_id}"),
            )
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn calendar(&self, year: i32, month: u32) -> Result<Vec<CalendarItem>, PlatformError> {
        if !(1..=12).contains(&month) {
            return Err(PlatformError::BadResponse {
                detail: format!("month {month} out of range"),
            });
        }
        debug!(year, month, "fetching calendar month");
        // The calendar service counts months from zero.
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/calendar-service/year/{year}/month/{}", month - 1),
            )
            .send()
            .await?;
        let page: CalendarPage = Self::checked(response).await?.json().await?;
        Ok(page
            .calendar_items
            .into_iter()
            .filter(|row| row.item_type.as_deref() == Some("workout"))
            .map(|row| CalendarItem {
                id: row.id,
                workout_id: row.workout_id,
                title: row.title.unwrap_or_default(),
                date: row.date,
            })
            .collect())
    }
}

/// Months touched by the date range `[start, end]`, in order, as
/// `(year, month)` pairs for [`TrainingPlatform::calendar`].
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn months_between_spans_year_boundaries() {
        assert_eq!(
            months_between(date(2024, 11, 15), date(2025, 2, 1)),
            vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]
        );
        assert_eq!(months_between(date(2024, 3, 1), date(2024, 3, 31)), vec![(2024, 3)]);
        assert!(months_between(date(2024, 5, 1), date(2024, 4, 30)).is_empty());
    }

    #[test]
    fn workout_rows_deserialize_from_garmin_shape() {
        let rows: Vec<WorkoutRow> = serde_json::from_value(json!([
            {
                "workoutId": 123,
                "workoutName": "W01S01 Easy run",
                "sportType": { "sportTypeId": 1, "sportTypeKey": "running" }
            },
            { "workoutId": 456, "workoutName": "Unsorted" }
        ]))
        .unwrap();
        let summaries: Vec<WorkoutSummary> = rows.into_iter().map(Into::into).collect();
        assert_eq!(summaries[0].id, 123);
        assert_eq!(summaries[0].sport.as_deref(), Some("running"));
        assert_eq!(summaries[1].sport, None);
    }

    #[test]
    fn calendar_page_keeps_only_workout_items() {
        let page: CalendarPage = serde_json::from_value(json!({
            "calendarItems": [
                {
                    "id": 1,
                    "itemType": "workout",
                    "workoutId": 99,
                    "title": "W01S01 Easy run",
                    "date": "2024-03-19"
                },
                { "id": 2, "itemType": "activity", "date": "2024-03-20" }
            ]
        }))
        .unwrap();
        let items: Vec<CalendarItem> = page
            .calendar_items
            .into_iter()
            .filter(|row| row.item_type.as_deref() == Some("workout"))
            .map(|row| CalendarItem {
                id: row.id,
                workout_id: row.workout_id,
                title: row.title.unwrap_or_default(),
                date: row.date,
            })
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].workout_id, Some(99));
        assert_eq!(items[0].date, date(2024, 3, 19));
    }
}
