use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use urlencoding::encode;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{wall_clock, Booking, Service, Specialist, WorkingHoursOverride};

use crate::store::{BookingStore, ReserveOutcome, ScheduleStore, SlotReservation, SLOT_ALREADY_BOOKED};

const BOOKING_COLUMNS: &str = "id,clinic_id,customer_email,customer_name,service_id,service_name,specialist_id,start_time,end_time,status,slot_lock_expires_at";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

/// Row shape returned by the `reserve_slot` database function.
#[derive(Debug, Deserialize)]
struct ReserveSlotRow {
    success: bool,
    booking_id: Option<Uuid>,
    lock_expires_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.service_key.is_empty()
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(&self.service_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        if !self.is_configured() {
            return Err(anyhow!("Supabase is not configured"));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Call a Postgres function exposed under `/rest/v1/rpc`.
    pub async fn rpc<T>(&self, function: &str, params: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, None, Some(params)).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

#[async_trait]
impl BookingStore for SupabaseClient {
    async fn bookings_for_date(&self, clinic_id: &str, date: NaiveDate) -> Result<Vec<Booking>> {
        let path = format!(
            "/rest/v1/bookings?select={}&clinic_id=eq.{}&start_time=gte.{}T00:00:00&start_time=lte.{}T23:59:59&order=start_time.asc",
            BOOKING_COLUMNS,
            encode(clinic_id),
            date,
            date
        );

        let rows: Vec<Value> = self.request(Method::GET, &path, None, None).await?;

        // A malformed row cannot be placed on the timeline; it is left out
        // rather than failing the whole day.
        let bookings: Vec<Booking> = rows.into_iter()
            .filter_map(|row| {
                let id = row.get("id").cloned().unwrap_or(Value::Null);
                serde_json::from_value(row)
                    .map_err(|e| warn!("Skipping unreadable booking {} for clinic {}: {}", id, clinic_id, e))
                    .ok()
            })
            .collect();

        debug!("Fetched {} bookings for clinic {} on {}", bookings.len(), clinic_id, date);
        Ok(bookings)
    }

    async fn reserve_slot(&self, reservation: &SlotReservation) -> Result<ReserveOutcome> {
        let params = json!({
            "p_clinic_id": reservation.clinic_id,
            "p_start_time": wall_clock::format(&reservation.start_time),
            "p_end_time": wall_clock::format(&reservation.end_time),
            "p_customer_email": reservation.customer_email,
            "p_customer_name": reservation.customer_name,
            "p_service_id": reservation.service_id,
            "p_service_name": reservation.service_name,
            "p_specialist_id": reservation.specialist_id,
            "p_qualified_specialist_ids": reservation.qualified_specialist_ids,
            "p_lock_minutes": reservation.lock_minutes
        });

        let result: Value = self.rpc("reserve_slot", params).await?;

        // PostgREST returns set-returning functions as an array.
        let row = match result {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Array(_) => return Err(anyhow!("reserve_slot returned no rows")),
            other => other,
        };
        let row: ReserveSlotRow = serde_json::from_value(row)
            .map_err(|e| anyhow!("Failed to parse reserve_slot result: {}", e))?;

        if !row.success {
            return Ok(ReserveOutcome::Conflict {
                reason: row.error_message.unwrap_or_else(|| SLOT_ALREADY_BOOKED.to_string()),
            });
        }

        let booking_id = row.booking_id
            .ok_or_else(|| anyhow!("reserve_slot reported success without a booking id"))?;
        let lock_expires_at = row.lock_expires_at.unwrap_or_else(|| {
            warn!("reserve_slot did not return lock expiry, assuming {} minutes", reservation.lock_minutes);
            Utc::now() + chrono::Duration::minutes(reservation.lock_minutes)
        });

        Ok(ReserveOutcome::Reserved { booking_id, lock_expires_at })
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        let path = format!("/rest/v1/bookings?select={}&id=eq.{}&limit=1", BOOKING_COLUMNS, booking_id);
        let mut rows: Vec<Booking> = self.request(Method::GET, &path, None, None).await?;
        Ok(rows.pop())
    }

    async fn promote_booking(&self, booking_id: Uuid) -> Result<bool> {
        let path = format!("/rest/v1/bookings?id=eq.{}&status=eq.pending", booking_id);
        let update = json!({
            "status": "confirmed",
            "slot_lock_expires_at": null
        });

        let rows: Vec<Value> = self.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(update),
            Some(return_representation()),
        ).await?;

        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl ScheduleStore for SupabaseClient {
    async fn working_hours(&self, clinic_id: &str, day_of_week: u8) -> Result<Option<WorkingHoursOverride>> {
        let path = format!(
            "/rest/v1/clinic_working_hours?select=clinic_id,day_of_week,is_open,open_time,close_time&clinic_id=eq.{}&day_of_week=eq.{}&limit=1",
            encode(clinic_id),
            day_of_week
        );
        let mut rows: Vec<WorkingHoursOverride> = self.request(Method::GET, &path, None, None).await?;
        Ok(rows.pop())
    }

    async fn active_specialists(&self, clinic_id: &str) -> Result<Vec<Specialist>> {
        let path = format!(
            "/rest/v1/specialists?select=id,clinic_id,name,specialties,is_active&clinic_id=eq.{}&is_active=eq.true",
            encode(clinic_id)
        );
        self.request(Method::GET, &path, None, None).await
    }

    async fn service(&self, clinic_id: &str, service_id: &str) -> Result<Option<Service>> {
        let path = format!(
            "/rest/v1/services?clinic_id=eq.{}&id=eq.{}&limit=1",
            encode(clinic_id),
            encode(service_id)
        );
        let mut rows: Vec<Service> = self.request(Method::GET, &path, None, None).await?;
        Ok(rows.pop())
    }
}
