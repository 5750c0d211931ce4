use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Status Enums
// =============================================================================

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Quoted,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Quoted => write!(f, "quoted"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of an advance or final payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// A payment counts as settled once it is paid or approved.
    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Approved)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Approved => write!(f, "approved"),
            PaymentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

// =============================================================================
// Booking Models
// =============================================================================

/// Booking model for reading from the database.
///
/// The notification engine consumes bookings read-only; eligibility is
/// re-derived from these fields on every scheduling pass, never cached.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: BookingStatus,
    pub advance_payment_status: PaymentStatus,
    pub final_payment_status: Option<PaymentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One service day of a booking; position 0 is the canonical event day.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingDay {
    pub id: i32,
    pub booking_id: Uuid,
    pub day_date: NaiveDate,
    pub appointment_time: Option<NaiveTime>,
    pub position: i32,
}

/// A booking together with its ordered service days, as read in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSnapshot {
    #[serde(flatten)]
    pub booking: Booking,
    pub days: Vec<BookingDay>,
}

impl BookingSnapshot {
    /// The canonical event day (first service day), if any.
    pub fn event_day(&self) -> Option<&BookingDay> {
        self.days.first()
    }

    pub fn event_date(&self) -> Option<NaiveDate> {
        self.event_day().map(|d| d.day_date)
    }

    pub fn appointment_time(&self) -> Option<NaiveTime> {
        self.event_day().and_then(|d| d.appointment_time)
    }
}

// =============================================================================
// DTOs
// =============================================================================

/// DTO for creating a booking
#[derive(Debug, Deserialize)]
pub struct CreateBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(default = "default_status")]
    pub status: BookingStatus,
    #[serde(default)]
    pub days: Vec<CreateBookingDay>,
}

fn default_status() -> BookingStatus {
    BookingStatus::Quoted
}

/// DTO for one service day of a new booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub appointment_time: Option<NaiveTime>,
}

/// DTO for a booking status transition
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatus {
    pub status: BookingStatus,
}

/// DTO for a payment status change
#[derive(Debug, Deserialize)]
pub struct UpdateBookingPayment {
    pub advance_payment_status: Option<PaymentStatus>,
    pub final_payment_status: Option<PaymentStatus>,
}
