pub mod booking;
pub mod notification;

pub use booking::{
    Booking, BookingDay, BookingSnapshot, BookingStatus, CreateBooking, CreateBookingDay,
    PaymentStatus, UpdateBookingPayment, UpdateBookingStatus,
};
pub use notification::{
    Channel, DeliveryOutcome, NotificationEvent, NotificationEventStatus, NotificationKind,
    NotificationRecord, NotificationStatusView, RecordStatus,
};
