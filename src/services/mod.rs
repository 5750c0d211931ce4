pub mod booking;
pub mod notification;

pub use booking::BookingService;
pub use notification::{Notifier, NotifierSet, OutboundMessage};
