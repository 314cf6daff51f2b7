pub mod bookings;

pub use bookings::BookingStore;
