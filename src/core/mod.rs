pub mod bookings;
pub mod messaging;
pub mod notifications;
pub mod realtime;
pub mod retry;
pub mod rooms;
pub mod slots;
pub mod traits;
