pub mod booking;
pub mod cabin;
pub mod flight;
pub mod user;
