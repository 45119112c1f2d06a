//! Repository implementations

pub mod booking_repo;
pub mod property_repo;

pub use booking_repo::PgBookingRepository;
pub use property_repo::PgPropertyRepository;
