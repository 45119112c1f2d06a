//! Domain models for CasaStay
//!
//! This module contains all the core domain models used throughout the engine.

pub mod booking;
pub mod event;
pub mod payment;
pub mod property;

pub use booking::{
    Booking, BookingRecord, BookingRequest, BookingRuleViolation, BookingStatus, TransitionError,
};
pub use event::{event_types, DomainEvent};
pub use payment::{Payment, PaymentStatus};
pub use property::Property;
