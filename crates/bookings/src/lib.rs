//! Bookings domain module (reservations).

pub mod reservation;

pub use reservation::{
    NewReservation, Reservation, ReservationPatch, ReservationStatus, ReservationType,
    ValidReservation,
};
