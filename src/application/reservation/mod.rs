mod errors;
mod reservation_service;

pub use errors::{Operation, ReservationApplicationError, Result};
pub use reservation_service::{
    ServiceDependencies, cancel_reservation, create_reservation, delete_reservation,
    get_reservation, list_reservations, reserve_book, update_reservation,
};
