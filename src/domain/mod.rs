pub mod book;
pub mod commands;
pub mod reservation;
pub mod validation;
pub mod value_objects;

pub use book::Book;
pub use reservation::{
    AvailabilityChange, Reservation, ReservationChanges, ReservationTransition, ReserveBookRecord,
};
pub use validation::ValidationErrors;
pub use value_objects::*;
