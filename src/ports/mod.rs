pub mod book_repository;
pub mod reservation_store;
pub mod user_directory;

pub use book_repository::BookRepository;
pub use reservation_store::{ReservationStore, ReservationWithBook, WriteOutcome};
pub use user_directory::UserDirectory;
