pub mod book_repository;
pub mod reservation_store;
pub mod user_directory;

// パブリックに型を再エクスポート
pub use book_repository::BookRepository as PostgresBookRepository;
pub use reservation_store::ReservationStore as PostgresReservationStore;
pub use user_directory::UserDirectory as PostgresUserDirectory;
