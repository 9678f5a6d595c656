//! Repository implementations using SeaORM

pub mod author_repository;
pub mod book_repository;
pub mod edition_repository;
pub mod tag_repository;
pub mod user_repository;

pub use author_repository::SeaOrmAuthorRepository;
pub use book_repository::SeaOrmBookRepository;
pub use edition_repository::SeaOrmEditionRepository;
pub use tag_repository::SeaOrmTagRepository;
pub use user_repository::SeaOrmUserRepository;
