pub mod core;
pub mod factory;
pub mod soft_deletable;


pub use core::GenericStore;
pub use factory::RepositoryFactory;
pub use soft_deletable::SoftDeleteStore;
