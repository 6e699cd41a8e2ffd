pub mod repository;
pub mod service;

pub use repository::{MemUserRepository, RepoError, UserRepository};
pub use service::{DefaultUserService, UserService};
