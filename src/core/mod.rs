pub mod id_generator;
pub mod types;

pub use id_generator::IdGenerator;
pub use types::{current_time_millis, UserId};
