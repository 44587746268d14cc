pub mod toy;
pub mod user;

pub use toy::{Author, NewToy, Toy, ToyChanges, ToyFields, ToyForm};
pub use user::{User, UserRecord};
