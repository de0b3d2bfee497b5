pub mod credits;
pub mod entry;
pub mod listing;
pub mod request;
pub mod validation;

pub use credits::*;
pub use entry::*;
pub use listing::*;
pub use request::*;
pub use validation::*;
