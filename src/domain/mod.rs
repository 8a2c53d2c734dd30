pub mod outcome;
pub mod request;
pub mod stage;
pub mod status;

pub use outcome::*;
pub use request::*;
pub use stage::*;
pub use status::*;
