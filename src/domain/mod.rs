pub mod intent;
pub mod member;
pub mod membership;
pub mod payment;
pub mod program;
pub mod user;

pub use intent::*;
pub use member::*;
pub use membership::*;
pub use payment::*;
pub use program::*;
pub use user::*;
