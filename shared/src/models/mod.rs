pub mod auth;
pub mod battle;
pub mod character;
pub mod profile;
pub mod settings;
pub mod stored;

pub use auth::*;
pub use battle::*;
pub use character::*;
pub use profile::*;
pub use settings::*;
pub use stored::*;
