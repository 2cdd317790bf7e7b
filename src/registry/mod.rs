pub mod blacklist;
pub mod clients;
pub mod registration;

pub use blacklist::Blacklist;
pub use clients::ClientRegistry;
pub use registration::RegistrationSet;
