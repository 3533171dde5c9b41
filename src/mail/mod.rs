//! Report delivery by email.

pub mod sender;

pub use sender::Mailer;
