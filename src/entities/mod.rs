pub mod consent;
pub mod ticket;

pub use consent::Entity as Consent;
pub use ticket::Entity as Ticket;
