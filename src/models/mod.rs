mod account;
pub(crate) mod bytes;
mod certificate;

pub use account::{Account, KeyType, Registration, RegistrationBody};
pub use certificate::{CertificateBundle, Domain};
