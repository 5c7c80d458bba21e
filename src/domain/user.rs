use serde::{Deserialize, Serialize};

use crate::domain::types::{EmailAddress, PersonName, PhoneNumber, PostalAddress};

/// Account details collected by the registration screen.
///
/// The password is kept out of serialization; it is only handed to the
/// authentication provider and never stored in the user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: PersonName,
    pub email: EmailAddress,
    pub phone_number: PhoneNumber,
    pub address: PostalAddress,
    #[serde(skip)]
    pub password: String,
}

/// Editable part of a user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: PersonName,
    pub email: EmailAddress,
    pub phone_number: PhoneNumber,
}

/// Credentials submitted by the login screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: EmailAddress,
    pub password: String,
}
