use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::domain::types::{
    EmailAddress, PersonName, PhoneNumber, PostalAddress, TypeConstraintError,
};
use crate::domain::user::{Credentials, NewUser, UserProfile};

fn require_password(value: String, field: &'static str) -> Result<String, TypeConstraintError> {
    if value.trim().is_empty() {
        return Err(TypeConstraintError::EmptyString(field));
    }
    Ok(value)
}

#[derive(Deserialize, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub confirm_password: String,
    #[validate(length(min = 1))]
    pub address: String,
}

#[derive(Debug, Error)]
pub enum RegistrationFormError {
    #[error("Registration form validation failed: {0}")]
    Validation(String),
    #[error("Registration form contains invalid data: {0}")]
    TypeConstraint(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
}

impl From<ValidationErrors> for RegistrationFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for RegistrationFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<RegistrationForm> for NewUser {
    type Error = RegistrationFormError;

    fn try_from(value: RegistrationForm) -> Result<Self, Self::Error> {
        value.validate()?;
        let full_name = PersonName::new(value.full_name)?;
        let email = EmailAddress::new(value.email)?;
        let phone_number = PhoneNumber::new(value.phone_number)?;
        let password = require_password(value.password, "password")?;
        let confirm_password = require_password(value.confirm_password, "confirm password")?;
        let address = PostalAddress::new(value.address)?;

        if password != confirm_password {
            return Err(RegistrationFormError::PasswordMismatch);
        }

        Ok(NewUser {
            full_name,
            email,
            phone_number,
            address,
            password,
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
}

#[derive(Debug, Error)]
pub enum ProfileFormError {
    #[error("Profile form validation failed: {0}")]
    Validation(String),
    #[error("Profile form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<ValidationErrors> for ProfileFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for ProfileFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<ProfileForm> for UserProfile {
    type Error = ProfileFormError;

    fn try_from(value: ProfileForm) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(UserProfile {
            full_name: PersonName::new(value.full_name)?,
            email: EmailAddress::new(value.email)?,
            phone_number: PhoneNumber::new(value.phone_number)?,
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Error)]
pub enum LoginFormError {
    #[error("Login form validation failed: {0}")]
    Validation(String),
    #[error("Login form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<ValidationErrors> for LoginFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for LoginFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<LoginForm> for Credentials {
    type Error = LoginFormError;

    fn try_from(value: LoginForm) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(Credentials {
            email: EmailAddress::new(value.email)?,
            password: require_password(value.password, "password")?,
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordForm {
    #[validate(email)]
    pub email: String,
}

impl TryFrom<ResetPasswordForm> for EmailAddress {
    type Error = LoginFormError;

    fn try_from(value: ResetPasswordForm) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(EmailAddress::new(value.email)?)
    }
}
