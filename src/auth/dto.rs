use serde::{Deserialize, Serialize};

/// Login form. `identifier` is a username or an email.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotForm {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetForm {
    pub password: String,
}

/// Context of the account forms: empty on GET, a message after a rejected POST.
#[derive(Debug, Default, Serialize)]
pub struct FormContext {
    pub message: Option<String>,
}

impl FormContext {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            message: Some(msg.into()),
        }
    }
}
