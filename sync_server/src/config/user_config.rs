use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ADMIN_NAME, TOKEN_LENGTH};

/// Token to identity table. Issuing tokens is out of scope, they are simply
/// listed in the configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserConfig {
    #[serde(default = "default_users")]
    pub user_tokens: Vec<User>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub token: String,

    /// Shown to collaborators, falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str { self.display_name.as_deref().unwrap_or(&self.name) }
}

impl UserConfig {
    pub fn get_user(&self, token: &str) -> Option<&User> {
        self.user_tokens.iter().find(|user| user.token == token)
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            user_tokens: default_users(),
        }
    }
}

fn default_users() -> Vec<User> {
    vec![User {
        name: DEFAULT_ADMIN_NAME.to_owned(),
        token: get_random_token(),
        display_name: None,
    }]
}

pub fn get_random_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
