//! Placeholder substitution for the stack template and instance user data.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Placeholder for the stack (and deployment) name in user data.
pub const STACK_NAME_PLACEHOLDER: &str = "{~STACK NAME~}";

/// Placeholder for the server bundle version in user data.
pub const SERVER_VERSION_PLACEHOLDER: &str = "{~SERVER VERSION~}";

/// Placeholder for the encoded user data in the stack template.
pub const USER_DATA_PLACEHOLDER: &str = "{~BASE64 USER DATA~}";

/// Fills the user-data script for an instance serving `stack_name`.
#[must_use]
pub fn render_user_data(template: &str, stack_name: &str, server_version: &str) -> String {
    template
        .replace(STACK_NAME_PLACEHOLDER, stack_name)
        .replace(SERVER_VERSION_PLACEHOLDER, server_version)
}

/// Embeds rendered user data, base64 encoded, into the stack template.
#[must_use]
pub fn render_template(template: &str, user_data: &str) -> String {
    template.replace(USER_DATA_PLACEHOLDER, &STANDARD.encode(user_data))
}
