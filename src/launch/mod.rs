//! Launching a stack that serves a deployment.
//!
//! - Server bundle discovery and ordering
//! - Template and user-data rendering
//! - `CloudFormation` stack creation

mod server;
mod stack;
mod template;

pub use server::ServerVersion;
pub use stack::{select_server_version, StackLauncher, StackRequest};
pub use template::{
    render_template, render_user_data, SERVER_VERSION_PLACEHOLDER, STACK_NAME_PLACEHOLDER,
    USER_DATA_PLACEHOLDER,
};
