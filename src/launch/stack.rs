//! `CloudFormation` stack creation for a deployment.
//!
//! A stack is named after the deployment it serves. Its instances read the
//! deployment name and server bundle version from the rendered user data.

use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::Capability;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::LaunchConfig;
use crate::error::{LaunchError, Result, VtilesError};

use super::server::ServerVersion;
use super::template::{render_template, render_user_data};

/// A fully rendered stack, ready to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    /// Stack name, equal to the deployment name.
    pub stack_name: String,
    /// Server bundle the instances install.
    pub server_version: String,
    /// Template body with the user data embedded.
    pub template_body: String,
    /// Acknowledged capabilities.
    pub capabilities: Vec<String>,
}

impl StackRequest {
    /// Renders the template and user-data files from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read.
    pub async fn prepare(
        config: &LaunchConfig,
        stack_name: &str,
        server_version: &ServerVersion,
    ) -> Result<Self> {
        let user_data = read_template(&config.user_data).await?;
        let template = read_template(&config.template).await?;

        let user_data = render_user_data(&user_data, stack_name, server_version.as_str());

        Ok(Self {
            stack_name: stack_name.to_string(),
            server_version: server_version.to_string(),
            template_body: render_template(&template, &user_data),
            capabilities: config.capabilities.clone(),
        })
    }
}

async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        VtilesError::Launch(LaunchError::TemplateUnreadable {
            path: PathBuf::from(path),
            message: e.to_string(),
        })
    })
}

/// Picks the server bundle to launch.
///
/// Without a request the highest available version is used. `available`
/// is ordered newest first.
///
/// # Errors
///
/// Returns an error if no bundles exist or the requested one is missing.
pub fn select_server_version(
    available: &[ServerVersion],
    requested: Option<&str>,
) -> Result<ServerVersion> {
    let Some(latest) = available.first() else {
        return Err(VtilesError::Launch(LaunchError::NoServerVersions));
    };

    let Some(requested) = requested else {
        return Ok(latest.clone());
    };

    available
        .iter()
        .find(|v| v.as_str() == requested)
        .cloned()
        .ok_or_else(|| {
            VtilesError::Launch(LaunchError::UnknownServerVersion {
                version: requested.to_string(),
                available: available
                    .iter()
                    .map(ServerVersion::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        })
}

/// Creates `CloudFormation` stacks.
#[derive(Debug, Clone)]
pub struct StackLauncher {
    client: Client,
    region: String,
}

impl StackLauncher {
    /// Creates a launcher for `region` using the default AWS credential chain.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::with_client(Client::new(&config), region)
    }

    /// Creates a launcher with an existing client.
    #[must_use]
    pub fn with_client(client: Client, region: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
        }
    }

    /// Region stacks are created in.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Creates the stack and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if `CloudFormation` rejects the request.
    pub async fn create(&self, request: &StackRequest) -> Result<String> {
        info!(
            "Creating stack {} (server {}) in {}",
            request.stack_name, request.server_version, self.region
        );

        let token = uuid::Uuid::new_v4().to_string();
        debug!("Client request token: {}", token);

        let output = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_capabilities(Some(
                request
                    .capabilities
                    .iter()
                    .map(|c| Capability::from(c.as_str()))
                    .collect(),
            ))
            .client_request_token(token)
            .send()
            .await
            .map_err(|e| {
                VtilesError::Launch(LaunchError::CloudFormation {
                    message: format!("Failed to create stack {}: {e}", request.stack_name),
                })
            })?;

        let stack_id = output.stack_id().unwrap_or(&request.stack_name).to_string();
        info!("Stack {} created", stack_id);

        Ok(stack_id)
    }
}
