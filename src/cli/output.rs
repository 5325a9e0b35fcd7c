//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{DeployConfig, ValidationResult};
use crate::launch::ServerVersion;
use crate::resolver::{Artifact, ArtifactCatalog, ChangeKind, DeploymentManifest, Resolution};
use crate::store::FetchReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Catalog row for table display.
#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Versions")]
    versions: String,
}

/// Manifest row for table display.
#[derive(Tabled)]
struct ManifestRow {
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Version")]
    version: u32,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Deployed")]
    previous: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Change")]
    kind: String,
}

fn show_version(version: Option<u32>) -> String {
    version.map_or_else(|| String::from("-"), |v| format!("v{v}"))
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true when producing machine readable output.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Formats the published layers.
    #[must_use]
    pub fn format_catalog(&self, catalog: &ArtifactCatalog) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "layers": catalog.iter().collect::<BTreeMap<_, _>>(),
                "latest": catalog.latest_view(),
            })),
            OutputFormat::Text => {
                if catalog.is_empty() {
                    return String::from("No layers published.\n");
                }

                let rows: Vec<CatalogRow> = catalog
                    .iter()
                    .map(|(layer, versions)| CatalogRow {
                        layer: layer.to_string(),
                        latest: show_version(versions.last().copied()),
                        versions: versions
                            .iter()
                            .map(u32::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                let _ = write!(output, "\n\n{} layers published.\n", catalog.layer_count());
                output
            }
        }
    }

    /// Formats the list of stored deployments.
    #[must_use]
    pub fn format_deployments(&self, names: &[String]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "deployments": names })),
            OutputFormat::Text => {
                if names.is_empty() {
                    return String::from("No deployments stored.\n");
                }

                let mut output = String::new();
                for name in names {
                    let _ = writeln!(output, "{name}");
                }
                output
            }
        }
    }

    /// Formats a stored manifest.
    #[must_use]
    pub fn format_manifest(&self, name: &str, manifest: &DeploymentManifest) -> String {
        match self.format {
            OutputFormat::Json => to_json(manifest),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nDeployment: {}", name.bold());
                let _ = writeln!(output, "   Fingerprint: {}\n", &manifest.fingerprint()[..12]);
                output.push_str(&Self::manifest_table(manifest));
                output
            }
        }
    }

    fn manifest_table(manifest: &DeploymentManifest) -> String {
        if manifest.is_empty() {
            return String::from("   (no layers)\n");
        }

        let rows: Vec<ManifestRow> = manifest
            .data
            .iter()
            .map(|(layer, version)| ManifestRow {
                layer: layer.clone(),
                version: *version,
            })
            .collect();

        let mut table = Table::new(rows).to_string();
        table.push('\n');
        table
    }

    /// Formats a resolution before it is stored.
    #[must_use]
    pub fn format_resolution(&self, name: &str, resolution: &Resolution) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "name": name,
                "manifest": resolution.manifest,
                "fingerprint": resolution.manifest.fingerprint(),
                "changes": resolution.changes,
                "warnings": resolution.warnings,
                "matches_base": resolution.matches_base(),
            })),
            OutputFormat::Text => Self::format_resolution_text(name, resolution),
        }
    }

    fn format_resolution_text(name: &str, resolution: &Resolution) -> String {
        let mut output = String::new();

        if !resolution.changes.is_empty() {
            output.push_str(
                "\nThe base deployment differs from the latest published layers:\n",
            );
            let rows: Vec<ChangeRow> = resolution
                .changes
                .iter()
                .map(|c| ChangeRow {
                    layer: c.layer.clone(),
                    previous: show_version(c.previous),
                    latest: show_version(c.latest),
                    kind: Self::format_change_kind(c.kind()),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let _ = writeln!(output, "\nDeployment: {}", name.bold());
        let _ = writeln!(
            output,
            "   Fingerprint: {}\n",
            &resolution.manifest.fingerprint()[..12]
        );
        output.push_str(&Self::manifest_table(&resolution.manifest));

        if resolution.matches_base() {
            let _ = write!(
                output,
                "\n{} Identical to the base deployment.\n",
                "i".cyan()
            );
        }

        if !resolution.warnings.is_empty() {
            let _ = write!(output, "\n{} Unpublished versions:\n", "!".yellow());
            for warning in &resolution.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output
    }

    /// Formats a change kind with color.
    fn format_change_kind(kind: ChangeKind) -> String {
        match kind {
            ChangeKind::New => "new".green().to_string(),
            ChangeKind::Missing => "missing".red().to_string(),
            ChangeKind::Changed => "changed".yellow().to_string(),
        }
    }

    /// Formats the result of storing a deployment.
    #[must_use]
    pub fn format_saved(&self, name: &str, key: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "name": name, "key": key })),
            OutputFormat::Text => format!("{} Deployment {name} stored at {key}\n", "✓".green()),
        }
    }

    /// Formats newly published artifacts.
    #[must_use]
    pub fn format_published(&self, artifacts: &[Artifact]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "published": artifacts })),
            OutputFormat::Text => {
                let mut output = String::new();
                for artifact in artifacts {
                    let _ = writeln!(output, "{} Published {artifact}", "✓".green());
                }
                output
            }
        }
    }

    /// Formats a fetched deployment.
    #[must_use]
    pub fn format_fetch(&self, name: &str, report: &FetchReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "name": name,
                "manifest_path": report.manifest_path,
                "artifacts": report.artifacts,
            })),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Fetched {name} ({} layers)\n",
                    "✓".green(),
                    report.artifacts.len()
                );
                let _ = writeln!(output, "   Manifest: {}", report.manifest_path.display());
                for artifact in &report.artifacts {
                    let _ = writeln!(output, "   - {artifact}");
                }
                output
            }
        }
    }

    /// Formats a launched stack.
    #[must_use]
    pub fn format_launch(&self, stack_id: &str, server_version: &ServerVersion) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "stack_id": stack_id,
                "server_version": server_version.as_str(),
            })),
            OutputFormat::Text => format!(
                "{} Stack {stack_id} created (server {server_version})\n",
                "✓".green()
            ),
        }
    }

    /// Formats a configuration validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &DeployConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
                "storage": config.storage.location(),
                "launch_region": config.launch.region,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid!\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    output.push_str("\nWarnings:\n");
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "  Storage: {}", config.storage.location());
                let _ = writeln!(output, "  Name format: {}", config.deployment.name_format);
                let _ = writeln!(output, "  Launch region: {}", config.launch.region);
                output
            }
        }
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "status": "warning", "message": message })),
            OutputFormat::Text => format!("{} {message}", "!".yellow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DeploymentResolver, ResolutionMode};

    fn catalog() -> ArtifactCatalog {
        [
            Artifact::new("roads", 1),
            Artifact::new("roads", 2),
            Artifact::new("rivers", 1),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_catalog_text() {
        let output = OutputFormatter::new(OutputFormat::Text).format_catalog(&catalog());
        assert!(output.contains("roads"));
        assert!(output.contains("1, 2"));
        assert!(output.contains("2 layers published."));
    }

    #[test]
    fn test_catalog_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_catalog(&catalog());
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["latest"]["roads"], 2);
        assert_eq!(value["layers"]["roads"], json!([1, 2]));
    }

    #[test]
    fn test_manifest_json_is_stored_shape() {
        let manifest: DeploymentManifest =
            [(String::from("roads"), 2)].into_iter().collect();
        let output = OutputFormatter::new(OutputFormat::Json).format_manifest("prod", &manifest);
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value, json!({ "data": { "roads": 2 } }));
    }

    #[test]
    fn test_resolution_json() {
        let manifest: DeploymentManifest =
            [(String::from("roads"), 1), (String::from("parks"), 3)].into_iter().collect();
        let resolution = DeploymentResolver::new()
            .resolve(
                &catalog(),
                &ResolutionMode::from_previous("prod", "", "").expect("valid"),
                Some(&manifest),
            )
            .expect("base exists");

        let output =
            OutputFormatter::new(OutputFormat::Json).format_resolution("next", &resolution);
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");

        assert_eq!(value["matches_base"], true);
        assert_eq!(value["warnings"][0]["layer"], "parks");
        assert_eq!(value["changes"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_resolution_text_lists_warnings() {
        let resolution = DeploymentResolver::new()
            .resolve(
                &catalog(),
                &ResolutionMode::explicit("roads:7").expect("valid"),
                None,
            )
            .expect("explicit layers");

        let output =
            OutputFormatter::new(OutputFormat::Text).format_resolution("next", &resolution);
        assert!(output.contains("roads v7 is not published"));
    }

    #[test]
    fn test_empty_lists() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        assert_eq!(formatter.format_deployments(&[]), "No deployments stored.\n");
        assert_eq!(
            formatter.format_catalog(&ArtifactCatalog::new()),
            "No layers published.\n"
        );
    }
}
