//! TemplateConfig - template.yaml model and template types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tcex_shared::{is_semver, InvalidTemplateTypeError, TcexError};

/// Kind of App a template builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateType {
    ApiService,
    External,
    FeedApiService,
    Organization,
    Playbook,
    Tie,
    TriggerService,
    WebhookTriggerService,
}

impl TemplateType {
    /// Every template type, in listing order
    pub const ALL: [TemplateType; 8] = [
        TemplateType::ApiService,
        TemplateType::External,
        TemplateType::FeedApiService,
        TemplateType::Organization,
        TemplateType::Playbook,
        TemplateType::Tie,
        TemplateType::TriggerService,
        TemplateType::WebhookTriggerService,
    ];

    /// Directory name of the type in the template repository
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::ApiService => "api_service",
            TemplateType::External => "external",
            TemplateType::FeedApiService => "feed_api_service",
            TemplateType::Organization => "organization",
            TemplateType::Playbook => "playbook",
            TemplateType::Tie => "tie",
            TemplateType::TriggerService => "trigger_service",
            TemplateType::WebhookTriggerService => "webhook_trigger_service",
        }
    }

    /// Display title used in listings
    pub fn title(&self) -> &'static str {
        match self {
            TemplateType::ApiService => "API Service",
            TemplateType::External => "External",
            TemplateType::FeedApiService => "Feed API Service",
            TemplateType::Organization => "Organization",
            TemplateType::Playbook => "Playbook",
            TemplateType::Tie => "TIE",
            TemplateType::TriggerService => "Trigger Service",
            TemplateType::WebhookTriggerService => "Webhook Trigger Service",
        }
    }

    /// Prefix for generated App names
    pub fn app_prefix(&self) -> Option<&'static str> {
        match self {
            TemplateType::ApiService => Some("tcva"),
            TemplateType::FeedApiService => Some("tcvf"),
            TemplateType::Organization => Some("tc"),
            TemplateType::Playbook => Some("tcpb"),
            TemplateType::TriggerService => Some("tcvc"),
            TemplateType::WebhookTriggerService => Some("tcvw"),
            TemplateType::External | TemplateType::Tie => None,
        }
    }

    /// Names of all template types
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = InvalidTemplateTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| InvalidTemplateTypeError {
                given: s.to_string(),
                valid: Self::names(),
            })
    }
}

/// template.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub contributor: String,
    pub description: String,

    /// Injected from the template directory name
    #[serde(default)]
    pub name: String,

    pub summary: String,

    #[serde(default)]
    pub template_files: Option<Vec<String>>,

    #[serde(default)]
    pub template_parents: Vec<String>,

    /// Injected from the type directory name
    #[serde(rename = "type", default)]
    pub template_type: String,

    pub version: String,
}

impl TemplateConfig {
    /// Parse template.yaml content for the template `name` of `template_type`
    pub fn from_yaml(content: &str, name: &str, template_type: &str) -> tcex_shared::Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.name = name.to_string();
        config.template_type = template_type.to_string();

        if !is_semver(&config.version) {
            return Err(TcexError::Template(format!(
                "Invalid version '{}' for template '{}'",
                config.version, name
            )));
        }
        Ok(config)
    }

    /// Command that creates a project from this template
    pub fn install_command(&self) -> String {
        format!(
            "tcex init --type {} --template {}",
            self.template_type, self.name
        )
    }
}
