//! Operation names and their argument records.
//!
//! Every remote operation has a fixed snake_case name and exactly one
//! argument record. Records serialize with camelCase field names, which is
//! the backend's invoke convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use scribe_shared::AiProvider;

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Operation names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // roster and session lifecycle
    GetUsers,
    ValidateLoginStatus,
    LogoutUser,
    // credential acquisition
    StartLoginProcess,
    SubmitVerificationCode,
    // drafts
    GetPosts,
    SavePost,
    DeletePost,
    // generic key/value config
    GetConfigValue,
    SaveConfig,
    // provider registry
    GetAiProviders,
    SaveAiProvider,
    DeleteAiProvider,
    TestAiProvider,
    TestModelChat,
    TestModelStructuredOutput,
    // inference
    GenerateAiText,
    GenerateAiImage,
    AnalyzeLocalImage,
    PolishTitleWithOptions,
    FetchUserAnalytics,
    // automation-protocol service
    GetMcpStatus,
    StartMcpServer,
    StopMcpServer,
    // HTTP API service
    GetApiStatus,
    StartApiServer,
    StopApiServer,
    GetApiKey,
    SaveApiKey,
    GenerateApiKey,
    // misc pass-through
    GetTrends,
    ListLocalImages,
    ImportLocalImages,
    DeleteLocalImage,
    PublishPost,
}

impl Operation {
    pub const ALL: [Operation; 35] = [
        Self::GetUsers,
        Self::ValidateLoginStatus,
        Self::LogoutUser,
        Self::StartLoginProcess,
        Self::SubmitVerificationCode,
        Self::GetPosts,
        Self::SavePost,
        Self::DeletePost,
        Self::GetConfigValue,
        Self::SaveConfig,
        Self::GetAiProviders,
        Self::SaveAiProvider,
        Self::DeleteAiProvider,
        Self::TestAiProvider,
        Self::TestModelChat,
        Self::TestModelStructuredOutput,
        Self::GenerateAiText,
        Self::GenerateAiImage,
        Self::AnalyzeLocalImage,
        Self::PolishTitleWithOptions,
        Self::FetchUserAnalytics,
        Self::GetMcpStatus,
        Self::StartMcpServer,
        Self::StopMcpServer,
        Self::GetApiStatus,
        Self::StartApiServer,
        Self::StopApiServer,
        Self::GetApiKey,
        Self::SaveApiKey,
        Self::GenerateApiKey,
        Self::GetTrends,
        Self::ListLocalImages,
        Self::ImportLocalImages,
        Self::DeleteLocalImage,
        Self::PublishPost,
    ];

    /// The wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetUsers => "get_users",
            Self::ValidateLoginStatus => "validate_login_status",
            Self::LogoutUser => "logout_user",
            Self::StartLoginProcess => "start_login_process",
            Self::SubmitVerificationCode => "submit_verification_code",
            Self::GetPosts => "get_posts",
            Self::SavePost => "save_post",
            Self::DeletePost => "delete_post",
            Self::GetConfigValue => "get_config_value",
            Self::SaveConfig => "save_config",
            Self::GetAiProviders => "get_ai_providers",
            Self::SaveAiProvider => "save_ai_provider",
            Self::DeleteAiProvider => "delete_ai_provider",
            Self::TestAiProvider => "test_ai_provider",
            Self::TestModelChat => "test_model_chat",
            Self::TestModelStructuredOutput => "test_model_structured_output",
            Self::GenerateAiText => "generate_ai_text",
            Self::GenerateAiImage => "generate_ai_image",
            Self::AnalyzeLocalImage => "analyze_local_image",
            Self::PolishTitleWithOptions => "polish_title_with_options",
            Self::FetchUserAnalytics => "fetch_user_analytics",
            Self::GetMcpStatus => "get_mcp_status",
            Self::StartMcpServer => "start_mcp_server",
            Self::StopMcpServer => "stop_mcp_server",
            Self::GetApiStatus => "get_api_status",
            Self::StartApiServer => "start_api_server",
            Self::StopApiServer => "stop_api_server",
            Self::GetApiKey => "get_api_key",
            Self::SaveApiKey => "save_api_key",
            Self::GenerateApiKey => "generate_api_key",
            Self::GetTrends => "get_trends",
            Self::ListLocalImages => "list_local_images",
            Self::ImportLocalImages => "import_local_images",
            Self::DeleteLocalImage => "delete_local_image",
            Self::PublishPost => "publish_post",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| GatewayError::UnknownOperation(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Argument records
// ---------------------------------------------------------------------------

/// Record for operations that take no arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoArgs {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneArgs {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationArgs {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdArgs {
    pub user_id: i64,
}

/// Draft persistence. With `post_id` set the backend updates that draft in
/// place; otherwise it inserts a new one and returns its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePostArgs {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdArgs {
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigKeyArgs {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderArgs {
    pub provider: AiProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIdArgs {
    pub id: i64,
}

/// Per-model check. The provider may be an unsaved edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTestArgs {
    pub provider: AiProvider,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTextArgs {
    pub prompt: String,
    pub system: Option<String>,
    pub provider: AiProvider,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolishTitleArgs {
    pub title: String,
    pub instruction: Option<String>,
    pub provider: AiProvider,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageArgs {
    pub prompt: String,
    pub provider: AiProvider,
    pub model_name: String,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageArgs {
    pub image_path: String,
    pub prompt: String,
    pub provider: AiProvider,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMcpArgs {
    pub port: u16,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortArgs {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyArgs {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportImagesArgs {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePathArgs {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPostArgs {
    pub phone: String,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub cover_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!(matches!(
            "greet".parse::<Operation>(),
            Err(GatewayError::UnknownOperation(_))
        ));
    }

    #[test]
    fn save_post_args_use_camel_case() {
        let args = SavePostArgs {
            user_id: 7,
            post_id: None,
            title: "t".into(),
            content: "c".into(),
            images: vec![],
            cover_image: Some("a.png".into()),
        };
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["coverImage"], "a.png");
        assert!(value.get("postId").is_none());
    }
}
