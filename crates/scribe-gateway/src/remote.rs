//! Typed facade over a [`Gateway`].
//!
//! One method per operation: the method builds the argument record, invokes
//! the gateway and decodes the reply into its typed result.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use scribe_shared::{
    AiProvider, ModelTestResult, Post, ServiceKind, ServiceStatus, TrendsEnvelope, User,
    UserAnalytics,
};

use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::ops::*;

#[derive(Clone)]
pub struct Remote {
    gateway: Arc<dyn Gateway>,
}

impl Remote {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    async fn call<A, R>(&self, operation: Operation, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args).map_err(|e| GatewayError::Decode {
            operation: operation.as_str(),
            message: e.to_string(),
        })?;

        debug!(op = %operation, "invoking remote operation");
        let reply = self.gateway.invoke(operation, args).await?;

        serde_json::from_value(reply).map_err(|e| GatewayError::Decode {
            operation: operation.as_str(),
            message: e.to_string(),
        })
    }

    // -- roster and session --

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.call(Operation::GetUsers, &NoArgs {}).await
    }

    pub async fn validate_login_status(&self, phone: &str) -> Result<User> {
        let args = PhoneArgs {
            phone: phone.to_string(),
        };
        self.call(Operation::ValidateLoginStatus, &args).await
    }

    pub async fn logout_user(&self, phone: &str) -> Result<()> {
        let args = PhoneArgs {
            phone: phone.to_string(),
        };
        self.call(Operation::LogoutUser, &args).await
    }

    pub async fn start_login_process(&self, phone: &str) -> Result<String> {
        let args = PhoneArgs {
            phone: phone.to_string(),
        };
        self.call(Operation::StartLoginProcess, &args).await
    }

    pub async fn submit_verification_code(&self, phone: &str, code: &str) -> Result<User> {
        let args = VerificationArgs {
            phone: phone.to_string(),
            code: code.to_string(),
        };
        self.call(Operation::SubmitVerificationCode, &args).await
    }

    // -- drafts --

    pub async fn get_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.call(Operation::GetPosts, &UserIdArgs { user_id }).await
    }

    pub async fn save_post(&self, args: &SavePostArgs) -> Result<i64> {
        self.call(Operation::SavePost, args).await
    }

    pub async fn delete_post(&self, post_id: i64) -> Result<()> {
        self.call(Operation::DeletePost, &PostIdArgs { post_id }).await
    }

    // -- config --

    pub async fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        let args = ConfigKeyArgs {
            key: key.to_string(),
        };
        self.call(Operation::GetConfigValue, &args).await
    }

    pub async fn save_config(&self, key: &str, value: &str) -> Result<()> {
        let args = SaveConfigArgs {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.call(Operation::SaveConfig, &args).await
    }

    // -- provider registry --

    pub async fn get_ai_providers(&self) -> Result<Vec<AiProvider>> {
        self.call(Operation::GetAiProviders, &NoArgs {}).await
    }

    pub async fn save_ai_provider(&self, provider: &AiProvider) -> Result<i64> {
        let args = ProviderArgs {
            provider: provider.clone(),
        };
        self.call(Operation::SaveAiProvider, &args).await
    }

    pub async fn delete_ai_provider(&self, id: i64) -> Result<()> {
        self.call(Operation::DeleteAiProvider, &ProviderIdArgs { id }).await
    }

    pub async fn test_ai_provider(&self, provider: &AiProvider) -> Result<String> {
        let args = ProviderArgs {
            provider: provider.clone(),
        };
        self.call(Operation::TestAiProvider, &args).await
    }

    pub async fn test_model_chat(&self, args: &ModelTestArgs) -> Result<ModelTestResult> {
        self.call(Operation::TestModelChat, args).await
    }

    pub async fn test_model_structured_output(
        &self,
        args: &ModelTestArgs,
    ) -> Result<ModelTestResult> {
        self.call(Operation::TestModelStructuredOutput, args).await
    }

    // -- inference --

    pub async fn generate_ai_text(&self, args: &GenerateTextArgs) -> Result<String> {
        self.call(Operation::GenerateAiText, args).await
    }

    pub async fn polish_title_with_options(&self, args: &PolishTitleArgs) -> Result<Vec<String>> {
        self.call(Operation::PolishTitleWithOptions, args).await
    }

    pub async fn generate_ai_image(&self, args: &GenerateImageArgs) -> Result<String> {
        self.call(Operation::GenerateAiImage, args).await
    }

    pub async fn analyze_local_image(&self, args: &AnalyzeImageArgs) -> Result<String> {
        self.call(Operation::AnalyzeLocalImage, args).await
    }

    pub async fn fetch_user_analytics(&self, phone: &str) -> Result<UserAnalytics> {
        let args = PhoneArgs {
            phone: phone.to_string(),
        };
        self.call(Operation::FetchUserAnalytics, &args).await
    }

    // -- background services --

    pub async fn service_status(&self, kind: ServiceKind) -> Result<ServiceStatus> {
        let op = match kind {
            ServiceKind::Mcp => Operation::GetMcpStatus,
            ServiceKind::Api => Operation::GetApiStatus,
        };
        self.call(op, &NoArgs {}).await
    }

    pub async fn start_mcp_server(&self, port: u16, token: Option<String>) -> Result<()> {
        self.call(Operation::StartMcpServer, &StartMcpArgs { port, token }).await
    }

    pub async fn start_api_server(&self, port: u16) -> Result<()> {
        self.call(Operation::StartApiServer, &PortArgs { port }).await
    }

    pub async fn stop_service(&self, kind: ServiceKind) -> Result<()> {
        let op = match kind {
            ServiceKind::Mcp => Operation::StopMcpServer,
            ServiceKind::Api => Operation::StopApiServer,
        };
        self.call(op, &NoArgs {}).await
    }

    pub async fn get_api_key(&self) -> Result<Option<String>> {
        self.call(Operation::GetApiKey, &NoArgs {}).await
    }

    pub async fn save_api_key(&self, key: &str) -> Result<()> {
        let args = ApiKeyArgs {
            key: key.to_string(),
        };
        self.call(Operation::SaveApiKey, &args).await
    }

    pub async fn generate_api_key(&self) -> Result<String> {
        self.call(Operation::GenerateApiKey, &NoArgs {}).await
    }

    // -- pass-through --

    pub async fn get_trends(&self) -> Result<TrendsEnvelope> {
        self.call(Operation::GetTrends, &NoArgs {}).await
    }

    pub async fn list_local_images(&self) -> Result<Vec<String>> {
        self.call(Operation::ListLocalImages, &NoArgs {}).await
    }

    pub async fn import_local_images(&self, paths: Vec<String>) -> Result<()> {
        self.call(Operation::ImportLocalImages, &ImportImagesArgs { paths }).await
    }

    pub async fn delete_local_image(&self, path: &str) -> Result<()> {
        let args = ImagePathArgs {
            path: path.to_string(),
        };
        self.call(Operation::DeleteLocalImage, &args).await
    }

    pub async fn publish_post(&self, args: &PublishPostArgs) -> Result<()> {
        self.call(Operation::PublishPost, args).await
    }
}
