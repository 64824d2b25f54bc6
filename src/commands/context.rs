//! Connection bootstrap shared by every subcommand.
//!
//! Mirrors the order the console tools have always used: reject a missing
//! key before any network traffic, then probe the API root so a bad URL or
//! key fails fast with a login error instead of surfacing mid-workflow.
use crate::api::types::ApiInfo;
use crate::api::{ApiClient, AuthScheme};
use crate::apps::ApplicationService;
use crate::cli::SharedOptions;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, FollowOptions, JobsService};
use crate::upload::UploadService;
use std::time::Duration;
use tracing::{debug, error};

pub(crate) struct CommandContext {
    client: ApiClient,
    pub api_info: ApiInfo,
    pub follow: FollowOptions,
    pub cancel: CancelToken,
}

impl CommandContext {
    /// Build the client and validate URL and key against the API root.
    pub fn connect(shared: &SharedOptions, cancel: CancelToken) -> Result<Self, ExitStatus> {
        let Some(api_key) = shared.api_key.as_deref().filter(|key| !key.is_empty()) else {
            error!("no API key provided; pass --api-key or set AIPCTL_API_KEY");
            return Err(ExitStatus::MissingCredentials);
        };
        if shared.server_url.trim().is_empty() {
            error!("no console URL provided; pass --server-url or set AIPCTL_SERVER_URL");
            return Err(ExitStatus::InvalidParameters);
        }

        let auth = match shared.username.as_deref().filter(|name| !name.is_empty()) {
            Some(username) => AuthScheme::Basic {
                username: username.to_string(),
                key: api_key.to_string(),
            },
            None => AuthScheme::ApiKey(api_key.to_string()),
        };
        let client = ApiClient::new(
            &shared.server_url,
            auth,
            Duration::from_secs(shared.timeout),
        );

        let api_info: ApiInfo = match client.get_json("/api/") {
            Ok(info) => info,
            Err(err) => {
                let err = anyhow::Error::from(err);
                error!("could not log in to {}: {err:#}", shared.server_url);
                return Err(ExitStatus::LoginError);
            }
        };
        debug!(
            "connected to {} (version {})",
            shared.server_url,
            api_info.api_version.as_deref().unwrap_or("unknown")
        );

        Ok(CommandContext {
            client,
            api_info,
            follow: FollowOptions {
                interval: Duration::from_secs(shared.sleep.max(1)),
                verbose: shared.verbose,
            },
            cancel,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn apps(&self) -> ApplicationService<'_> {
        ApplicationService::new(&self.client)
    }

    pub fn jobs(&self) -> JobsService<'_> {
        JobsService::new(&self.client)
    }

    pub fn uploads(&self) -> UploadService<'_> {
        UploadService::new(&self.client)
    }
}
