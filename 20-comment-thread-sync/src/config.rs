use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{cli::ConnectionArgs, http::HttpCommentRepository, preferences::NAME_WRITE_DEBOUNCE};

/// Resolved runtime settings for the widget client.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub api_url: String,
    pub client_key: Option<String>,
    pub preferences_path: PathBuf,
    pub request_timeout: Duration,
    pub name_debounce: Duration,
}

impl WidgetConfig {
    pub fn from_args(args: &ConnectionArgs) -> Result<Self> {
        let preferences_path = match &args.preferences {
            Some(path) => path.clone(),
            None => default_preferences_path()?,
        };
        Ok(Self {
            api_url: args.api.clone(),
            client_key: args.client_key.clone().filter(|key| !key.trim().is_empty()),
            preferences_path,
            request_timeout: Duration::from_secs(args.timeout_secs.max(1)),
            name_debounce: NAME_WRITE_DEBOUNCE,
        })
    }

    pub fn repository(&self) -> Result<HttpCommentRepository> {
        let client_key = self
            .client_key
            .as_deref()
            .context("a client key is required (--client-key or COMMENT_WIDGET_CLIENT_KEY)")?;
        HttpCommentRepository::new(&self.api_url, client_key, self.request_timeout)
            .with_context(|| format!("invalid api url {}", self.api_url))
    }
}

fn default_preferences_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no config directory; pass --preferences")?;
    Ok(base.join("comment-widget").join("preferences.json"))
}
