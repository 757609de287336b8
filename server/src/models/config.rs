use serde::{Deserialize, Serialize};

/// # App configuration
///
/// Values handed to rendered pages, such as the instance title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Name of this instance, used as the page title prefix
    pub instance_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance_name: "Flashdeck".to_string(),
        }
    }
}
