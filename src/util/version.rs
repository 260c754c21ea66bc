pub const APP_NAME: &str = "Craft Profit Calculator";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// User agent sent with every API request.
pub fn user_agent() -> String {
    let label = version_label();
    let version = label.trim_start_matches(|ch| ch == 'v' || ch == 'V');
    format!("craft-profit-calculator/{version}")
}
