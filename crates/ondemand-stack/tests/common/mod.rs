use chrono::{TimeZone, Utc};
use ondemand_cloud::StaticParameters;
use ondemand_config::StackConfig;
use ondemand_stack::{ComposeOptions, ComposedStack, StackComposer, WatchdogImage};
use std::collections::BTreeMap;

pub const HOSTED_ZONE_ID: &str = "Z0123456789ABCDEF";
pub const LAUNCHER_ROLE_ARN: &str = "arn:aws:iam::123456789012:role/minecraft-domain-stack-LauncherLambdaRole";

/// Minimal valid input plus `extra`
pub fn input(extra: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut input = BTreeMap::from([
        ("DOMAIN_NAME".to_string(), "example.com".to_string()),
        ("CDK_DEFAULT_ACCOUNT".to_string(), "123456789012".to_string()),
        ("CDK_DEFAULT_REGION".to_string(), "us-east-1".to_string()),
        (
            "MINECRAFT_IMAGE_ENV_VARS_JSON".to_string(),
            r#"{"EULA":"TRUE","DIFFICULTY":"normal"}"#.to_string(),
        ),
    ]);
    for (key, value) in extra {
        input.insert(key.to_string(), value.to_string());
    }
    input
}

pub fn config(extra: &[(&str, &str)]) -> StackConfig {
    ondemand_config::resolve(&input(extra)).unwrap()
}

/// Parameters published by an applied domain stack
pub fn domain_parameters() -> StaticParameters {
    StaticParameters::new()
        .with("us-east-1", "MinecraftHostedZoneID", HOSTED_ZONE_ID)
        .with("us-east-1", "LauncherLambdaRoleArn", LAUNCHER_ROLE_ARN)
}

pub fn options() -> ComposeOptions {
    ComposeOptions {
        watchdog_image: WatchdogImage::default(),
        datapacks: vec!["terralith.zip".to_string()],
        applied_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub async fn compose(extra: &[(&str, &str)]) -> ComposedStack {
    let config = config(extra);
    let parameters = domain_parameters();
    StackComposer::new(&config, &parameters)
        .with_options(options())
        .compose()
        .await
        .unwrap()
}
