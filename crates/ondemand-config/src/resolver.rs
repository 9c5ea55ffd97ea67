//! 環境変数マップから StackConfig を解決する
//!
//! 入力は文字列マップのみ。I/O は行わない。空文字列は未指定として扱う。

use crate::error::{ConfigError, Result};
use crate::model::{ImageEnvironment, MinecraftEdition, StackConfig, TwilioConfig};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 入力キー
pub mod keys {
    pub const DOMAIN_NAME: &str = "DOMAIN_NAME";
    pub const ACCOUNT: &str = "CDK_DEFAULT_ACCOUNT";
    pub const DEPLOY_REGION: &str = "CDK_DEFAULT_REGION";
    pub const SUBDOMAIN_PART: &str = "SUBDOMAIN_PART";
    pub const SERVER_REGION: &str = "SERVER_REGION";
    pub const MINECRAFT_EDITION: &str = "MINECRAFT_EDITION";
    pub const STARTUP_MINUTES: &str = "STARTUP_MINUTES";
    pub const SHUTDOWN_MINUTES: &str = "SHUTDOWN_MINUTES";
    pub const USE_FARGATE_SPOT: &str = "USE_FARGATE_SPOT";
    pub const TASK_CPU: &str = "TASK_CPU";
    pub const TASK_MEMORY: &str = "TASK_MEMORY";
    pub const VPC_ID: &str = "VPC_ID";
    pub const MINECRAFT_IMAGE_ENV_VARS_JSON: &str = "MINECRAFT_IMAGE_ENV_VARS_JSON";
    pub const SNS_EMAIL_ADDRESS: &str = "SNS_EMAIL_ADDRESS";
    pub const TWILIO_PHONE_FROM: &str = "TWILIO_PHONE_FROM";
    pub const TWILIO_PHONE_TO: &str = "TWILIO_PHONE_TO";
    pub const TWILIO_ACCOUNT_ID: &str = "TWILIO_ACCOUNT_ID";
    pub const TWILIO_AUTH_CODE: &str = "TWILIO_AUTH_CODE";
    pub const DEBUG: &str = "DEBUG";

    /// 解決に使う全キー
    pub const ALL: &[&str] = &[
        DOMAIN_NAME,
        ACCOUNT,
        DEPLOY_REGION,
        SUBDOMAIN_PART,
        SERVER_REGION,
        MINECRAFT_EDITION,
        STARTUP_MINUTES,
        SHUTDOWN_MINUTES,
        USE_FARGATE_SPOT,
        TASK_CPU,
        TASK_MEMORY,
        VPC_ID,
        MINECRAFT_IMAGE_ENV_VARS_JSON,
        SNS_EMAIL_ADDRESS,
        TWILIO_PHONE_FROM,
        TWILIO_PHONE_TO,
        TWILIO_ACCOUNT_ID,
        TWILIO_AUTH_CODE,
        DEBUG,
    ];
}

const DEFAULT_SUBDOMAIN_PART: &str = "minecraft";
const DEFAULT_SERVER_REGION: &str = "us-east-1";
const DEFAULT_STARTUP_MINUTES: u32 = 10;
const DEFAULT_SHUTDOWN_MINUTES: u32 = 20;
const DEFAULT_TASK_CPU: u32 = 1024;
const DEFAULT_TASK_MEMORY: u32 = 2048;

/// 入力マップを検証して StackConfig を作成
pub fn resolve(input: &BTreeMap<String, String>) -> Result<StackConfig> {
    let domain_name = required(input, keys::DOMAIN_NAME)?;
    let account = required(input, keys::ACCOUNT)?;
    let deploy_region = required(input, keys::DEPLOY_REGION)?;

    let minecraft_edition = match lookup(input, keys::MINECRAFT_EDITION) {
        Some(raw) => MinecraftEdition::parse(raw).unwrap_or_else(|| {
            warn!(value = %raw, "Unrecognized MINECRAFT_EDITION, falling back to java");
            MinecraftEdition::Java
        }),
        None => MinecraftEdition::default(),
    };

    let minecraft_image_env = {
        let field = keys::MINECRAFT_IMAGE_ENV_VARS_JSON;
        let raw = required(input, field)?;
        ImageEnvironment::from_json(field, &raw)?
    };

    let config = StackConfig {
        domain_name,
        subdomain_part: optional(input, keys::SUBDOMAIN_PART)
            .unwrap_or_else(|| DEFAULT_SUBDOMAIN_PART.to_string()),
        server_region: optional(input, keys::SERVER_REGION)
            .unwrap_or_else(|| DEFAULT_SERVER_REGION.to_string()),
        account,
        deploy_region,
        minecraft_edition,
        startup_minutes: positive_int(input, keys::STARTUP_MINUTES)?
            .unwrap_or(DEFAULT_STARTUP_MINUTES),
        shutdown_minutes: positive_int(input, keys::SHUTDOWN_MINUTES)?
            .unwrap_or(DEFAULT_SHUTDOWN_MINUTES),
        use_fargate_spot: boolean(input, keys::USE_FARGATE_SPOT)?.unwrap_or(false),
        task_cpu: positive_int(input, keys::TASK_CPU)?.unwrap_or(DEFAULT_TASK_CPU),
        task_memory: positive_int(input, keys::TASK_MEMORY)?.unwrap_or(DEFAULT_TASK_MEMORY),
        vpc_id: optional(input, keys::VPC_ID),
        minecraft_image_env,
        sns_email_address: optional(input, keys::SNS_EMAIL_ADDRESS),
        twilio: TwilioConfig {
            phone_from: optional(input, keys::TWILIO_PHONE_FROM),
            phone_to: optional(input, keys::TWILIO_PHONE_TO),
            account_id: optional(input, keys::TWILIO_ACCOUNT_ID),
            auth_code: optional(input, keys::TWILIO_AUTH_CODE),
        },
        debug: boolean(input, keys::DEBUG)?.unwrap_or(false),
    };

    debug!(
        domain = %config.domain_name,
        region = %config.server_region,
        edition = %config.minecraft_edition,
        "Resolved stack configuration"
    );

    Ok(config)
}

/// 真偽値のパース（`true` / `false` のみ、大文字小文字は区別しない）
pub fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::validation(
            field,
            format!("\"true\" または \"false\" が必要ですが \"{}\" が指定されました", raw),
        )),
    }
}

/// 正の10進整数のパース（数字のみ。符号や空白は受け付けない）
pub fn parse_positive_int(field: &str, raw: &str) -> Result<u32> {
    let digits_only = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
    match raw.parse::<u32>() {
        Ok(value) if digits_only && value > 0 => Ok(value),
        _ => Err(ConfigError::validation(
            field,
            format!("正の整数が必要ですが \"{}\" が指定されました", raw),
        )),
    }
}

fn lookup<'a>(input: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn optional(input: &BTreeMap<String, String>, key: &str) -> Option<String> {
    lookup(input, key).map(str::to_string)
}

fn required(input: &BTreeMap<String, String>, key: &str) -> Result<String> {
    optional(input, key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn boolean(input: &BTreeMap<String, String>, key: &str) -> Result<Option<bool>> {
    lookup(input, key).map(|raw| parse_bool(key, raw)).transpose()
}

fn positive_int(input: &BTreeMap<String, String>, key: &str) -> Result<Option<u32>> {
    lookup(input, key)
        .map(|raw| parse_positive_int(key, raw))
        .transpose()
}
