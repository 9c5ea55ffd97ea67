//! 解決済みスタック設定

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Minecraft のエディション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinecraftEdition {
    #[default]
    Java,
    Bedrock,
}

impl MinecraftEdition {
    /// 文字列からパース（大文字小文字は区別しない）
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "java" => Some(Self::Java),
            "bedrock" => Some(Self::Bedrock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Bedrock => "bedrock",
        }
    }
}

impl fmt::Display for MinecraftEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Twilio 通知設定（watchdog にそのまま渡す）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// 送信元の電話番号（例: `+1XXXYYYZZZZ`）
    pub phone_from: Option<String>,
    /// 通知先の電話番号
    pub phone_to: Option<String>,
    pub account_id: Option<String>,
    pub auth_code: Option<String>,
}

/// サーバーコンテナに渡す環境変数
///
/// `EULA` キーの存在だけを検証し、それ以外のキーは解釈せずにそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageEnvironment(BTreeMap<String, String>);

impl ImageEnvironment {
    /// 利用規約への同意を表すキー
    pub const ACCEPTANCE_KEY: &'static str = "EULA";

    /// JSON 文字列からパースして検証
    pub fn from_json(field: &str, raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ConfigError::validation(field, format!("JSON として解析できません: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::validation(field, "JSON オブジェクトである必要があります"))?;

        let mut vars = BTreeMap::new();
        for (key, value) in object {
            let value = value.as_str().ok_or_else(|| {
                ConfigError::validation(
                    field,
                    format!("キー \"{}\" の値は文字列である必要があります", key),
                )
            })?;
            vars.insert(key.clone(), value.to_string());
        }

        Self::from_map(field, vars)
    }

    /// マップから作成（`EULA` キー必須）
    pub fn from_map(field: &str, vars: BTreeMap<String, String>) -> Result<Self> {
        if !vars.contains_key(Self::ACCEPTANCE_KEY) {
            return Err(ConfigError::validation(
                field,
                format!("必須キー \"{}\" がありません", Self::ACCEPTANCE_KEY),
            ));
        }
        Ok(Self(vars))
    }

    pub fn eula(&self) -> &str {
        self.0
            .get(Self::ACCEPTANCE_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 解決済みのスタック設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// 既存の Route53 ホストゾーンのドメイン名（必須）
    pub domain_name: String,
    /// サーバーのサブドメイン部分（デフォルト: `minecraft`）
    pub subdomain_part: String,
    /// サーバーをデプロイするリージョン（デフォルト: `us-east-1`）
    pub server_region: String,
    /// デプロイ先の AWS アカウント ID
    pub account: String,
    /// デプロイ操作のデフォルトリージョン
    pub deploy_region: String,
    pub minecraft_edition: MinecraftEdition,
    /// 起動後、接続を待つ分数（デフォルト: 10）
    pub startup_minutes: u32,
    /// 最後の切断から停止までの分数（デフォルト: 20）
    pub shutdown_minutes: u32,
    /// FARGATE_SPOT を使うかどうか
    pub use_fargate_spot: bool,
    /// タスクの CPU ユニット（デフォルト: 1024）
    pub task_cpu: u32,
    /// タスクのメモリ MiB（デフォルト: 2048）
    pub task_memory: u32,
    /// 既存 VPC の ID。未指定なら新規作成
    pub vpc_id: Option<String>,
    pub minecraft_image_env: ImageEnvironment,
    /// 通知先メールアドレス。指定時のみ SNS トピックを作成
    pub sns_email_address: Option<String>,
    pub twilio: TwilioConfig,
    /// コンテナログを CloudWatch Logs に送るかどうか
    pub debug: bool,
}

impl StackConfig {
    /// サーバーの公開ホスト名（`{subdomain}.{domain}`）
    pub fn server_hostname(&self) -> String {
        format!("{}.{}", self.subdomain_part, self.domain_name)
    }
}

/// Fargate の CPU/メモリの有効な組み合わせかどうか
///
/// | cpu  | memory (MiB)                   |
/// |------|--------------------------------|
/// | 256  | 512, 1024, 2048                |
/// | 512  | 1024 - 4096 (1024 刻み)        |
/// | 1024 | 2048 - 8192 (1024 刻み)        |
/// | 2048 | 4096 - 16384 (1024 刻み)       |
/// | 4096 | 8192 - 30720 (1024 刻み)       |
pub fn is_valid_task_size(cpu: u32, memory: u32) -> bool {
    match cpu {
        256 => matches!(memory, 512 | 1024 | 2048),
        512 => in_steps(memory, 1024, 4096),
        1024 => in_steps(memory, 2048, 8192),
        2048 => in_steps(memory, 4096, 16384),
        4096 => in_steps(memory, 8192, 30720),
        _ => false,
    }
}

fn in_steps(memory: u32, min: u32, max: u32) -> bool {
    (min..=max).contains(&memory) && memory % 1024 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_parse() {
        assert_eq!(MinecraftEdition::parse("java"), Some(MinecraftEdition::Java));
        assert_eq!(
            MinecraftEdition::parse("Bedrock"),
            Some(MinecraftEdition::Bedrock)
        );
        assert_eq!(MinecraftEdition::parse("pocket"), None);
        assert_eq!(MinecraftEdition::default(), MinecraftEdition::Java);
    }

    #[test]
    fn test_image_environment_requires_eula() {
        let env = ImageEnvironment::from_json("F", r#"{"EULA":"TRUE","MOTD":"hi"}"#).unwrap();
        assert_eq!(env.eula(), "TRUE");
        assert_eq!(env.get("MOTD"), Some("hi"));
        assert_eq!(env.len(), 2);

        let err = ImageEnvironment::from_json("F", r#"{"MOTD":"hi"}"#).unwrap_err();
        assert_eq!(err.field(), Some("F"));
        assert!(err.to_string().contains("EULA"));
    }

    #[test]
    fn test_image_environment_rejects_non_string_values() {
        let err = ImageEnvironment::from_json("F", r#"{"EULA":"TRUE","MAX_PLAYERS":20}"#)
            .unwrap_err();
        assert!(err.to_string().contains("MAX_PLAYERS"));

        assert!(ImageEnvironment::from_json("F", r#"["EULA"]"#).is_err());
        assert!(ImageEnvironment::from_json("F", "not json").is_err());
    }

    #[test]
    fn test_task_size_table() {
        assert!(is_valid_task_size(256, 512));
        assert!(is_valid_task_size(256, 2048));
        assert!(!is_valid_task_size(256, 3072));
        assert!(is_valid_task_size(512, 3072));
        assert!(!is_valid_task_size(512, 5120));
        assert!(is_valid_task_size(1024, 2048));
        assert!(!is_valid_task_size(1024, 1024));
        assert!(is_valid_task_size(2048, 16384));
        assert!(!is_valid_task_size(2048, 4608));
        assert!(is_valid_task_size(4096, 30720));
        assert!(!is_valid_task_size(4096, 31744));
        assert!(!is_valid_task_size(3072, 8192));
    }
}
