pub mod error;
pub mod model;
pub mod resolver;

pub use error::*;
pub use model::{ImageEnvironment, MinecraftEdition, StackConfig, TwilioConfig, is_valid_task_size};
pub use resolver::{keys, parse_bool, parse_positive_int, resolve};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// .env ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ONDEMAND_ENV_PATH (直接パス指定)
/// 2. カレントディレクトリの .env
/// 3. ./.ondemand/.env
/// 4. ~/.config/ondemand/.env (グローバル設定)
pub fn find_env_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(env_path) = std::env::var("ONDEMAND_ENV_PATH") {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリ
    let path = current_dir.join(".env");
    if path.is_file() {
        return Ok(path);
    }

    // 3. ./.ondemand/ ディレクトリ
    let path = current_dir.join(".ondemand").join(".env");
    if path.is_file() {
        return Ok(path);
    }

    // 4. グローバル設定
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("ondemand").join(".env");
        if path.is_file() {
            return Ok(path);
        }
    }

    Err(ConfigError::EnvFileNotFound)
}

/// .env ファイルを読み込む
///
/// `KEY=VALUE` 形式。空行と `#` で始まる行は無視し、値のクォートは除去する。
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    let vars = parse_env_content(&content);

    info!(
        env_file = %path.display(),
        variable_count = vars.len(),
        "Loaded variables from .env file"
    );

    Ok(vars)
}

/// .env 形式の文字列をパース
pub fn parse_env_content(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();

        // 空行とコメント行をスキップ
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), strip_quotes(value.trim()).to_string());
        }
    }

    vars
}

/// 解決用の入力マップを作成
///
/// .env ファイル（指定時）の値を、プロセス環境変数で上書きする。
/// 取り込むのは [`keys::ALL`] に含まれるキーのみ。
pub fn collect_input(env_file: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let mut input = BTreeMap::new();

    if let Some(path) = env_file {
        for (key, value) in load_env_file(path)? {
            if keys::ALL.contains(&key.as_str()) {
                input.insert(key, value);
            }
        }
    }

    for key in keys::ALL {
        if let Ok(value) = std::env::var(key) {
            debug!(key = %key, "Using value from process environment");
            input.insert(key.to_string(), value);
        }
    }

    Ok(input)
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_parse_env_content() {
        let vars = parse_env_content(
            r#"
# コメント行
DOMAIN_NAME=example.com
export SUBDOMAIN_PART=mc
MINECRAFT_IMAGE_ENV_VARS_JSON='{"EULA":"TRUE"}'
SNS_EMAIL_ADDRESS="ops@example.com"
EMPTY_VALUE=
=no-key
"#,
        );

        assert_eq!(vars["DOMAIN_NAME"], "example.com");
        assert_eq!(vars["SUBDOMAIN_PART"], "mc");
        assert_eq!(vars["MINECRAFT_IMAGE_ENV_VARS_JSON"], r#"{"EULA":"TRUE"}"#);
        assert_eq!(vars["SNS_EMAIL_ADDRESS"], "ops@example.com");
        assert_eq!(vars["EMPTY_VALUE"], "");
        assert_eq!(vars.len(), 5);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("'hello'"), "hello");
        assert_eq!(strip_quotes("hello"), "hello");
        assert_eq!(strip_quotes("\"hello"), "\"hello"); // 不完全なクォート
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes(""), "");
    }

    #[test]
    #[serial]
    fn test_find_env_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join(".env"), "DOMAIN_NAME=example.com").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("ONDEMAND_ENV_PATH", find_env_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".env"));
    }

    #[test]
    #[serial]
    fn test_find_env_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let project_dir = temp_dir.path().join(".ondemand");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join(".env"), "DOMAIN_NAME=example.com").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("ONDEMAND_ENV_PATH", find_env_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".ondemand/.env"));
    }

    #[test]
    #[serial]
    fn test_find_env_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env_path = temp_dir.path().join("custom.env");
        fs::write(&env_path, "DOMAIN_NAME=example.com").unwrap();

        let result = temp_env::with_var("ONDEMAND_ENV_PATH", Some(&env_path), find_env_file);
        assert_eq!(result.unwrap(), env_path);
    }

    #[test]
    #[serial]
    fn test_collect_input_process_env_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env_path = temp_dir.path().join(".env");
        fs::write(
            &env_path,
            "DOMAIN_NAME=from-file.com\nSUBDOMAIN_PART=mc\nUNRELATED=1\n",
        )
        .unwrap();

        let input = temp_env::with_vars(
            [
                ("DOMAIN_NAME", Some("from-env.com")),
                ("SUBDOMAIN_PART", None),
            ],
            || collect_input(Some(&env_path)),
        )
        .unwrap();

        assert_eq!(input["DOMAIN_NAME"], "from-env.com");
        assert_eq!(input["SUBDOMAIN_PART"], "mc");
        assert!(!input.contains_key("UNRELATED"));
    }
}
