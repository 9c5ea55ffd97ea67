use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} は必須です")]
    Missing(String),

    #[error("{field} の値が不正です: {message}")]
    Validation { field: String, message: String },

    #[error(
        ".env ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: .env\n\
        - ./.ondemand/.env\n\
        - ~/.config/ondemand/.env\n\
        または ONDEMAND_ENV_PATH 環境変数で直接指定できます"
    )]
    EnvFileNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// エラー対象のフィールド名
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Missing(field) => Some(field),
            ConfigError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
