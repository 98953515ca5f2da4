//! サーバー設定
//!
//! 環境変数からリッスンアドレスとデータベースパスを読み込む。
//! - HOST: リッスンホスト（デフォルト: 0.0.0.0）
//! - PORT: リッスンポート（デフォルト: 8080）
//! - DB_PATH: データベースファイルのパス（デフォルト: /var/lib/persons/persons.db）

use thiserror::Error;

/// リッスンホスト環境変数名
const HOST_ENV: &str = "HOST";

/// リッスンポート環境変数名
const PORT_ENV: &str = "PORT";

/// データベースパス環境変数名
const DB_PATH_ENV: &str = "DB_PATH";

/// デフォルトのリッスンホスト
const DEFAULT_HOST: &str = "0.0.0.0";

/// デフォルトのリッスンポート
const DEFAULT_PORT: u16 = 8080;

/// デフォルトのデータベースパス
const DEFAULT_DB_PATH: &str = "/var/lib/persons/persons.db";

/// サーバー設定のエラー型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// リッスンアドレスとデータベースパスを持つサーバー設定
///
/// この構造体は環境変数から読み込んだ起動パラメータを保持する。
/// 各値は以下の環境変数で設定:
/// - HOST: リッスンホスト
/// - PORT: リッスンポート
/// - DB_PATH: SQLiteデータベースファイルのパス
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// リッスンホスト
    host: String,
    /// リッスンポート
    port: u16,
    /// データベースファイルのパス
    db_path: String,
}

impl ServerConfig {
    /// 環境変数を読み取って新しいServerConfigを作成
    ///
    /// 環境変数:
    /// - HOST: リッスンホスト（未設定時は0.0.0.0）
    /// - PORT: リッスンポート（未設定時は8080、u16として解釈できない値はエラー）
    /// - DB_PATH: データベースファイルのパス（未設定時は/var/lib/persons/persons.db）
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match std::env::var(PORT_ENV) {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            Err(_) => DEFAULT_PORT,
        };

        let db_path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        Ok(Self {
            host,
            port,
            db_path,
        })
    }

    /// 明示的な値で新しいServerConfigを作成（テスト用）
    pub fn new(host: String, port: u16, db_path: String) -> Self {
        Self {
            host,
            port,
            db_path,
        }
    }

    /// リッスンホストを取得
    pub fn host(&self) -> &str {
        &self.host
    }

    /// リッスンポートを取得
    pub fn port(&self) -> u16 {
        self.port
    }

    /// データベースファイルのパスを取得
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// バインド用のリッスンアドレス文字列を組み立てる
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
