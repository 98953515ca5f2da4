//! SQLite人物ストア
//!
//! 人物レコードの保存・取得・更新・削除機能を提供する。
//! - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
//! - 読み取り: deadpool-sqliteによるasync接続プール

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;
use thiserror::Error;

/// ストアエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// レコード未存在エラー（該当行が0件のときのみ）
    #[error("人物が見つかりません: id={0}")]
    NotFound(u64),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// プール取得エラー
    #[error("プールエラー: {0}")]
    Pool(String),

    /// 接続構築エラー
    #[error("接続構築エラー: {0}")]
    Build(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::BuildError> for StoreError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        StoreError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for StoreError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// 人物レコード
///
/// personテーブルの1行を表す。idはストアが採番し、以後不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    /// 自動採番ID
    pub id: u64,
    /// 氏名（必須、作成後は変更されない）
    pub name: String,
    /// 年齢
    pub age: Option<i64>,
    /// 住所
    pub address: Option<String>,
    /// 職業
    pub work: Option<String>,
}

/// 新規人物
///
/// 挿入時の入力。idはストア側で採番するため持たない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub work: Option<String>,
}

/// 人物ストア契約
///
/// 人物レコードの永続化操作を抽象化する。
/// 本番実装はSqlitePersonStore、テストではインメモリ実装に差し替える。
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// 人物を新規保存し、採番されたidを返す
    ///
    /// # Arguments
    /// * `person` - 保存する人物
    ///
    /// # Returns
    /// * `Ok(u64)` - 採番されたid
    /// * `Err(StoreError)` - エラー時
    async fn create(&self, person: &NewPerson) -> Result<u64, StoreError>;

    /// idで人物を1件取得
    ///
    /// # Arguments
    /// * `id` - 取得する人物のid
    ///
    /// # Returns
    /// * `Ok(PersonRecord)` - 該当レコード
    /// * `Err(StoreError::NotFound)` - 該当行が0件
    /// * `Err(StoreError)` - その他のエラー
    async fn fetch_one(&self, id: u64) -> Result<PersonRecord, StoreError>;

    /// 全人物を取得（順序はストア格納順のまま）
    async fn fetch_all(&self) -> Result<Vec<PersonRecord>, StoreError>;

    /// 人物を更新し、影響行数を返す
    ///
    /// 更新対象はaddress, age, "work"のみ。"name"は作成後不変のため
    /// 更新文に含めない。存在確認は呼び出し側の責務。
    async fn update(&self, record: &PersonRecord) -> Result<usize, StoreError>;

    /// idで人物を削除
    ///
    /// # Returns
    /// * `Ok(true)` - 削除された
    /// * `Ok(false)` - 該当行がなかった（エラーにはしない）
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;
}

/// SQLiteデータベースのスキーマを定義するSQL
///
/// "name"と"work"はSQLキーワード集合と衝突し得るため、全ての文で
/// 引用符付き識別子として扱う。
const SCHEMA_SQL: &str = r#"
-- WALモード設定
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

-- 人物テーブル
CREATE TABLE IF NOT EXISTS person (
    id INTEGER PRIMARY KEY AUTOINCREMENT,  -- 自動採番ID（AUTOINCREMENTで削除後の再利用を防ぐ）
    "name" TEXT NOT NULL,                  -- 氏名（必須）
    age INTEGER,                           -- 年齢（任意）
    address TEXT,                          -- 住所（任意）
    "work" TEXT                            -- 職業（任意）
);
"#;

/// SQLite人物ストア
///
/// - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
/// - 読み取り: deadpool-sqliteによるasync接続プール
pub struct SqlitePersonStore {
    /// 書き込み専用接続（低頻度のため単一接続で十分）
    write_conn: Arc<Mutex<Connection>>,
    /// 読み取り用async接続プール
    read_pool: Pool,
}

impl SqlitePersonStore {
    /// 新しいSqlitePersonStoreを作成
    ///
    /// データベースファイルを開き、スキーマを初期化する。
    /// WALモードを有効にし、書き込み用単一接続と読み取り用プールを構成する。
    ///
    /// # Arguments
    /// * `db_path` - データベースファイルのパス
    ///
    /// # Returns
    /// * `Ok(SqlitePersonStore)` - 成功時
    /// * `Err(StoreError)` - エラー時
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        // 書き込み用接続を作成し、スキーマを初期化
        let write_conn = Connection::open(db_path)?;
        write_conn.execute_batch(SCHEMA_SQL)?;

        // 読み取り用プールを作成（最大4接続）
        let cfg = Config::new(db_path);
        let read_pool = cfg
            .builder(Runtime::Tokio1)
            .expect("Config builder should not fail")
            .max_size(4)
            .build()?;

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    /// SELECT結果の1行をPersonRecordに変換（内部用）
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersonRecord> {
        Ok(PersonRecord {
            id: row.get::<_, i64>(0)? as u64,
            name: row.get(1)?,
            age: row.get(2)?,
            address: row.get(3)?,
            work: row.get(4)?,
        })
    }

    /// 全件取得クエリを実行（内部用）
    fn query_all(conn: &Connection) -> Result<Vec<PersonRecord>, StoreError> {
        let mut stmt = conn.prepare(r#"SELECT id, "name", age, address, "work" FROM person"#)?;

        // 行マッピングの失敗は握りつぶさずエラーとして返す
        let records = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[async_trait]
impl PersonStore for SqlitePersonStore {
    /// 人物を新規保存
    ///
    /// 書き込み専用接続を使用する。Noneのフィールドは
    /// SQL NULLとしてバインドされる。
    async fn create(&self, person: &NewPerson) -> Result<u64, StoreError> {
        let person = person.clone();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("人物作成時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            // RETURNINGで採番されたidをそのまま受け取る
            let id: i64 = conn.query_row(
                r#"INSERT INTO person ("name", age, address, "work") VALUES (?1, ?2, ?3, ?4) RETURNING id"#,
                rusqlite::params![&person.name, person.age, &person.address, &person.work],
                |row| row.get(0),
            )?;

            Ok(id as u64)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// idで人物を1件取得
    ///
    /// 読み取りプールから接続を取得し、並行実行可能。
    /// 該当行が0件のときだけNotFoundを返し、それ以外の失敗は
    /// 全てDatabaseエラーとして扱う。
    async fn fetch_one(&self, id: u64) -> Result<PersonRecord, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| {
            conn.query_row(
                r#"SELECT id, "name", age, address, "work" FROM person WHERE id = ?1"#,
                [id as i64],
                Self::map_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(id),
                other => StoreError::Database(other.to_string()),
            })
        })
        .await?
    }

    /// 全人物を取得
    ///
    /// 読み取りプールから接続を取得し、並行実行可能。
    /// ORDER BYは付けず、ストアの返す順序をそのまま返す。
    async fn fetch_all(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(|conn| Self::query_all(conn)).await?
    }

    /// 人物を更新
    ///
    /// 書き込み専用接続を使用する。"name"は更新文に含めない。
    async fn update(&self, record: &PersonRecord) -> Result<usize, StoreError> {
        let record = record.clone();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("人物更新時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            let rows_affected = conn.execute(
                r#"UPDATE person SET address = ?1, age = ?2, "work" = ?3 WHERE id = ?4"#,
                rusqlite::params![&record.address, record.age, &record.work, record.id as i64],
            )?;

            Ok(rows_affected)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// idで人物を削除
    ///
    /// 書き込み専用接続を使用する。該当行がなくてもエラーにしない。
    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("人物削除時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            let rows_affected = conn.execute("DELETE FROM person WHERE id = ?1", [id as i64])?;

            Ok(rows_affected > 0)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }
}
