//! 人物サービス
//!
//! 人物レコードのCRUDに関するビジネスルールを担う。
//! - 作成時バリデーション（氏名必須、年齢は正の値、文字数上限）
//! - 部分更新の突き合わせ（リクエストに存在するフィールドのみ上書き）
//! - 削除前の存在確認

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{NewPerson, PersonRecord, PersonStore, StoreError};

/// address・workフィールドの最大文字数
const MAX_FIELD_CHARS: usize = 255;

/// 作成リクエストのバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 氏名が空（空白のみも含む）
    #[error("name must not be empty")]
    EmptyName,
    /// 年齢が0以下
    #[error("age must be greater than 0")]
    InvalidAge,
    /// フィールドが最大文字数を超過
    #[error("{0} must not exceed 255 characters")]
    FieldTooLong(&'static str),
}

/// サービスエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 作成リクエストのバリデーション失敗
    #[error("バリデーションエラー: {0}")]
    Validation(#[from] ValidationError),

    /// 対象の人物が存在しない
    #[error("人物が見つかりません: id={0}")]
    NotFound(u64),

    /// ストア操作の失敗
    #[error("ストアエラー: {0}")]
    Store(StoreError),
}

/// StoreErrorからの変換
///
/// 該当行0件のケースはNotFoundへ分類し、それ以外はStoreとして包む。
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

/// 人物作成リクエスト
///
/// nameは必須。任意フィールドは省略可能で、省略時はNULLとして保存される。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePersonRequest {
    /// 氏名（必須）
    pub name: String,

    /// 年齢
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,

    /// 住所
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// 職業
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
}

/// 人物更新リクエスト
///
/// 存在するフィールドだけが更新対象になる。nameは作成後不変のため
/// フィールド自体を持たない（ボディに含まれていても無視される）。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdatePersonRequest {
    /// 年齢
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,

    /// 住所
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// 職業
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
}

/// 人物レスポンス
///
/// 値がないフィールドはJSONから省略される。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonResponse {
    /// 自動採番ID
    pub id: u64,

    /// 氏名
    pub name: String,

    /// 年齢
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,

    /// 住所
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// 職業
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
}

impl From<PersonRecord> for PersonResponse {
    fn from(record: PersonRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            age: record.age,
            address: record.address,
            work: record.work,
        }
    }
}

/// 人物サービス
///
/// ストア契約の上でCRUDのビジネスルールを適用する。
pub struct PersonService<S: PersonStore> {
    /// 人物ストア
    store: S,
}

impl<S: PersonStore> PersonService<S> {
    /// 新しいPersonServiceを作成
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 人物を作成し、採番されたidを返す
    ///
    /// # 処理フロー
    /// 1. リクエストのバリデーション
    /// 2. ストアへの保存
    ///
    /// # Returns
    /// * `Ok(u64)` - 採番されたid
    /// * `Err(ServiceError::Validation)` - バリデーション失敗
    /// * `Err(ServiceError::Store)` - ストアエラー
    pub async fn create(&self, req: &CreatePersonRequest) -> Result<u64, ServiceError> {
        Self::validate_create(req)?;

        let person = NewPerson {
            name: req.name.clone(),
            age: req.age,
            address: req.address.clone(),
            work: req.work.clone(),
        };

        let id = self.store.create(&person).await?;
        Ok(id)
    }

    /// 作成リクエストをバリデーション（内部用）
    fn validate_create(req: &CreatePersonRequest) -> Result<(), ValidationError> {
        if req.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if let Some(age) = req.age
            && age <= 0
        {
            return Err(ValidationError::InvalidAge);
        }

        if let Some(address) = &req.address
            && address.chars().count() > MAX_FIELD_CHARS
        {
            return Err(ValidationError::FieldTooLong("address"));
        }

        if let Some(work) = &req.work
            && work.chars().count() > MAX_FIELD_CHARS
        {
            return Err(ValidationError::FieldTooLong("work"));
        }

        Ok(())
    }

    /// 全人物を取得
    pub async fn list(&self) -> Result<Vec<PersonResponse>, ServiceError> {
        let records = self.store.fetch_all().await?;
        Ok(records.into_iter().map(PersonResponse::from).collect())
    }

    /// idで人物を取得
    ///
    /// # Returns
    /// * `Ok(PersonResponse)` - 該当する人物
    /// * `Err(ServiceError::NotFound)` - 存在しない
    pub async fn get(&self, id: u64) -> Result<PersonResponse, ServiceError> {
        let record = self.store.fetch_one(id).await?;
        Ok(record.into())
    }

    /// 人物を部分更新し、更新後の全体を返す
    ///
    /// # 処理フロー
    /// 1. 既存レコードを取得（存在しなければNotFoundで打ち切り、書き込みは行わない）
    /// 2. リクエストに存在するフィールドだけを上書き（nameは対象外）
    /// 3. 突き合わせ結果を永続化
    ///
    /// 全フィールドが省略されたリクエストは無変更のまま既存レコードを返す。
    pub async fn update(
        &self,
        id: u64,
        req: &UpdatePersonRequest,
    ) -> Result<PersonResponse, ServiceError> {
        let mut record = self.store.fetch_one(id).await?;

        // 存在するフィールドのみ上書き。Noneは「変更しない」を意味する
        if let Some(age) = req.age {
            record.age = Some(age);
        }
        if let Some(address) = &req.address {
            record.address = Some(address.clone());
        }
        if let Some(work) = &req.work {
            record.work = Some(work.clone());
        }

        self.store.update(&record).await?;

        Ok(record.into())
    }

    /// idで人物を削除
    ///
    /// 削除前に存在確認を行い、存在しなければNotFoundを返す。
    pub async fn delete(&self, id: u64) -> Result<(), ServiceError> {
        self.store.fetch_one(id).await?;
        self.store.delete(id).await?;
        Ok(())
    }
}
