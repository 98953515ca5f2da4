//! 人物レコードCRUD用HTTP APIサーバー
//!
//! 本バイナリは以下の機能を提供する:
//! - 人物の作成 (POST /api/v1/persons)
//! - 人物の一覧取得 (GET /api/v1/persons)
//! - 人物の取得 (GET /api/v1/persons/{id})
//! - 人物の部分更新 (PATCH /api/v1/persons/{id})
//! - 人物の削除 (DELETE /api/v1/persons/{id})
//! - 死活確認 (GET /ping)

mod config;
mod error;
mod service;
mod store;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use service::{
    CreatePersonRequest, PersonResponse, PersonService, ServiceError, UpdatePersonRequest,
    ValidationError,
};
pub use store::{NewPerson, PersonRecord, PersonStore, SqlitePersonStore, StoreError};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// アプリケーション状態
///
/// ルーター全体で共有される状態を保持する。
#[derive(Clone)]
pub struct AppState {
    /// 人物サービス
    pub service: Arc<PersonService<SqlitePersonStore>>,
}

/// 死活確認エンドポイント (GET /ping)
///
/// サーバーの死活確認用。固定のJSONを返す。
async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({"msg": "pong"}))
}

/// ServiceErrorをHTTPエラーレスポンスへ変換する
///
/// - Validation -> 400 Bad Request
/// - NotFound -> 404 Not Found
/// - Store -> 500 Internal Server Error（ストアのメッセージをそのまま返す）
fn service_error_response(context: &str, err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(e) => {
            tracing::warn!(error = %e, "{}", context);
            ApiError::bad_request(e.to_string()).into_response()
        }
        ServiceError::NotFound(id) => {
            tracing::warn!(id = id, "{}", context);
            ApiError::not_found(format!("人物が見つかりません: id={}", id)).into_response()
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "{}", context);
            ApiError::internal_error(e.to_string()).into_response()
        }
    }
}

/// パスパラメータのidをu64として解釈する
///
/// 数値として解釈できない場合は400 Bad Requestを返す。
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("不正なid: {}", raw)))
}

/// 人物作成エンドポイント (POST /api/v1/persons)
///
/// リクエストボディをバリデーションし、新しい人物を保存する。
/// 成功時はボディなし、Locationヘッダーに作成されたリソースのパスを設定する。
///
/// # Returns
/// - 201 Created: 人物が作成された（Location: /persons/{id}）
/// - 400 Bad Request: ボディが不正、またはバリデーション失敗
/// - 500 Internal Server Error: ストアエラー
async fn create_person(
    State(state): State<AppState>,
    body: Result<Json<CreatePersonRequest>, JsonRejection>,
) -> Response {
    tracing::info!("人物作成リクエストを受信");

    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "リクエストボディの解釈に失敗");
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };

    match state.service.create(&req).await {
        Ok(id) => {
            tracing::info!(id = id, "人物を新規作成");
            (
                StatusCode::CREATED,
                [(header::LOCATION, format!("/persons/{}", id))],
            )
                .into_response()
        }
        Err(e) => service_error_response("人物作成エラー", e),
    }
}

/// 人物一覧エンドポイント (GET /api/v1/persons)
///
/// 登録済みの全人物をJSON配列で返す。
///
/// # Returns
/// - 200 OK: 人物のリスト（0件なら空配列）
/// - 500 Internal Server Error: ストアエラー
async fn list_persons(State(state): State<AppState>) -> Response {
    tracing::info!("人物一覧リクエストを受信");

    match state.service.list().await {
        Ok(persons) => {
            tracing::info!(count = persons.len(), "人物一覧を返却");
            Json(persons).into_response()
        }
        Err(e) => service_error_response("人物一覧エラー", e),
    }
}

/// 人物取得エンドポイント (GET /api/v1/persons/{id})
///
/// 指定されたidの人物を返す。
///
/// # Returns
/// - 200 OK: 該当する人物
/// - 400 Bad Request: idが数値でない
/// - 404 Not Found: 人物が存在しない
/// - 500 Internal Server Error: ストアエラー
async fn get_person(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    tracing::info!(id = %id, "人物取得リクエストを受信");

    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(id = %id, "不正なidの取得リクエスト");
            return e.into_response();
        }
    };

    match state.service.get(id).await {
        Ok(person) => {
            tracing::info!(id = id, "人物を返却");
            Json(person).into_response()
        }
        Err(e) => service_error_response("人物取得エラー", e),
    }
}

/// 人物更新エンドポイント (PATCH /api/v1/persons/{id})
///
/// ボディに存在するフィールドだけを上書きし、更新後の人物全体を返す。
/// nameは更新対象外（ボディに含まれていても無視される）。
///
/// # Returns
/// - 200 OK: 更新後の人物全体
/// - 400 Bad Request: idが数値でない、またはボディが不正
/// - 404 Not Found: 人物が存在しない
/// - 500 Internal Server Error: ストアエラー
async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdatePersonRequest>, JsonRejection>,
) -> Response {
    tracing::info!(id = %id, "人物更新リクエストを受信");

    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(id = %id, "不正なidの更新リクエスト");
            return e.into_response();
        }
    };

    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!(id = id, error = %rejection.body_text(), "リクエストボディの解釈に失敗");
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };

    match state.service.update(id, &req).await {
        Ok(person) => {
            tracing::info!(id = id, "人物を更新");
            Json(person).into_response()
        }
        Err(e) => service_error_response("人物更新エラー", e),
    }
}

/// 人物削除エンドポイント (DELETE /api/v1/persons/{id})
///
/// 指定されたidの人物を削除する。
///
/// # Returns
/// - 204 No Content: 人物が削除された
/// - 400 Bad Request: idが数値でない
/// - 404 Not Found: 人物が存在しない
/// - 500 Internal Server Error: ストアエラー
async fn delete_person(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    tracing::info!(id = %id, "人物削除リクエストを受信");

    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(id = %id, "不正なidの削除リクエスト");
            return e.into_response();
        }
    };

    match state.service.delete(id).await {
        Ok(()) => {
            tracing::info!(id = id, "人物を削除");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => service_error_response("人物削除エラー", e),
    }
}

/// ルーターを構築する
///
/// /pingをルート直下に、人物リソースのルーティングを/api/v1配下に定義する。
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
///
/// # Arguments
/// * `service` - 人物サービス
pub fn create_router(service: Arc<PersonService<SqlitePersonStore>>) -> Router {
    let state = AppState { service };

    let persons_routes = Router::new()
        .route("/persons", post(create_person).get(list_persons))
        .route(
            "/persons/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        );

    Router::new()
        .route("/ping", get(ping))
        .nest("/api/v1", persons_routes)
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
/// axum::serve の with_graceful_shutdown() と組み合わせて使用することで、
/// 新規リクエストの受付停止と処理中リクエストの完了待機を実現する。
///
/// # Panics
/// シグナルハンドラーの登録に失敗した場合はパニックする。
async fn shutdown_signal() {
    // Ctrl+C (SIGINT) を待機
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Ctrl+C シグナルハンドラーの登録に失敗しました");
    };

    // SIGTERM を待機 (Unix系OSのみ)
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM シグナルハンドラーの登録に失敗しました")
            .recv()
            .await;
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            tracing::info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// メイン関数
///
/// トレーシングを初期化し、HTTPサーバーを起動する。
/// SIGTERMまたはCtrl+Cを受信するとgraceful shutdownを実行し、
/// 処理中のリクエスト完了を待ってからSQLiteコネクションを正常にクローズする。
///
/// # 環境変数
/// - `HOST`: リッスンホスト（デフォルト: 0.0.0.0）
/// - `PORT`: リッスンポート（デフォルト: 8080）
/// - `DB_PATH`: データベースファイルのパス（デフォルト: /var/lib/persons/persons.db）
/// - `RUST_LOG`: ログレベル（デフォルト: info）
#[tokio::main]
async fn main() {
    // 構造化ログの初期化
    // RUST_LOG環境変数でログレベルを制御（デフォルト: info）
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("人物APIサーバーを起動します");

    // サーバー設定を環境変数から読み込み
    let config = ServerConfig::from_env().expect("サーバー設定の読み込みに失敗しました");
    tracing::info!(
        host = config.host(),
        port = config.port(),
        db_path = config.db_path(),
        "サーバー設定を読み込みました"
    );

    // SQLite人物ストアを初期化
    let store = SqlitePersonStore::new(config.db_path())
        .await
        .expect("SQLiteストアの初期化に失敗しました");
    let service = Arc::new(PersonService::new(store));
    tracing::info!("SQLiteストアを初期化しました");

    let app = create_router(service);

    let addr = config.listen_addr();
    tracing::info!("リッスン開始: {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("アドレスのバインドに失敗しました");

    // graceful shutdownを有効にしてサーバーを起動
    // shutdown_signal()がシグナルを受信すると:
    // 1. 新規コネクションの受付を停止
    // 2. 処理中のリクエストの完了を待機
    // 3. サーバーが終了し、SQLiteコネクション（Arc経由で保持）が自動的にドロップされる
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("サーバーの起動に失敗しました");

    tracing::info!("サーバーが正常に停止しました");
}
