//! CourierConfig - 起動時に 1 回だけ組み立てる不変の設定
//!
//! 環境変数の読み取りはここだけで行い、Worker には値として渡します。
//! 処理中に環境変数を読み直すことはありません。

use std::fmt;
use std::time::Duration;

use crate::impls::PartitionKey;
use crate::observability::LogFormat;

/// `ORDER_DB_API` でこの値を指定すると lookup-then-patch 型のバックエンドを使う
pub const COSMOS_SQL_API: &str = "cosmosdbsql";

pub const DEFAULT_RECEIVE_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;
pub const DEFAULT_HTTP_PORT: u16 = 3003;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(String),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: String, value: String },
}

/// ログに出さない値
///
/// 値を読むのは実ドライバへの接続時だけ。in-memory 構成では保持するだけ。
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(#[allow(dead_code)] String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// バックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// 業務キー検索 → 部分パッチ（Cosmos SQL API 型）
    LookupPatch,
    /// フィルタ更新（Mongo 型）
    KeyedUpdate,
}

impl BackendKind {
    /// `ORDER_DB_API` の値から選ぶ（未設定・その他は KeyedUpdate）
    pub fn from_api(api: Option<&str>) -> Self {
        match api {
            Some(COSMOS_SQL_API) => BackendKind::LookupPatch,
            _ => BackendKind::KeyedUpdate,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::LookupPatch => f.write_str("lookup-patch"),
            BackendKind::KeyedUpdate => f.write_str("keyed-update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    WorkloadIdentity,
    Key(Secret),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    LookupPatch {
        container: String,
        partition: PartitionKey,
        credential: Credential,
    },
    KeyedUpdate {
        collection: String,
        username: Option<String>,
        password: Option<Secret>,
    },
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::LookupPatch { .. } => BackendKind::LookupPatch,
            BackendConfig::KeyedUpdate { .. } => BackendKind::KeyedUpdate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueConnection {
    ConnectionString(Secret),
    /// 完全修飾名前空間 + ワークロード ID
    Namespace(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub name: String,
    pub connection: QueueConnection,
}

/// Worker に渡す設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// ログ用のキュー名
    pub queue_name: String,
    /// receive 失敗後の待ち時間
    pub receive_backoff: Duration,
    /// dead-letter までの配送回数
    pub max_delivery_count: u32,
    /// in-transit 書き込みの後、shipments コレクションにも記録するか
    pub archive_shipments: bool,
}

impl WorkerConfig {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            receive_backoff: DEFAULT_RECEIVE_BACKOFF,
            max_delivery_count: DEFAULT_MAX_DELIVERY_COUNT,
            archive_shipments: false,
        }
    }
}

/// CourierConfig はプロセス全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub http_port: u16,
    pub log_format: LogFormat,
}

impl CourierConfig {
    /// プロセスの環境変数から読む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から読む（空文字は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let kind = BackendKind::from_api(env.optional("ORDER_DB_API").as_deref());
        let uri = env.required_any(&["AZURE_COSMOS_RESOURCEENDPOINT", "SHIPPING_DB_URI"])?;
        let name = env.required("SHIPPING_DB_NAME")?;

        let backend = match kind {
            BackendKind::LookupPatch => {
                let container = env.required("SHIPPING_DB_CONTAINER_NAME")?;
                let partition = PartitionKey::new(
                    env.required("SHIPPING_DB_PARTITION_KEY")?,
                    env.required("SHIPPING_DB_PARTITION_VALUE")?,
                );
                let credential = if env.flag("USE_WORKLOAD_IDENTITY_AUTH")? {
                    Credential::WorkloadIdentity
                } else {
                    Credential::Key(Secret::new(
                        env.optional("SHIPPING_DB_PASSWORD").unwrap_or_default(),
                    ))
                };
                BackendConfig::LookupPatch {
                    container,
                    partition,
                    credential,
                }
            }
            BackendKind::KeyedUpdate => BackendConfig::KeyedUpdate {
                collection: env.required("SHIPPING_DB_COLLECTION_NAME")?,
                username: env.optional("SHIPPING_DB_USERNAME"),
                password: env.optional("SHIPPING_DB_PASSWORD").map(Secret::new),
            },
        };

        let queue_name = env.required("SHIPPING_QUEUE_NAME")?;
        let connection = match env.optional("ASB_CONNECTION_STRING") {
            Some(conn) => QueueConnection::ConnectionString(Secret::new(conn)),
            None => QueueConnection::Namespace(
                env.required("AZURE_SERVICEBUS_FULLYQUALIFIEDNAMESPACE")?,
            ),
        };

        let worker = WorkerConfig {
            queue_name: queue_name.clone(),
            receive_backoff: env
                .parsed::<u64>("SHIPPING_RECEIVE_BACKOFF_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RECEIVE_BACKOFF),
            max_delivery_count: env
                .parsed("SHIPPING_MAX_DELIVERY_COUNT")?
                .unwrap_or(DEFAULT_MAX_DELIVERY_COUNT),
            archive_shipments: env.flag("SHIPPING_ARCHIVE_SHIPMENTS")?,
        };

        Ok(Self {
            database: DatabaseConfig { uri, name, backend },
            queue: QueueConfig {
                name: queue_name,
                connection,
            },
            worker,
            http_port: env.parsed("PORT")?.unwrap_or(DEFAULT_HTTP_PORT),
            log_format: env
                .optional("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    /// ローカル開発用の設定（in-memory バックエンド前提）
    pub fn development(kind: BackendKind) -> Self {
        let backend = match kind {
            BackendKind::LookupPatch => BackendConfig::LookupPatch {
                container: "orders".into(),
                partition: PartitionKey::new("/storeId", "pets"),
                credential: Credential::WorkloadIdentity,
            },
            BackendKind::KeyedUpdate => BackendConfig::KeyedUpdate {
                collection: "orders".into(),
                username: None,
                password: None,
            },
        };
        Self {
            database: DatabaseConfig {
                uri: "memory://".into(),
                name: "orderdb".into(),
                backend,
            },
            queue: QueueConfig {
                name: "shipping".into(),
                connection: QueueConnection::Namespace("memory".into()),
            },
            worker: WorkerConfig::new("shipping"),
            http_port: DEFAULT_HTTP_PORT,
            log_format: LogFormat::Pretty,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.database.backend.kind()
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    /// 先頭から順に見て、最初に設定されている値
    fn required_any(&self, names: &[&str]) -> Result<String, ConfigError> {
        names
            .iter()
            .find_map(|name| self.optional(name))
            .ok_or_else(|| ConfigError::Missing(names.join(" or ")))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        self.optional(name)
            .map(|value| {
                value.parse().map_err(|_| ConfigError::Invalid {
                    name: name.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<bool, ConfigError> {
        Ok(self.parsed::<bool>(name)?.unwrap_or(false))
    }
}
