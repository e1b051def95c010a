//! repackage HTTP server
//!
//! Serves `POST /convert`, turning remote `.tar.zst` archives into ZIP files.

use clap::{Parser, ValueEnum};
use repackage::config::{
    ApiConfig, DeliveryConfig, FetchConfig, OutputCompression, ServiceConfig, TranscodeConfig,
};
use repackage::{Config, DeliveryMode, ObjectStore, Repackager, S3Store, StorageConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "repackage-server")]
#[command(about = "Convert remote .tar.zst archives to ZIP over HTTP", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "REPACKAGE_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// How converted archives are delivered
    #[arg(long, env = "REPACKAGE_DELIVERY", value_enum, default_value_t = Delivery::Inline)]
    delivery: Delivery,

    /// Lifetime of presigned URLs, in seconds
    #[arg(long, env = "REPACKAGE_PRESIGN_EXPIRY", default_value_t = 3600)]
    presign_expiry_secs: u64,

    /// Prefix prepended to object keys
    #[arg(long, env = "REPACKAGE_KEY_PREFIX", default_value = "")]
    key_prefix: String,

    /// S3-compatible endpoint URL
    #[arg(
        long,
        env = "REPACKAGE_S3_ENDPOINT",
        default_value = "https://s3.us-west-000.backblazeb2.com"
    )]
    s3_endpoint: String,

    /// Storage region
    #[arg(long, env = "REPACKAGE_S3_REGION", default_value = "us-west-000")]
    s3_region: String,

    /// Bucket for converted archives (enables object storage)
    #[arg(long, env = "REPACKAGE_S3_BUCKET")]
    s3_bucket: Option<String>,

    /// Access key ID
    #[arg(long, env = "B2_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "B2_APPLICATION_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Use virtual-hosted-style bucket addressing instead of path style
    #[arg(long, env = "REPACKAGE_S3_VIRTUAL_HOST")]
    s3_virtual_host: bool,

    /// ZIP entry compression
    #[arg(long, env = "REPACKAGE_COMPRESSION", value_enum, default_value_t = Compression::Deflated)]
    compression: Compression,

    /// Deflate level, 0-9
    #[arg(long, env = "REPACKAGE_COMPRESSION_LEVEL")]
    compression_level: Option<i32>,

    /// Timeout for the whole source download, in seconds
    #[arg(long, env = "REPACKAGE_FETCH_TIMEOUT", default_value_t = 300)]
    fetch_timeout_secs: u64,

    /// Timeout for a whole conversion request, in seconds
    #[arg(long, env = "REPACKAGE_REQUEST_TIMEOUT", default_value_t = 600)]
    request_timeout_secs: u64,

    /// Allowed CORS origins; enables CORS when given
    #[arg(long = "cors-origin", env = "REPACKAGE_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Delivery {
    Inline,
    Presigned,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Compression {
    Stored,
    Deflated,
}

impl Args {
    fn into_config(self) -> Result<Config, String> {
        let storage = match (self.s3_bucket, self.access_key_id, self.secret_access_key) {
            (None, _, _) => None,
            (Some(bucket), Some(access_key_id), Some(secret_access_key)) => Some(StorageConfig {
                endpoint: self.s3_endpoint,
                region: self.s3_region,
                bucket,
                access_key_id,
                secret_access_key,
                force_path_style: !self.s3_virtual_host,
            }),
            (Some(_), _, _) => {
                return Err(
                    "a bucket requires both B2_KEY_ID and B2_APPLICATION_KEY (or --access-key-id / --secret-access-key)"
                        .to_string(),
                );
            }
        };

        Ok(Config {
            fetch: FetchConfig {
                timeout: Duration::from_secs(self.fetch_timeout_secs),
                ..Default::default()
            },
            transcode: TranscodeConfig {
                compression: match self.compression {
                    Compression::Stored => OutputCompression::Stored,
                    Compression::Deflated => OutputCompression::Deflated,
                },
                compression_level: self.compression_level,
                ..Default::default()
            },
            delivery: DeliveryConfig {
                mode: match self.delivery {
                    Delivery::Inline => DeliveryMode::Inline,
                    Delivery::Presigned => DeliveryMode::Presigned,
                },
                presign_expiry: Duration::from_secs(self.presign_expiry_secs),
                key_prefix: self.key_prefix,
            },
            storage,
            api: ApiConfig {
                bind_address: self.bind,
                cors_enabled: !self.cors_origins.is_empty(),
                cors_origins: self.cors_origins,
            },
            service: ServiceConfig {
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        delivery = ?config.delivery.mode,
        "Starting repackage server"
    );

    let store = config
        .storage
        .as_ref()
        .map(|storage| Arc::new(S3Store::new(storage)) as Arc<dyn ObjectStore>);

    let config = Arc::new(config);
    let repackager = Arc::new(Repackager::new(&config, store)?);

    repackage::api::start_api_server(repackager, config, repackage::shutdown_signal()).await?;

    Ok(())
}
