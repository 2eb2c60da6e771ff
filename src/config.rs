use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub imgur: ImgurConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgurConfig {
    pub client_id: String,
    #[serde(default = "default_imgur_base_url")]
    pub base_url: String,
    /// 图片上传请求超时（秒）
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// 上传令牌 HMAC 密钥
    #[serde(default)]
    pub secret_key: String,
    /// 开启后上传接口要求携带有效的签名令牌
    #[serde(default)]
    pub require_upload_token: bool,
    /// 生产环境下 cookie 需要加 Secure 标记
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_imgur_base_url() -> String {
    "https://api.imgur.com".to_string()
}

fn default_upload_timeout() -> u64 {
    30
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                let database_url = env::var("DATABASE_URL")
                    .map_err(|_| "缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    imgur: ImgurConfig {
                        client_id: env::var("IMGUR_CLIENT_ID").unwrap_or_default(),
                        base_url: env::var("IMGUR_BASE_URL")
                            .unwrap_or_else(|_| default_imgur_base_url()),
                        upload_timeout_secs: get_env_parse("IMGUR_UPLOAD_TIMEOUT_SECS", 30u64),
                    },
                    auth: AuthConfig {
                        secret_key: env::var("SECRET_KEY").unwrap_or_default(),
                        require_upload_token: get_env_parse("REQUIRE_UPLOAD_TOKEN", false),
                        cookie_secure: get_env_parse("COOKIE_SECURE", false),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("IMGUR_CLIENT_ID") {
            config.imgur.client_id = v;
        }
        if let Ok(v) = env::var("IMGUR_BASE_URL") {
            config.imgur.base_url = v;
        }
        if let Ok(v) = env::var("IMGUR_UPLOAD_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.imgur.upload_timeout_secs = n;
            }
        }
        if let Ok(v) = env::var("SECRET_KEY") {
            config.auth.secret_key = v;
        }
        if let Ok(v) = env::var("REQUIRE_UPLOAD_TOKEN") {
            if let Ok(b) = v.parse() {
                config.auth.require_upload_token = b;
            }
        }
        if let Ok(v) = env::var("COOKIE_SECURE") {
            if let Ok(b) = v.parse() {
                config.auth.cookie_secure = b;
            }
        }

        Ok(config)
    }
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
