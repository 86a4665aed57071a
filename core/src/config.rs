use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use color_eyre::eyre::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;

use crate::view::SortKey;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlServer {
    address: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    max_upload_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlDataDir {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlClient {
    api_url: Option<String>,
    default_sort: Option<String>,
    bcrypt_cost: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlConfig {
    #[serde(rename = "Server")]
    server: Option<TomlServer>,
    #[serde(rename = "DataDir")]
    data_dir: Option<TomlDataDir>,
    #[serde(rename = "Client")]
    client: Option<TomlClient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: Option<String>,
    pub port: u16,
    /// Base of the urls handed out for uploaded files, defaults to the listening address
    pub public_url: Option<String>,
    pub max_upload_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    /// Relative paths are relative to the config file's directory
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub default_sort: SortKey,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub data_dir: DataDir,
    pub client: ClientConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: None,
            port: DEFAULT_PORT,
            public_url: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl Default for DataDir {
    fn default() -> Self {
        DataDir {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_owned(),
            default_sort: SortKey::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            data_dir: DataDir::default(),
            client: ClientConfig::default(),
        }
    }
}

pub async fn read_config(path: &Path) -> Result<Config> {
    let toml_str = tokio::fs::read_to_string(path)
        .await
        .context(format!("Error reading config file {}", path))?;
    parse_config(&toml_str)
}

pub fn parse_config(toml_str: &str) -> Result<Config> {
    let toml_config: TomlConfig = toml::from_str(toml_str).context("Error parsing config file")?;
    let server = match toml_config.server {
        None => ServerConfig::default(),
        Some(server) => {
            let max_upload_size = server
                .max_upload_size
                .map(|s| {
                    parse_size::parse_size(&s)
                        .wrap_err(format!("Invalid max_upload_size '{}'", s))
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);
            ServerConfig {
                address: server.address,
                port: server.port.unwrap_or(DEFAULT_PORT),
                public_url: server.public_url,
                max_upload_size,
            }
        }
    };
    let data_dir = toml_config
        .data_dir
        .map(|data_dir| DataDir {
            path: data_dir.path.into(),
        })
        .unwrap_or_default();
    let client = match toml_config.client {
        None => ClientConfig::default(),
        Some(client) => {
            let defaults = ClientConfig::default();
            let default_sort = client
                .default_sort
                .map(|s| SortKey::from_str(&s).wrap_err(format!("Invalid default_sort '{}'", s)))
                .transpose()?
                .unwrap_or(defaults.default_sort);
            ClientConfig {
                api_url: client.api_url.unwrap_or(defaults.api_url),
                default_sort,
                bcrypt_cost: client.bcrypt_cost.unwrap_or(defaults.bcrypt_cost),
            }
        }
    };
    Ok(Config {
        server,
        data_dir,
        client,
    })
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = assert_ok!(parse_config(""));
        assert_eq!(config, Config::default());
        assert_eq!(config.client.api_url, "http://localhost:5000");
    }

    #[test]
    fn full_config() {
        let config = assert_ok!(parse_config(
            r#"
[Server]
address = "0.0.0.0"
port = 8080
public_url = "https://photos.example.com"
max_upload_size = "10 MiB"

[DataDir]
path = "/var/lib/folio"

[Client]
api_url = "https://photos.example.com"
default_sort = "title"
bcrypt_cost = 6
"#
        ));
        assert_eq!(config.server.address.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.data_dir.path, PathBuf::from("/var/lib/folio"));
        assert_eq!(config.client.default_sort, SortKey::Title);
        assert_eq!(config.client.bcrypt_cost, 6);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert_err!(parse_config("[Client]\ndefault_sort = \"random\"\n"));
        assert_err!(parse_config("[Server]\nmax_upload_size = \"lots\"\n"));
    }

    #[tokio::test]
    async fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = PathBuf::from_path_buf(dir.path().join("folio.toml")).unwrap();
        tokio::fs::write(&path, "[Server]\nport = 5050\n").await.unwrap();
        let config = assert_ok!(read_config(&path).await);
        assert_eq!(config.server.port, 5050);
        assert_err!(read_config(&path.with_file_name("missing.toml")).await);
    }
}
