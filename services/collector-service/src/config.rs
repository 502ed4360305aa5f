use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub(crate) struct CollectorConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_path: Option<PathBuf>,
    pub(crate) allowed_origin: String,
}

impl CollectorConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("COLLECTOR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("invalid COLLECTOR_BIND_ADDR '{bind_addr}'"))?;

        let db_path = lookup("COLLECTOR_DB_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let allowed_origin =
            lookup("COLLECTOR_ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_owned());

        Ok(Self {
            bind_addr,
            db_path,
            allowed_origin,
        })
    }
}
