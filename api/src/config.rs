use std::path::PathBuf;

use ipnetwork::IpNetwork;

#[derive(Clone)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub listen_port: u16,
    pub cors_origin: Option<String>,
    pub admin: Option<AdminCredentials>,
    /// Admin sessions expire after this much inactivity.
    pub session_idle: chrono::Duration,
    /// Proxies whose X-Forwarded-For headers we trust.
    pub trusted_proxies: Vec<IpNetwork>,
    pub media_dir: PathBuf,
}

pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Either all or none variables are set
fn all_or_none_vars(keys: Vec<&str>) -> Option<Vec<String>> {
    keys.iter().fold(None, |accum, k| match var(k) {
        Ok(Some(val)) => match accum {
            Some(mut l) => {
                l.push(val);
                Some(l)
            }
            None => Some(vec![val]),
        },
        _ => match accum {
            Some(_) => {
                tracing::error!(
                    "Environment variable `{k}` is required if variables {keys:?} are present"
                );
                None
            }
            None => None,
        },
    })
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let admin = all_or_none_vars(vec!["ADMIN_EMAIL", "ADMIN_PASSWORD"]).map(|mut vars| {
            AdminCredentials {
                email: vars.remove(0),
                password: vars.remove(0),
            }
        });

        if admin.is_none() {
            tracing::warn!(
                "ADMIN_EMAIL/ADMIN_PASSWORD not set, the admin surface will reject all logins"
            );
        }

        let session_idle_minutes = var("ADMIN_SESSION_IDLE_MINUTES")
            .ok()
            .flatten()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);

        let trusted_proxies = var("TRUSTED_PROXY_CIDRS")
            .ok()
            .flatten()
            .map(|list| {
                list.split(',')
                    .filter_map(|cidr| match cidr.trim().parse::<IpNetwork>() {
                        Ok(network) => Some(network),
                        Err(error) => {
                            tracing::warn!(%error, cidr, "Failed to parse trusted proxy CIDR");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        ServerConfig {
            env: match var("ENVIRONMENT") {
                Ok(Some(env)) => match env.as_str() {
                    "dev" => Env::Dev,
                    "staging" => Env::Staging,
                    "production" => Env::Production,
                    _ => Env::Dev,
                },
                _ => Env::Dev,
            },
            database_url: required_var("DATABASE_URL"),
            listen_port: var("PORT")
                .ok()
                .flatten()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            cors_origin: var("CORS_ORIGIN").ok().flatten(),
            admin,
            session_idle: chrono::Duration::minutes(session_idle_minutes),
            trusted_proxies,
            media_dir: var("MEDIA_DIR")
                .ok()
                .flatten()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./media")),
        }
    }
}
