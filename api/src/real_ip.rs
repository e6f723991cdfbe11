// Borrow a lot of code from crates.io
// https://github.com/rust-lang/crates.io/blob/986d296f910c2ed821be907b1e32a120c03338cb/src/real_ip.rs

use axum::{extract::ConnectInfo, http::request::Parts};
use std::net::{IpAddr, SocketAddr};

use crate::{App, error::AppError};

pub struct ClientIp(pub IpAddr);

impl axum::extract::FromRequestParts<App> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let mut x_forwarded_for_ips = parts
            .headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(','))
            .filter_map(|ip| ip.trim().parse::<IpAddr>().ok())
            .filter(|ip| match ip {
                IpAddr::V4(ip) => !ip.is_private() && !ip.is_loopback(),
                IpAddr::V6(_) => true,
            });

        // Get the originating client IP address from the headers, which is the
        // left-most non-private IP address in the X-Forwarded-For header.
        let client_ip = x_forwarded_for_ips.next();

        // Get the proxy IP address from the headers, which is the right-most
        // IP address that was appended by the reverse proxy
        let supposedly_proxy_ip = x_forwarded_for_ips.next_back();

        let is_trusted_proxy = |ip: &IpAddr| {
            state
                .config
                .trusted_proxies
                .iter()
                .any(|trusted| trusted.contains(*ip))
        };

        Ok(ClientIp(match (client_ip, supposedly_proxy_ip) {
            (Some(client_ip), Some(proxy_ip)) if is_trusted_proxy(&proxy_ip) => client_ip,
            (Some(client_ip), proxy_ip) => {
                tracing::warn!(
                    ?client_ip,
                    ?proxy_ip,
                    "Request from untrusted proxy, using the untrusted client IP"
                );
                client_ip
            }
            (None, _) => {
                let socket_ip: IpAddr = parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .ok_or("couldn't get connecting socket IP")?
                    .0
                    .ip();

                tracing::warn!(
                    ?socket_ip,
                    "No client IP found in X-Forwarded-For headers, using socket IP"
                );
                socket_ip
            }
        }))
    }
}
