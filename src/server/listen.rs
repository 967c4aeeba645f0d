use crate::shared::error::{codes, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl ListenAddress {
    pub fn display(&self) -> String {
        format_host_port(&self.host, self.port)
    }
}

pub fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::" | "")
}

pub fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(codes::CONFIG_ERROR, message)
}

fn parse_port(raw: &str) -> AppResult<u16> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("invalid listen port: {raw}")))?;
    if port == 0 {
        return Err(invalid("listen port must be > 0"));
    }
    Ok(port)
}

/// Accepts `host:port`, `[ipv6]:port` or `:port` (all interfaces).
pub fn parse_listen_address(input: &str) -> AppResult<ListenAddress> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(invalid("listen address is empty"));
    }
    if raw.contains("://") || raw.contains('/') {
        return Err(invalid("listen address must be host:port"));
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let idx = rest
            .find(']')
            .ok_or_else(|| invalid("invalid IPv6 address: missing closing ']'"))?;
        let host = rest[..idx].trim();
        if host.is_empty() {
            return Err(invalid("listen address missing host"));
        }
        let port_raw = rest[idx + 1..]
            .trim()
            .strip_prefix(':')
            .ok_or_else(|| invalid("listen address must be [ipv6]:port"))?;
        return Ok(ListenAddress {
            host: host.to_string(),
            port: parse_port(port_raw)?,
        });
    }

    match raw.split(':').collect::<Vec<_>>().as_slice() {
        [host, port_raw] => {
            let host = host.trim();
            Ok(ListenAddress {
                host: if host.is_empty() { "0.0.0.0" } else { host }.to_string(),
                port: parse_port(port_raw)?,
            })
        }
        [_] => Err(invalid("listen address missing port")),
        _ => Err(invalid("IPv6 must use [addr]:port")),
    }
}
