//! Development server configuration.
//!
//! Derived from the `dev` section of the site config plus CLI flags.

use crate::config::SiteConfig;
use crate::dev::debounce::DebounceTiming;
use crate::error::{ConfigError, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Grace period after a released batch before the next one may fire.
pub const REBUILD_COOLDOWN_MS: u64 = 1_000;

/// How many ports above the requested one are tried.
const PORT_SEARCH_SPAN: u16 = 10;

#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Server socket address (IP + port)
    pub addr: SocketAddr,

    /// Open browser automatically on start
    pub open: bool,

    /// Debounce window and cooldown for the watcher
    pub timing: DebounceTiming,

    /// Delay between `build-complete` and `reload`
    pub reload_delay: Duration,

    /// Delay before a fresh watcher is attached after a rebuild
    pub reattach_delay: Duration,
}

impl DevConfig {
    /// Resolve the dev settings, binding-probing for a free port.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested port and the next ten are all taken.
    pub fn from_site(config: &SiteConfig, open: bool) -> Result<Self> {
        let addr = Self::find_available_port(config.dev.port)?;
        Ok(Self::with_addr(config, addr, open))
    }

    /// Same as [`DevConfig::from_site`] with a fixed address.
    pub fn with_addr(config: &SiteConfig, addr: SocketAddr, open: bool) -> Self {
        Self {
            addr,
            open,
            timing: DebounceTiming::from_millis(config.dev.debounce_ms, REBUILD_COOLDOWN_MS),
            reload_delay: Duration::from_millis(config.dev.reload_delay_ms),
            reattach_delay: Duration::from_millis(config.dev.reattach_delay_ms),
        }
    }

    /// Find an available port starting from the requested port.
    ///
    /// Tries the requested port first, then the next ten.
    pub fn find_available_port(requested_port: u16) -> Result<SocketAddr> {
        use std::net::TcpListener;

        if requested_port < 1024 {
            crate::ui::warning(&format!(
                "Port {} is in privileged range, may require root access",
                requested_port
            ));
        }

        for offset in 0..=PORT_SEARCH_SPAN {
            let port = requested_port.saturating_add(offset);
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            if TcpListener::bind(addr).is_ok() {
                if offset > 0 {
                    crate::ui::warning(&format!(
                        "Port {} is busy, using port {} instead",
                        requested_port, port
                    ));
                }
                return Ok(addr);
            }
        }

        Err(ConfigError::InvalidValue {
            field: "dev.port".to_string(),
            value: requested_port.to_string(),
            hint: format!(
                "Ports {}-{} are all in use. Free one or pick another with --port.",
                requested_port,
                requested_port.saturating_add(PORT_SEARCH_SPAN)
            ),
        }
        .into())
    }

    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_find_available_port_success() {
        let listener = match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("Skipping: unable to bind socket ({})", err);
                return;
            }
        };

        let start_port = listener.local_addr().unwrap().port();
        drop(listener);

        let addr = DevConfig::find_available_port(start_port).expect("should find port");
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert!(addr.port() >= start_port);
    }

    #[test]
    fn test_busy_port_falls_through() {
        let listener = match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(_) => return,
        };
        let busy = listener.local_addr().unwrap().port();
        if busy > u16::MAX - PORT_SEARCH_SPAN {
            return;
        }

        let addr = DevConfig::find_available_port(busy).expect("should find port");
        assert_ne!(addr.port(), busy);
        assert!(addr.port() <= busy + PORT_SEARCH_SPAN);
    }

    #[test]
    fn test_with_addr_uses_dev_settings() {
        let mut site = SiteConfig::default_config();
        site.dev.debounce_ms = 250;
        site.dev.reload_delay_ms = 100;
        site.dev.reattach_delay_ms = 2000;

        let config = DevConfig::with_addr(&site, "127.0.0.1:3000".parse().unwrap(), false);

        assert_eq!(config.server_url(), "http://127.0.0.1:3000");
        assert_eq!(config.timing.window, Duration::from_millis(250));
        assert_eq!(config.reload_delay, Duration::from_millis(100));
        assert_eq!(config.reattach_delay, Duration::from_secs(2));
    }
}
