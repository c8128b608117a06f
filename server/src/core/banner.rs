//! Startup banner and URL display

use super::config::is_all_interfaces;
use super::constants::APP_NAME;

/// What the banner shows besides the URLs
pub struct BannerInfo<'a> {
    pub host: &'a str,
    pub port: u16,
    pub auth_enabled: bool,
    pub oracle_enabled: bool,
    pub data_dir: &'a str,
    pub warehouse: &'a str,
    pub table: &'a str,
    pub rows: u64,
}

/// Print the startup banner with URLs
pub fn print_banner(info: &BannerInfo<'_>) {
    let BannerInfo { host, port, .. } = *info;
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    const W: usize = 10;

    let api_url = format!("http://{}:{}/api/v1", display_host, port);
    let docs_url = format!("http://{}:{}/api/docs", display_host, port);
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "API:",
        terminal_link(&api_url)
    );
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "Docs:",
        terminal_link(&docs_url)
    );

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    } else if is_all_interfaces(host) {
        if let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            for (_, ip) in interfaces
                .iter()
                .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
            {
                let network_url = format!("http://{}:{}/api/v1", ip, port);
                println!(
                    "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
                    "Network:",
                    terminal_link(&network_url)
                );
            }
        }
    } else {
        let network_url = format!("http://{}:{}/api/v1", host, port);
        println!(
            "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
            "Network:",
            terminal_link(&network_url)
        );
    }

    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {} \x1b[90m({}, {} rows)\x1b[0m",
        "Warehouse:", info.warehouse, info.table, info.rows
    );
    println!(
        "  \x1b[90m➜  {:<W$} {}\x1b[0m",
        "Auth:",
        on_off(info.auth_enabled)
    );
    println!(
        "  \x1b[90m➜  {:<W$} {}\x1b[0m",
        "Oracle:",
        on_off(info.oracle_enabled)
    );
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", info.data_dir);
    println!();
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

/// Clickable link (OSC 8) when the terminal supports it, else plain cyan
fn terminal_link(url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        format!("\x1b]8;;{}\x07\x1b[36m{}\x1b[0m\x1b]8;;\x07", url, url)
    } else {
        format!("\x1b[36m{}\x1b[0m", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_link_contains_url() {
        let link = terminal_link("http://localhost:5480/api/v1");
        assert!(link.contains("http://localhost:5480/api/v1"));
        assert!(link.ends_with("\x1b[0m") || link.ends_with("\x07"));
    }

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(true), "enabled");
        assert_eq!(on_off(false), "disabled");
    }
}
