//! Command-line configuration.
//!
//! All options are read once at startup and stay immutable for the
//! process lifetime; components receive what they need by value.

use clap::Parser;

/// Announce a VIP from whichever peer currently holds the etcd election.
#[derive(Parser, Debug, Clone)]
#[command(name = "vipd", version, about)]
pub struct Config {
    /// Election key prefix shared by every peer contending for the VIP
    #[arg(long = "name", default_value = "/vipd/")]
    pub prefix: String,

    /// Unique name for this instance
    #[arg(long, default_value = "hostname")]
    pub member: String,

    /// VIP to announce, in CIDR notation
    #[arg(long, default_value = "192.168.0.254/32")]
    pub vip: String,

    /// Interface to announce the VIP from
    #[arg(long, default_value = "eth0")]
    pub vif: String,

    /// etcd address(es), comma separated
    #[arg(long = "etcd", default_value = "https://127.0.0.1:2379")]
    pub etcd_endpoints: String,

    /// etcd CA cert
    #[arg(long, default_value = "ca.crt")]
    pub cacert: String,

    /// etcd cert file
    #[arg(long, default_value = "server.crt")]
    pub cert: String,

    /// etcd key file
    #[arg(long, default_value = "server.key")]
    pub key: String,
}

impl Config {
    /// The configured etcd endpoints as a list.
    pub fn endpoints(&self) -> Vec<String> {
        self.etcd_endpoints
            .split(',')
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["vipd"]);
        assert_eq!(config.prefix, "/vipd/");
        assert_eq!(config.member, "hostname");
        assert_eq!(config.vip, "192.168.0.254/32");
        assert_eq!(config.vif, "eth0");
        assert_eq!(config.endpoints(), vec!["https://127.0.0.1:2379"]);
    }

    #[test]
    fn test_endpoint_splitting() {
        let config = Config::parse_from([
            "vipd",
            "--etcd",
            "https://10.0.0.1:2379,https://10.0.0.2:2379, https://10.0.0.3:2379",
        ]);
        assert_eq!(
            config.endpoints(),
            vec![
                "https://10.0.0.1:2379",
                "https://10.0.0.2:2379",
                "https://10.0.0.3:2379"
            ]
        );
    }

    #[test]
    fn test_endpoint_splitting_skips_empty_entries() {
        let config = Config::parse_from(["vipd", "--etcd", "https://10.0.0.1:2379,,"]);
        assert_eq!(config.endpoints(), vec!["https://10.0.0.1:2379"]);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "vipd", "--name", "/ha/", "--member", "node-1", "--vip", "10.0.0.100/32", "--vif",
            "bond0",
        ]);
        assert_eq!(config.prefix, "/ha/");
        assert_eq!(config.member, "node-1");
        assert_eq!(config.vip, "10.0.0.100/32");
        assert_eq!(config.vif, "bond0");
    }
}
