use crate::codec::{ETHERNET_HEADER_LEN, MAX_WIRE_FRAME_LEN};
use crate::error::NetError;
use serde::Deserialize;
use smoltcp::wire::EthernetAddress;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// Standard ethernet MTU.
pub const DEFAULT_MTU: u32 = 1500;

/// Default listening port for peer connections.
pub const DEFAULT_PORT: u16 = 7777;

/// Configuration for a bridge instance.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where to accept peer connections
    pub listen: ListenAddr,
    /// Maximum payload size, excluding the ethernet header
    pub mtu: u32,
    /// Hardware address of the endpoint
    pub mac: MacAddr,
    /// Log every frame crossing the link
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: ListenAddr::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))),
            mtu: DEFAULT_MTU,
            mac: MacAddr([0x52, 0x54, 0x00, 0x00, 0x00, 0x01]),
            debug: false,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), NetError> {
        validate_mtu(self.mtu)?;
        if !self.mac.ethernet().is_unicast() {
            return Err(NetError::InvalidConfig(format!(
                "mac address {} is not unicast",
                self.mac
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_mtu(mtu: u32) -> Result<(), NetError> {
    if mtu == 0 {
        return Err(NetError::InvalidConfig("mtu must be at least 1".to_string()));
    }
    let max_mtu = MAX_WIRE_FRAME_LEN - ETHERNET_HEADER_LEN;
    if mtu as usize > max_mtu {
        return Err(NetError::InvalidConfig(format!(
            "mtu cannot exceed {max_mtu}"
        )));
    }
    Ok(())
}

/// Address the bridge listens on for its peer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl FromStr for ListenAddr {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, NetError> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(NetError::InvalidConfig(
                    "unix socket path cannot be empty".to_string(),
                ));
            }
            return Ok(ListenAddr::Unix(PathBuf::from(path)));
        }

        let addr = s.strip_prefix("tcp:").unwrap_or(s);
        addr.parse()
            .map(ListenAddr::Tcp)
            .map_err(|_| NetError::InvalidConfig(format!("'{s}' is not a valid listen address")))
    }
}

impl TryFrom<String> for ListenAddr {
    type Error = NetError;

    fn try_from(s: String) -> Result<Self, NetError> {
        s.parse()
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => write!(f, "tcp:{addr}"),
            ListenAddr::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// A 48-bit hardware address, written as `aa:bb:cc:dd:ee:ff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn ethernet(&self) -> EthernetAddress {
        EthernetAddress(self.0)
    }
}

impl From<MacAddr> for EthernetAddress {
    fn from(mac: MacAddr) -> Self {
        mac.ethernet()
    }
}

impl FromStr for MacAddr {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, NetError> {
        s.parse::<EthernetAddress>()
            .map(|addr| MacAddr(addr.0))
            .map_err(|()| NetError::InvalidConfig(format!("'{s}' is not a valid mac address")))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = NetError;

    fn try_from(s: String) -> Result<Self, NetError> {
        s.parse()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mac_addr {
        use super::*;

        #[test]
        fn parses_colon_and_dash_forms() {
            let expected = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
            assert_eq!("AA:BB:CC:DD:EE:FF".parse::<MacAddr>().unwrap(), expected);
            assert_eq!("aa-bb-cc-dd-ee-ff".parse::<MacAddr>().unwrap(), expected);
        }

        #[test]
        fn parses_like_ethernet_address() {
            for input in ["AA:BB:CC:DD:EE:FF", "aa-bb-cc-dd-ee-ff", "2:0:0:0:0:1"] {
                let mac: MacAddr = input.parse().unwrap();
                let ethernet: EthernetAddress = input.parse().unwrap();
                assert_eq!(mac.ethernet(), ethernet);
            }
        }

        #[test]
        fn display_differs_from_ethernet_address() {
            let mac: MacAddr = "aa-bb-cc-dd-ee-ff".parse().unwrap();
            assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
            assert_eq!(mac.ethernet().to_string(), "aa-bb-cc-dd-ee-ff");
        }

        #[test]
        fn display_is_lowercase_colon_separated() {
            let mac = MacAddr([0x52, 0x54, 0x00, 0x0A, 0x0B, 0x0C]);
            assert_eq!(mac.to_string(), "52:54:00:0a:0b:0c");
        }

        #[test]
        fn rejects_malformed_addresses() {
            for input in [
                "",
                "aa:bb:cc:dd:ee",
                "aa:bb:cc:dd:ee:ff:00",
                "aa:bb:cc:dd:ee:gg",
                "aa:bb:cc-dd:ee:ff",
                "100:bb:cc:dd:ee:ff",
            ] {
                assert!(input.parse::<MacAddr>().is_err(), "accepted {input:?}");
            }
        }
    }

    mod listen_addr {
        use super::*;

        #[test]
        fn parses_tcp_forms() {
            let expected = ListenAddr::Tcp("127.0.0.1:9000".parse().unwrap());
            assert_eq!("127.0.0.1:9000".parse::<ListenAddr>().unwrap(), expected);
            assert_eq!("tcp:127.0.0.1:9000".parse::<ListenAddr>().unwrap(), expected);
        }

        #[test]
        fn parses_unix_form() {
            assert_eq!(
                "unix:/tmp/tap.sock".parse::<ListenAddr>().unwrap(),
                ListenAddr::Unix(PathBuf::from("/tmp/tap.sock"))
            );
        }

        #[test]
        fn rejects_empty_unix_path_and_garbage() {
            assert!("unix:".parse::<ListenAddr>().is_err());
            assert!("localhost".parse::<ListenAddr>().is_err());
        }

        #[test]
        fn display_round_trips() {
            for input in ["tcp:10.0.0.1:80", "unix:/run/tap.sock"] {
                let addr: ListenAddr = input.parse().unwrap();
                assert_eq!(addr.to_string(), input);
            }
        }
    }

    mod validate {
        use super::*;

        #[test]
        fn default_config_is_valid() {
            BridgeConfig::default().validate().unwrap();
        }

        #[test]
        fn rejects_zero_mtu() {
            let config = BridgeConfig {
                mtu: 0,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(NetError::InvalidConfig(_))));
        }

        #[test]
        fn mtu_limited_by_length_field() {
            let config = BridgeConfig {
                mtu: 65521,
                ..Default::default()
            };
            config.validate().unwrap();

            let config = BridgeConfig {
                mtu: 65522,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn rejects_multicast_mac() {
            let config = BridgeConfig {
                mac: MacAddr([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }
}
