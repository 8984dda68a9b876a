//! Addresses, routes and tracked interfaces built from directive tokens.
//!
//! These are the elements stored in instance sublists and in the store's
//! static address/route lists.

use crate::container::{Describe, DumpSink};
use crate::error::{BuildError, Result};
use crate::interface::{InterfaceRef, InterfaceResolver};
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Route/address scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Global,
    Site,
    Link,
    Host,
    Nowhere,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Site => write!(f, "site"),
            Scope::Link => write!(f, "link"),
            Scope::Host => write!(f, "host"),
            Scope::Nowhere => write!(f, "nowhere"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "site" => Ok(Scope::Site),
            "link" => Ok(Scope::Link),
            "host" => Ok(Scope::Host),
            "nowhere" => Ok(Scope::Nowhere),
            other => Err(format!("unknown scope '{}'", other)),
        }
    }
}

/// `10.0.0.1/24` or a bare address (full-length prefix).
fn parse_prefix(directive: &str, token: &str) -> Result<IpNet> {
    if token.contains('/') {
        token
            .parse::<IpNet>()
            .map_err(|e| BuildError::invalid(directive, format!("{}: {}", token, e)))
    } else {
        token
            .parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|e| BuildError::invalid(directive, format!("{}: {}", token, e)))
    }
}

fn parse_value<T: FromStr>(directive: &str, keyword: &str, value: Option<&&str>) -> Result<T>
where
    T::Err: fmt::Display,
{
    let value = value
        .ok_or_else(|| BuildError::invalid(directive, format!("'{}' needs a value", keyword)))?;
    value
        .parse::<T>()
        .map_err(|e| BuildError::invalid(directive, format!("{} {}: {}", keyword, value, e)))
}

fn resolve(
    directive: &str,
    resolver: &dyn InterfaceResolver,
    name: Option<&&str>,
) -> Result<InterfaceRef> {
    let name = name.ok_or_else(|| BuildError::invalid(directive, "'dev' needs a value"))?;
    resolver
        .resolve(name)
        .ok_or_else(|| BuildError::UnknownInterface(name.to_string()))
}

/// Address added on MASTER transition (or unconditionally, when static)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAddress {
    pub address: IpNet,
    pub broadcast: Option<IpAddr>,
    pub interface: Option<InterfaceRef>,
    pub scope: Scope,
    pub label: Option<String>,
}

impl VirtualAddress {
    /// Build from `<addr>[/<prefix>] [dev <if>] [brd <addr>] [scope <s>] [label <l>]`.
    ///
    /// Without `dev`, the address binds to `default_interface`.
    pub fn from_tokens(
        directive: &str,
        tokens: &[&str],
        default_interface: Option<&InterfaceRef>,
        resolver: &dyn InterfaceResolver,
    ) -> Result<Self> {
        let (first, rest) = tokens
            .split_first()
            .ok_or_else(|| BuildError::invalid(directive, "missing address"))?;

        let mut vip = VirtualAddress {
            address: parse_prefix(directive, first)?,
            broadcast: None,
            interface: default_interface.cloned(),
            scope: Scope::default(),
            label: None,
        };

        let mut iter = rest.iter();
        while let Some(keyword) = iter.next() {
            match *keyword {
                "dev" => vip.interface = Some(resolve(directive, resolver, iter.next())?),
                "brd" => vip.broadcast = Some(parse_value(directive, keyword, iter.next())?),
                "scope" => vip.scope = parse_value(directive, keyword, iter.next())?,
                "label" => vip.label = Some(parse_value(directive, keyword, iter.next())?),
                other => {
                    return Err(BuildError::invalid(
                        directive,
                        format!("unexpected token '{}'", other),
                    ));
                }
            }
        }

        Ok(vip)
    }
}

impl Describe for VirtualAddress {
    fn describe(&self, sink: &mut dyn DumpSink) {
        let mut line = format!("     {}", self.address);
        if let Some(brd) = self.broadcast {
            line.push_str(&format!(" brd {}", brd));
        }
        if let Some(ifp) = &self.interface {
            line.push_str(&format!(" dev {}", ifp));
        }
        line.push_str(&format!(" scope {}", self.scope));
        if let Some(label) = &self.label {
            line.push_str(&format!(" label {}", label));
        }
        sink.line(line);
    }
}

/// Route installed on MASTER transition (or unconditionally, when static)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualRoute {
    pub destination: IpNet,
    pub gateway: Option<IpAddr>,
    pub source: Option<IpAddr>,
    pub interface: Option<InterfaceRef>,
    pub scope: Option<Scope>,
    pub metric: Option<u32>,
    pub table: Option<u32>,
    pub blackhole: bool,
}

impl VirtualRoute {
    /// Build from `[blackhole] <dst>[/<prefix>]` followed by any of
    /// `via|gw <addr>`, `src <addr>`, `dev <if>`, `scope <s>`, `metric <n>`, `table <n>`.
    pub fn from_tokens(
        directive: &str,
        tokens: &[&str],
        resolver: &dyn InterfaceResolver,
    ) -> Result<Self> {
        let (blackhole, tokens) = match tokens.split_first() {
            Some((&"blackhole", rest)) => (true, rest),
            _ => (false, tokens),
        };
        let (first, rest) = tokens
            .split_first()
            .ok_or_else(|| BuildError::invalid(directive, "missing destination"))?;

        let mut route = VirtualRoute {
            destination: parse_prefix(directive, first)?,
            gateway: None,
            source: None,
            interface: None,
            scope: None,
            metric: None,
            table: None,
            blackhole,
        };

        let mut iter = rest.iter();
        while let Some(keyword) = iter.next() {
            match *keyword {
                "via" | "gw" => {
                    route.gateway = Some(parse_value(directive, keyword, iter.next())?)
                }
                "src" => route.source = Some(parse_value(directive, keyword, iter.next())?),
                "dev" | "oif" => {
                    route.interface = Some(resolve(directive, resolver, iter.next())?)
                }
                "scope" => route.scope = Some(parse_value(directive, keyword, iter.next())?),
                "metric" => route.metric = Some(parse_value(directive, keyword, iter.next())?),
                "table" => route.table = Some(parse_value(directive, keyword, iter.next())?),
                other => {
                    return Err(BuildError::invalid(
                        directive,
                        format!("unexpected token '{}'", other),
                    ));
                }
            }
        }

        if route.blackhole && (route.gateway.is_some() || route.interface.is_some()) {
            return Err(BuildError::invalid(
                directive,
                "blackhole route cannot have a gateway or device",
            ));
        }

        Ok(route)
    }
}

impl Describe for VirtualRoute {
    fn describe(&self, sink: &mut dyn DumpSink) {
        let mut line = String::from("     ");
        if self.blackhole {
            line.push_str("blackhole ");
        }
        line.push_str(&self.destination.to_string());
        if let Some(gw) = self.gateway {
            line.push_str(&format!(" via {}", gw));
        }
        if let Some(src) = self.source {
            line.push_str(&format!(" src {}", src));
        }
        if let Some(ifp) = &self.interface {
            line.push_str(&format!(" dev {}", ifp));
        }
        if let Some(scope) = self.scope {
            line.push_str(&format!(" scope {}", scope));
        }
        if let Some(metric) = self.metric {
            line.push_str(&format!(" metric {}", metric));
        }
        if let Some(table) = self.table {
            line.push_str(&format!(" table {}", table));
        }
        sink.line(line);
    }
}

/// Interface whose link state drives the owning instance into FAULT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedInterface {
    pub interface: InterfaceRef,
    /// Priority adjustment; zero means "fault on down"
    pub weight: i32,
}

impl TrackedInterface {
    /// Build from `<ifname> [weight <n>]`.
    pub fn from_tokens(
        directive: &str,
        tokens: &[&str],
        resolver: &dyn InterfaceResolver,
    ) -> Result<Self> {
        let (name, rest) = tokens
            .split_first()
            .ok_or_else(|| BuildError::invalid(directive, "missing interface name"))?;
        let interface = resolver
            .resolve(name)
            .ok_or_else(|| BuildError::UnknownInterface(name.to_string()))?;

        let weight = match rest {
            [] => 0,
            ["weight", value] => {
                let weight: i32 = value.parse().map_err(|e| {
                    BuildError::invalid(directive, format!("weight {}: {}", value, e))
                })?;
                if !(-254..=254).contains(&weight) {
                    return Err(BuildError::invalid(
                        directive,
                        format!("weight {} out of range -254..254", weight),
                    ));
                }
                weight
            }
            _ => {
                return Err(BuildError::invalid(
                    directive,
                    format!("unexpected tokens '{}'", rest.join(" ")),
                ));
            }
        };

        Ok(Self { interface, weight })
    }
}

impl Describe for TrackedInterface {
    fn describe(&self, sink: &mut dyn DumpSink) {
        if self.weight != 0 {
            sink.line(format!("     {} weight {}", self.interface, self.weight));
        } else {
            sink.line(format!("     {}", self.interface));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::StaticInterfaces;

    fn interfaces() -> StaticInterfaces {
        StaticInterfaces::new().with("eth0", 2).with("eth1", 3)
    }

    #[test]
    fn test_virtual_address_defaults_to_instance_interface() {
        let resolver = interfaces();
        let eth0 = resolver.resolve("eth0");

        let vip = VirtualAddress::from_tokens(
            "virtual_ipaddress",
            &["192.168.1.10/24"],
            eth0.as_ref(),
            &resolver,
        )
        .unwrap();
        assert_eq!(vip.address.to_string(), "192.168.1.10/24");
        assert_eq!(vip.interface.unwrap().name, "eth0");
        assert_eq!(vip.scope, Scope::Global);

        let bare = ["10.0.0.1"];
        let bare =
            VirtualAddress::from_tokens("virtual_ipaddress", &bare, None, &resolver).unwrap();
        assert_eq!(bare.address.prefix_len(), 32);
        assert!(bare.interface.is_none());
    }

    #[test]
    fn test_virtual_address_options() {
        let resolver = interfaces();
        let vip = VirtualAddress::from_tokens(
            "virtual_ipaddress",
            &[
                "10.0.0.1/8",
                "dev",
                "eth1",
                "brd",
                "10.255.255.255",
                "scope",
                "link",
                "label",
                "eth1:0",
            ],
            None,
            &resolver,
        )
        .unwrap();

        assert_eq!(vip.interface.as_ref().unwrap().name, "eth1");
        assert_eq!(vip.broadcast, Some("10.255.255.255".parse().unwrap()));
        assert_eq!(vip.scope, Scope::Link);
        assert_eq!(vip.label.as_deref(), Some("eth1:0"));

        let mut lines = Vec::new();
        vip.describe(&mut lines);
        assert_eq!(
            lines,
            vec!["     10.0.0.1/8 brd 10.255.255.255 dev eth1 scope link label eth1:0"]
        );
    }

    #[test]
    fn test_virtual_address_errors() {
        let resolver = interfaces();
        assert!(matches!(
            VirtualAddress::from_tokens("virtual_ipaddress", &[], None, &resolver),
            Err(BuildError::InvalidDirective { .. })
        ));
        assert!(matches!(
            VirtualAddress::from_tokens("virtual_ipaddress", &["not-an-ip"], None, &resolver),
            Err(BuildError::InvalidDirective { .. })
        ));
        let eth9 = ["10.0.0.1", "dev", "eth9"];
        assert_eq!(
            VirtualAddress::from_tokens("virtual_ipaddress", &eth9, None, &resolver),
            Err(BuildError::UnknownInterface("eth9".into()))
        );
        let dangling = ["10.0.0.1", "dev"];
        let result = VirtualAddress::from_tokens("virtual_ipaddress", &dangling, None, &resolver);
        assert!(result.is_err());
    }

    #[test]
    fn test_virtual_route() {
        let resolver = interfaces();
        let route = VirtualRoute::from_tokens(
            "virtual_routes",
            &["192.168.2.0/24", "via", "10.0.0.254", "dev", "eth0", "metric", "10"],
            &resolver,
        )
        .unwrap();

        assert_eq!(route.destination.to_string(), "192.168.2.0/24");
        assert_eq!(route.gateway, Some("10.0.0.254".parse().unwrap()));
        assert_eq!(route.metric, Some(10));
        assert!(!route.blackhole);

        let mut lines = Vec::new();
        route.describe(&mut lines);
        assert_eq!(lines, vec!["     192.168.2.0/24 via 10.0.0.254 dev eth0 metric 10"]);
    }

    #[test]
    fn test_blackhole_route() {
        let resolver = interfaces();
        let route =
            VirtualRoute::from_tokens("virtual_routes", &["blackhole", "10.1.0.0/16"], &resolver)
                .unwrap();
        assert!(route.blackhole);

        assert!(VirtualRoute::from_tokens(
            "virtual_routes",
            &["blackhole", "10.1.0.0/16", "via", "10.0.0.1"],
            &resolver
        )
        .is_err());
    }

    #[test]
    fn test_tracked_interface() {
        let resolver = interfaces();
        let track = TrackedInterface::from_tokens("track_interface", &["eth1"], &resolver).unwrap();
        assert_eq!(track.interface.index, 3);
        assert_eq!(track.weight, 0);

        let weighted = ["eth0", "weight", "-20"];
        let weighted =
            TrackedInterface::from_tokens("track_interface", &weighted, &resolver).unwrap();
        assert_eq!(weighted.weight, -20);

        let too_heavy = ["eth0", "weight", "300"];
        assert!(TrackedInterface::from_tokens("track_interface", &too_heavy, &resolver).is_err());
        let bogus = ["eth0", "bogus"];
        assert!(TrackedInterface::from_tokens("track_interface", &bogus, &resolver).is_err());
        assert_eq!(
            TrackedInterface::from_tokens("track_interface", &["wlan0"], &resolver),
            Err(BuildError::UnknownInterface("wlan0".into()))
        );
    }
}
