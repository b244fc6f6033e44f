//! Security groups and inbound rules.

use std::fmt;

use super::{Resource, ResourceKind, VpcRef};
use crate::cidr::Ipv4Cidr;
use crate::error::{Error, Result};

/// IP protocol of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Every protocol
    All,
}

impl Protocol {
    /// Value of the `IpProtocol` template property.
    pub fn as_cfn(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "-1",
        }
    }
}

/// Protocol plus port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
}

impl Port {
    pub fn tcp(port: u16) -> Self {
        Self::tcp_range(port, port)
    }

    pub fn tcp_range(from_port: u16, to_port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port,
            to_port,
        }
    }

    pub fn udp(port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            from_port: port,
            to_port: port,
        }
    }

    /// Every protocol on every port.
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: 0,
        }
    }

    /// Whether `port` falls inside this range for the same protocol.
    pub fn covers(&self, protocol: Protocol, port: u16) -> bool {
        match self.protocol {
            Protocol::All => true,
            p => p == protocol && (self.from_port..=self.to_port).contains(&port),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::All => f.write_str("all traffic"),
            p if self.from_port == self.to_port => {
                write!(f, "{} {}", p.as_cfn().to_uppercase(), self.from_port)
            }
            p => write!(
                f,
                "{} {}-{}",
                p.as_cfn().to_uppercase(),
                self.from_port,
                self.to_port
            ),
        }
    }
}

/// Traffic source of an inbound rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    /// `0.0.0.0/0`
    AnyIpv4,
    Ipv4(Ipv4Cidr),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Peer::AnyIpv4
    }

    pub fn ipv4(cidr: Ipv4Cidr) -> Self {
        Peer::Ipv4(cidr)
    }

    /// Source block of the peer.
    pub fn cidr(&self) -> Ipv4Cidr {
        match self {
            Peer::AnyIpv4 => Ipv4Cidr::any(),
            Peer::Ipv4(cidr) => *cidr,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr())
    }
}

/// One inbound rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

impl IngressRule {
    pub fn new(peer: Peer, port: Port, description: impl Into<String>) -> Self {
        Self {
            peer,
            port,
            description: description.into(),
        }
    }

    /// Two rules with the same key are the same rule regardless of description.
    fn key(&self) -> (Ipv4Cidr, Port) {
        (self.peer.cidr(), self.port)
    }
}

/// Properties for declaring a security group.
#[derive(Debug, Clone)]
pub struct SecurityGroupProps {
    pub vpc: VpcRef,
    pub description: Option<String>,
    pub allow_all_outbound: bool,
}

impl SecurityGroupProps {
    pub fn new(vpc: VpcRef) -> Self {
        Self {
            vpc,
            description: None,
            allow_all_outbound: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_allow_all_outbound(mut self, allow: bool) -> Self {
        self.allow_all_outbound = allow;
        self
    }
}

/// A declared security group.
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub(crate) path: String,
    pub vpc: VpcRef,
    pub description: String,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

impl Resource for SecurityGroup {
    const KIND: ResourceKind = ResourceKind::SecurityGroup;

    fn path(&self) -> &str {
        &self.path
    }
}

impl SecurityGroup {
    pub(crate) fn from_props(path: &str, stack_id: &str, props: SecurityGroupProps) -> Self {
        Self {
            path: path.to_string(),
            vpc: props.vpc,
            description: props
                .description
                .unwrap_or_else(|| format!("{}/{}", stack_id, path)),
            allow_all_outbound: props.allow_all_outbound,
            ingress: Vec::new(),
        }
    }

    /// Append a rule. Returns `false` if an equivalent rule already exists.
    pub(crate) fn add_ingress_rule(&mut self, rule: IngressRule) -> bool {
        if self.ingress.iter().any(|r| r.key() == rule.key()) {
            return false;
        }
        self.ingress.push(rule);
        true
    }

    /// Whether some rule admits `protocol`/`port` from anywhere.
    pub fn allows_from_anywhere(&self, protocol: Protocol, port: u16) -> bool {
        self.ingress
            .iter()
            .any(|r| r.peer.cidr() == Ipv4Cidr::any() && r.port.covers(protocol, port))
    }

    /// Single TCP ports opened by this group, in rule order.
    pub fn tcp_ports(&self) -> Vec<u16> {
        self.ingress
            .iter()
            .filter(|r| r.port.protocol == Protocol::Tcp && r.port.from_port == r.port.to_port)
            .map(|r| r.port.from_port)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::validation(&self.path, "description must not be empty"));
        }
        for rule in &self.ingress {
            if rule.port.protocol != Protocol::All && rule.port.from_port > rule.port.to_port {
                return Err(Error::validation(
                    &self.path,
                    format!("invalid port range {}", rule.port),
                ));
            }
            if matches!(rule.port.protocol, Protocol::Tcp | Protocol::Udp)
                && rule.port.from_port == 0
            {
                return Err(Error::validation(
                    &self.path,
                    format!("rule '{}' uses port 0", rule.description),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Handle;

    fn group() -> SecurityGroup {
        SecurityGroup::from_props(
            "UISecurityGroup",
            "TestStack",
            SecurityGroupProps::new(Handle::new(0, 0)),
        )
    }

    #[test]
    fn test_default_description_is_path() {
        assert_eq!(group().description, "TestStack/UISecurityGroup");
    }

    #[test]
    fn test_duplicate_rule_ignored() {
        let mut sg = group();
        assert!(sg.add_ingress_rule(IngressRule::new(Peer::any_ipv4(), Port::tcp(80), "a")));
        assert!(!sg.add_ingress_rule(IngressRule::new(Peer::any_ipv4(), Port::tcp(80), "b")));
        assert!(sg.add_ingress_rule(IngressRule::new(Peer::any_ipv4(), Port::tcp(8080), "c")));
        assert_eq!(sg.tcp_ports(), vec![80, 8080]);
    }

    #[test]
    fn test_allows_from_anywhere() {
        let mut sg = group();
        sg.add_ingress_rule(IngressRule::new(Peer::any_ipv4(), Port::tcp(80), "http"));
        assert!(sg.allows_from_anywhere(Protocol::Tcp, 80));
        assert!(!sg.allows_from_anywhere(Protocol::Tcp, 443));
        assert!(!sg.allows_from_anywhere(Protocol::Udp, 80));
    }

    #[test]
    fn test_port_display() {
        assert_eq!(Port::tcp(80).to_string(), "TCP 80");
        assert_eq!(Port::tcp_range(1000, 2000).to_string(), "TCP 1000-2000");
        assert_eq!(Port::all_traffic().to_string(), "all traffic");
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut sg = group();
        sg.add_ingress_rule(IngressRule::new(
            Peer::any_ipv4(),
            Port::tcp_range(9000, 8000),
            "bad",
        ));
        assert!(sg.validate().is_err());
    }
}
