//! Virtual network (VPC) and subnet layout.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Resource, ResourceKind};
use crate::cidr::{CidrAllocator, Ipv4Cidr};
use crate::error::{Error, Result};

/// CIDR used when neither `cidr` nor `ip_addresses` is given.
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";

/// Routing class of a subnet group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubnetType {
    /// Default route to the internet gateway
    Public,
    /// Default route to a NAT gateway in a public subnet
    PrivateWithNat,
    /// No route out of the VPC
    PrivateIsolated,
}

impl SubnetType {
    /// Tag value used for `aws-cdk:subnet-type`.
    pub fn tag_value(&self) -> &'static str {
        match self {
            SubnetType::Public => "Public",
            SubnetType::PrivateWithNat => "Private",
            SubnetType::PrivateIsolated => "Isolated",
        }
    }

    /// Whether subnets of this type are reachable from the internet.
    pub fn is_public(&self) -> bool {
        matches!(self, SubnetType::Public)
    }
}

/// One subnet group: a subnet of `cidr_mask` bits in every availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfiguration {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask,
        }
    }
}

/// Address allocation strategy for a VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpAddresses {
    /// Carve subnets sequentially out of a fixed block
    Cidr(Ipv4Cidr),
}

impl IpAddresses {
    /// Sequential allocation out of `cidr`.
    pub fn cidr(cidr: &str) -> Result<Self> {
        Ok(IpAddresses::Cidr(Ipv4Cidr::parse(cidr)?))
    }

    fn block(&self) -> Ipv4Cidr {
        match self {
            IpAddresses::Cidr(block) => *block,
        }
    }
}

/// Properties for declaring a VPC.
#[derive(Debug, Clone)]
pub struct VpcProps {
    /// Legacy address block setter
    pub cidr: Option<String>,
    /// Address allocation strategy
    pub ip_addresses: Option<IpAddresses>,
    pub max_azs: u8,
    /// Defaults to one per AZ when private-with-NAT subnets exist
    pub nat_gateways: Option<u8>,
    pub subnet_configuration: Vec<SubnetConfiguration>,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            cidr: None,
            ip_addresses: None,
            max_azs: 3,
            nat_gateways: None,
            subnet_configuration: vec![
                SubnetConfiguration::new("Public", SubnetType::Public, 24),
                SubnetConfiguration::new("Private", SubnetType::PrivateWithNat, 24),
            ],
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }
    }
}

impl VpcProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cidr = Some(cidr.into());
        self
    }

    pub fn with_ip_addresses(mut self, ip_addresses: IpAddresses) -> Self {
        self.ip_addresses = Some(ip_addresses);
        self
    }

    pub fn with_max_azs(mut self, max_azs: u8) -> Self {
        self.max_azs = max_azs;
        self
    }

    pub fn with_nat_gateways(mut self, nat_gateways: u8) -> Self {
        self.nat_gateways = Some(nat_gateways);
        self
    }

    pub fn with_subnets(mut self, subnets: Vec<SubnetConfiguration>) -> Self {
        self.subnet_configuration = subnets;
        self
    }
}

/// A concrete subnet carved out of the VPC block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    /// Construct id under the VPC, e.g. `PublicSubnetSubnet1`
    pub id: String,
    /// Name of the subnet group this subnet belongs to
    pub group: String,
    pub subnet_type: SubnetType,
    /// Zero-based availability zone index
    pub az_index: u8,
    pub cidr: Ipv4Cidr,
}

/// A declared VPC with its resolved subnet layout.
#[derive(Debug, Clone)]
pub struct Vpc {
    pub(crate) path: String,
    pub cidr: Ipv4Cidr,
    pub max_azs: u8,
    pub nat_gateways: u8,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub subnet_configuration: Vec<SubnetConfiguration>,
    pub subnets: Vec<Subnet>,
}

impl Resource for Vpc {
    const KIND: ResourceKind = ResourceKind::Vpc;

    fn path(&self) -> &str {
        &self.path
    }
}

impl Vpc {
    /// Resolve props into a VPC, carving its subnets.
    pub(crate) fn from_props(path: &str, props: VpcProps) -> Result<Self> {
        let cidr = match (&props.cidr, &props.ip_addresses) {
            (Some(_), Some(_)) => {
                return Err(Error::validation(
                    path,
                    "'cidr' and 'ip_addresses' are mutually exclusive",
                ))
            }
            (Some(cidr), None) => Ipv4Cidr::parse(cidr)?,
            (None, Some(ip)) => ip.block(),
            (None, None) => Ipv4Cidr::parse(DEFAULT_VPC_CIDR)?,
        };

        if props.max_azs == 0 {
            return Err(Error::validation(path, "max_azs must be at least 1"));
        }

        if props.subnet_configuration.is_empty() {
            return Err(Error::validation(
                path,
                "at least one subnet configuration is required",
            ));
        }

        let mut names = std::collections::HashSet::new();
        for group in &props.subnet_configuration {
            if !names.insert(group.name.as_str()) {
                return Err(Error::validation(
                    path,
                    format!("duplicate subnet group name '{}'", group.name),
                ));
            }
        }

        let has_public = props
            .subnet_configuration
            .iter()
            .any(|g| g.subnet_type == SubnetType::Public);
        let needs_nat = props
            .subnet_configuration
            .iter()
            .any(|g| g.subnet_type == SubnetType::PrivateWithNat);

        let nat_gateways = match props.nat_gateways {
            Some(n) => n,
            None if needs_nat => props.max_azs,
            None => 0,
        };

        if nat_gateways > props.max_azs {
            return Err(Error::validation(
                path,
                format!(
                    "nat_gateways ({}) cannot exceed the number of availability zones ({})",
                    nat_gateways, props.max_azs
                ),
            ));
        }
        if needs_nat && nat_gateways == 0 {
            return Err(Error::validation(
                path,
                "private subnets with NAT require at least one NAT gateway",
            ));
        }
        if nat_gateways > 0 && !has_public {
            return Err(Error::validation(
                path,
                "NAT gateways require a public subnet group to live in",
            ));
        }

        let mut allocator = CidrAllocator::new(cidr);
        let mut subnets = Vec::new();
        for group in &props.subnet_configuration {
            for az in 0..props.max_azs {
                let block = allocator.allocate(group.cidr_mask)?;
                let id = format!("{}Subnet{}", group.name, az + 1);
                debug!(vpc = path, subnet = %id, cidr = %block, "carved subnet");
                subnets.push(Subnet {
                    id,
                    group: group.name.clone(),
                    subnet_type: group.subnet_type,
                    az_index: az,
                    cidr: block,
                });
            }
        }

        Ok(Self {
            path: path.to_string(),
            cidr,
            max_azs: props.max_azs,
            nat_gateways,
            enable_dns_hostnames: props.enable_dns_hostnames,
            enable_dns_support: props.enable_dns_support,
            subnet_configuration: props.subnet_configuration,
            subnets,
        })
    }

    /// Subnets of the given type, ordered by availability zone within each group.
    pub fn subnets_of(&self, subnet_type: SubnetType) -> Vec<&Subnet> {
        self.subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect()
    }

    pub fn public_subnets(&self) -> Vec<&Subnet> {
        self.subnets_of(SubnetType::Public)
    }

    pub fn private_subnets(&self) -> Vec<&Subnet> {
        self.subnets_of(SubnetType::PrivateWithNat)
    }

    /// Public subnets hosting a NAT gateway: the first `nat_gateways` of them.
    pub fn nat_subnets(&self) -> Vec<&Subnet> {
        self.public_subnets()
            .into_iter()
            .take(usize::from(self.nat_gateways))
            .collect()
    }

    /// Check that the carved layout is consistent with the VPC block.
    pub fn validate(&self) -> Result<()> {
        for (i, subnet) in self.subnets.iter().enumerate() {
            if !self.cidr.contains(&subnet.cidr) {
                return Err(Error::validation(
                    format!("{}/{}", self.path, subnet.id),
                    format!("{} is outside the VPC block {}", subnet.cidr, self.cidr),
                ));
            }
            for other in &self.subnets[i + 1..] {
                if subnet.cidr.overlaps(&other.cidr) {
                    return Err(Error::validation(
                        &self.path,
                        format!("subnets {} and {} overlap", subnet.id, other.id),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tier() -> VpcProps {
        VpcProps::new().with_max_azs(2).with_subnets(vec![
            SubnetConfiguration::new("PublicSubnet", SubnetType::Public, 24),
            SubnetConfiguration::new("PrivateSubnet", SubnetType::PrivateWithNat, 24),
        ])
    }

    #[test]
    fn test_subnet_layout() {
        let vpc = Vpc::from_props("MyVPC", two_tier().with_cidr("10.0.0.0/16")).unwrap();
        let layout: Vec<(&str, String)> = vpc
            .subnets
            .iter()
            .map(|s| (s.id.as_str(), s.cidr.to_string()))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("PublicSubnetSubnet1", "10.0.0.0/24".to_string()),
                ("PublicSubnetSubnet2", "10.0.1.0/24".to_string()),
                ("PrivateSubnetSubnet1", "10.0.2.0/24".to_string()),
                ("PrivateSubnetSubnet2", "10.0.3.0/24".to_string()),
            ]
        );
        assert_eq!(vpc.nat_gateways, 2);
        vpc.validate().unwrap();
    }

    #[test]
    fn test_cidr_styles_agree() {
        let legacy = Vpc::from_props("A", two_tier().with_cidr("10.0.0.0/16")).unwrap();
        let modern = Vpc::from_props(
            "B",
            two_tier().with_ip_addresses(IpAddresses::cidr("10.0.0.0/16").unwrap()),
        )
        .unwrap();
        assert_eq!(legacy.cidr, modern.cidr);
        assert_eq!(legacy.subnets, modern.subnets);
    }

    #[test]
    fn test_cidr_styles_conflict() {
        let props = two_tier()
            .with_cidr("10.0.0.0/16")
            .with_ip_addresses(IpAddresses::cidr("10.1.0.0/16").unwrap());
        assert!(Vpc::from_props("MyVPC", props).is_err());
    }

    #[test]
    fn test_too_many_nat_gateways() {
        let props = two_tier().with_nat_gateways(3);
        assert!(Vpc::from_props("MyVPC", props).is_err());
    }

    #[test]
    fn test_private_without_nat_rejected() {
        let props = two_tier().with_nat_gateways(0);
        assert!(Vpc::from_props("MyVPC", props).is_err());
    }

    #[test]
    fn test_isolated_only_needs_no_nat() {
        let props = VpcProps::new().with_max_azs(2).with_subnets(vec![
            SubnetConfiguration::new("Isolated", SubnetType::PrivateIsolated, 28),
        ]);
        let vpc = Vpc::from_props("MyVPC", props).unwrap();
        assert_eq!(vpc.nat_gateways, 0);
        assert!(vpc.nat_subnets().is_empty());
    }

    #[test]
    fn test_block_too_small() {
        let props = two_tier().with_cidr("10.0.0.0/23");
        assert!(matches!(
            Vpc::from_props("MyVPC", props),
            Err(Error::CidrExhausted { .. })
        ));
    }

    #[test]
    fn test_single_nat_lives_in_first_public_subnet() {
        let vpc = Vpc::from_props("MyVPC", two_tier().with_nat_gateways(1)).unwrap();
        let nat: Vec<&str> = vpc.nat_subnets().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(nat, vec!["PublicSubnetSubnet1"]);
    }
}
