//! VPC interface endpoints.

use std::fmt;

use super::network::SubnetType;
use super::{Resource, ResourceKind, SecurityGroupRef, VpcRef};
use crate::error::{Error, Result};

/// Port interface endpoints accept traffic on.
pub const ENDPOINT_PORT: u16 = 443;

/// Service reached through an interface endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointService {
    Ssm,
    SsmMessages,
    Ec2Messages,
    /// Any other regional AWS service, by short name (e.g. `logs`)
    Custom(String),
}

impl EndpointService {
    /// Short service name, e.g. `ssmmessages`.
    pub fn short_name(&self) -> &str {
        match self {
            EndpointService::Ssm => "ssm",
            EndpointService::SsmMessages => "ssmmessages",
            EndpointService::Ec2Messages => "ec2messages",
            EndpointService::Custom(name) => name,
        }
    }

    /// Fully qualified service name in `region`.
    pub fn service_name(&self, region: &str) -> String {
        format!("com.amazonaws.{}.{}", region, self.short_name())
    }
}

impl fmt::Display for EndpointService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Properties for declaring an interface endpoint.
#[derive(Debug, Clone)]
pub struct InterfaceEndpointProps {
    pub vpc: VpcRef,
    pub service: EndpointService,
    /// A group is created alongside the endpoint when empty
    pub security_groups: Vec<SecurityGroupRef>,
    pub subnet_type: SubnetType,
    pub private_dns_enabled: bool,
    /// Admit HTTPS from the VPC block on the endpoint's security groups
    pub open: bool,
}

impl InterfaceEndpointProps {
    pub fn new(vpc: VpcRef, service: EndpointService) -> Self {
        Self {
            vpc,
            service,
            security_groups: Vec::new(),
            subnet_type: SubnetType::PrivateWithNat,
            private_dns_enabled: true,
            open: true,
        }
    }

    pub fn with_security_groups(
        mut self,
        groups: impl IntoIterator<Item = SecurityGroupRef>,
    ) -> Self {
        self.security_groups = groups.into_iter().collect();
        self
    }

    pub fn with_subnet_type(mut self, subnet_type: SubnetType) -> Self {
        self.subnet_type = subnet_type;
        self
    }

    pub fn with_private_dns(mut self, enabled: bool) -> Self {
        self.private_dns_enabled = enabled;
        self
    }
}

/// A declared interface endpoint.
#[derive(Debug, Clone)]
pub struct InterfaceEndpoint {
    pub(crate) path: String,
    pub vpc: VpcRef,
    pub service: EndpointService,
    pub security_groups: Vec<SecurityGroupRef>,
    pub subnet_type: SubnetType,
    pub private_dns_enabled: bool,
}

impl Resource for InterfaceEndpoint {
    const KIND: ResourceKind = ResourceKind::InterfaceEndpoint;

    fn path(&self) -> &str {
        &self.path
    }
}

impl InterfaceEndpoint {
    pub(crate) fn new(
        path: &str,
        props: &InterfaceEndpointProps,
        security_groups: Vec<SecurityGroupRef>,
    ) -> Result<Self> {
        if let EndpointService::Custom(name) = &props.service {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
            if !valid {
                return Err(Error::validation(
                    path,
                    format!("invalid service name '{}'", name),
                ));
            }
        }

        Ok(Self {
            path: path.to_string(),
            vpc: props.vpc,
            service: props.service.clone(),
            security_groups,
            subnet_type: props.subnet_type,
            private_dns_enabled: props.private_dns_enabled,
        })
    }
}
