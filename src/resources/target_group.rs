//! Application target groups and their health checks.

use std::time::Duration;

use super::{Resource, ResourceKind, VpcRef};
use crate::error::{Error, Result};

/// Protocol spoken between the load balancer and its targets or clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationProtocol {
    Http,
    Https,
}

impl ApplicationProtocol {
    pub fn as_cfn(&self) -> &'static str {
        match self {
            ApplicationProtocol::Http => "HTTP",
            ApplicationProtocol::Https => "HTTPS",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ApplicationProtocol::Http => 80,
            ApplicationProtocol::Https => 443,
        }
    }

    /// Protocol implied by a well-known port.
    pub fn from_port(port: u16) -> Option<Self> {
        match port {
            80 | 8080 => Some(ApplicationProtocol::Http),
            443 | 8443 => Some(ApplicationProtocol::Https),
            _ => None,
        }
    }
}

/// How targets are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Instance,
    Ip,
    Lambda,
}

impl TargetType {
    pub fn as_cfn(&self) -> &'static str {
        match self {
            TargetType::Instance => "instance",
            TargetType::Ip => "ip",
            TargetType::Lambda => "lambda",
        }
    }
}

/// Health check parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub path: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub healthy_threshold_count: u8,
    pub unhealthy_threshold_count: u8,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            healthy_threshold_count: 5,
            unhealthy_threshold_count: 2,
        }
    }
}

impl HealthCheck {
    pub fn validate(&self, resource: &str) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(Error::validation(
                resource,
                format!("health check path '{}' must start with '/'", self.path),
            ));
        }
        let interval = self.interval.as_secs();
        let timeout = self.timeout.as_secs();
        if !(5..=300).contains(&interval) {
            return Err(Error::validation(
                resource,
                format!("health check interval {}s is outside 5..=300", interval),
            ));
        }
        if !(2..=120).contains(&timeout) {
            return Err(Error::validation(
                resource,
                format!("health check timeout {}s is outside 2..=120", timeout),
            ));
        }
        if timeout >= interval {
            return Err(Error::validation(
                resource,
                format!(
                    "health check timeout ({}s) must be less than the interval ({}s)",
                    timeout, interval
                ),
            ));
        }
        for (name, count) in [
            ("healthy", self.healthy_threshold_count),
            ("unhealthy", self.unhealthy_threshold_count),
        ] {
            if !(2..=10).contains(&count) {
                return Err(Error::validation(
                    resource,
                    format!("{} threshold {} is outside 2..=10", name, count),
                ));
            }
        }
        Ok(())
    }
}

/// Properties for declaring a target group.
#[derive(Debug, Clone)]
pub struct TargetGroupProps {
    pub vpc: VpcRef,
    pub protocol: ApplicationProtocol,
    /// Defaults to the protocol's well-known port
    pub port: Option<u16>,
    pub target_type: TargetType,
    pub health_check: HealthCheck,
}

impl TargetGroupProps {
    pub fn new(vpc: VpcRef) -> Self {
        Self {
            vpc,
            protocol: ApplicationProtocol::Http,
            port: None,
            target_type: TargetType::Instance,
            health_check: HealthCheck::default(),
        }
    }

    pub fn with_protocol(mut self, protocol: ApplicationProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    pub fn with_health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = health_check;
        self
    }
}

/// A declared target group.
#[derive(Debug, Clone)]
pub struct TargetGroup {
    pub(crate) path: String,
    pub vpc: VpcRef,
    pub protocol: ApplicationProtocol,
    pub port: u16,
    pub target_type: TargetType,
    pub health_check: HealthCheck,
}

impl Resource for TargetGroup {
    const KIND: ResourceKind = ResourceKind::TargetGroup;

    fn path(&self) -> &str {
        &self.path
    }
}

impl TargetGroup {
    pub(crate) fn from_props(path: &str, props: TargetGroupProps) -> Self {
        Self {
            path: path.to_string(),
            vpc: props.vpc,
            protocol: props.protocol,
            port: props.port.unwrap_or_else(|| props.protocol.default_port()),
            target_type: props.target_type,
            health_check: props.health_check,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::validation(&self.path, "port must be non-zero"));
        }
        self.health_check.validate(&self.path)
    }
}
