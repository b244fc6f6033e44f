//! Application load balancers and their listeners.

use super::target_group::ApplicationProtocol;
use super::{LoadBalancerRef, Resource, ResourceKind, SecurityGroupRef, TargetGroupRef, VpcRef};
use crate::error::{Error, Result};

/// Properties for declaring an application load balancer.
#[derive(Debug, Clone)]
pub struct LoadBalancerProps {
    pub vpc: VpcRef,
    pub internet_facing: bool,
    /// A group is created alongside the load balancer when unset
    pub security_group: Option<SecurityGroupRef>,
}

impl LoadBalancerProps {
    pub fn new(vpc: VpcRef) -> Self {
        Self {
            vpc,
            internet_facing: false,
            security_group: None,
        }
    }

    pub fn with_internet_facing(mut self, internet_facing: bool) -> Self {
        self.internet_facing = internet_facing;
        self
    }

    pub fn with_security_group(mut self, security_group: SecurityGroupRef) -> Self {
        self.security_group = Some(security_group);
        self
    }
}

/// A declared application load balancer.
#[derive(Debug, Clone)]
pub struct ApplicationLoadBalancer {
    pub(crate) path: String,
    pub vpc: VpcRef,
    pub internet_facing: bool,
    pub security_groups: Vec<SecurityGroupRef>,
}

impl Resource for ApplicationLoadBalancer {
    const KIND: ResourceKind = ResourceKind::LoadBalancer;

    fn path(&self) -> &str {
        &self.path
    }
}

impl ApplicationLoadBalancer {
    pub(crate) fn new(
        path: &str,
        vpc: VpcRef,
        internet_facing: bool,
        security_group: SecurityGroupRef,
    ) -> Self {
        Self {
            path: path.to_string(),
            vpc,
            internet_facing,
            security_groups: vec![security_group],
        }
    }

    /// `Scheme` template value.
    pub fn scheme(&self) -> &'static str {
        if self.internet_facing {
            "internet-facing"
        } else {
            "internal"
        }
    }
}

/// What a listener does with requests that match no rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    /// Forward to the target groups, weighted equally
    Forward(Vec<TargetGroupRef>),
}

impl ListenerAction {
    pub fn forward(target_groups: impl IntoIterator<Item = TargetGroupRef>) -> Self {
        ListenerAction::Forward(target_groups.into_iter().collect())
    }

    pub fn target_groups(&self) -> &[TargetGroupRef] {
        match self {
            ListenerAction::Forward(tgs) => tgs,
        }
    }
}

/// Properties for adding a listener to a load balancer.
///
/// The default action is given either through `default_target_groups` or
/// through `default_action`, never both.
#[derive(Debug, Clone)]
pub struct ListenerProps {
    pub port: u16,
    /// Inferred from the port when unset
    pub protocol: Option<ApplicationProtocol>,
    /// Open the port to the world on the load balancer's security groups
    pub open: bool,
    pub default_target_groups: Vec<TargetGroupRef>,
    pub default_action: Option<ListenerAction>,
}

impl ListenerProps {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            protocol: None,
            open: true,
            default_target_groups: Vec::new(),
            default_action: None,
        }
    }

    pub fn with_protocol(mut self, protocol: ApplicationProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_default_target_groups(
        mut self,
        target_groups: impl IntoIterator<Item = TargetGroupRef>,
    ) -> Self {
        self.default_target_groups = target_groups.into_iter().collect();
        self
    }

    pub fn with_default_action(mut self, action: ListenerAction) -> Self {
        self.default_action = Some(action);
        self
    }
}

/// A declared listener.
#[derive(Debug, Clone)]
pub struct Listener {
    pub(crate) path: String,
    pub load_balancer: LoadBalancerRef,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub default_action: ListenerAction,
}

impl Resource for Listener {
    const KIND: ResourceKind = ResourceKind::Listener;

    fn path(&self) -> &str {
        &self.path
    }
}

impl Listener {
    pub(crate) fn from_props(
        path: &str,
        load_balancer: LoadBalancerRef,
        props: ListenerProps,
    ) -> Result<Self> {
        if props.port == 0 {
            return Err(Error::validation(path, "port must be non-zero"));
        }

        let default_action = match (props.default_target_groups.is_empty(), props.default_action)
        {
            (false, Some(_)) => {
                return Err(Error::validation(
                    path,
                    "specify only one of 'default_target_groups' and 'default_action'",
                ))
            }
            (false, None) => ListenerAction::Forward(props.default_target_groups),
            (true, Some(action)) => action,
            (true, None) => {
                return Err(Error::validation(
                    path,
                    "a listener needs a default action or default target groups",
                ))
            }
        };

        if default_action.target_groups().is_empty() {
            return Err(Error::validation(
                path,
                "forward action needs at least one target group",
            ));
        }

        let protocol = match props.protocol {
            Some(p) => p,
            None => ApplicationProtocol::from_port(props.port).ok_or_else(|| {
                Error::validation(
                    path,
                    format!("cannot infer protocol for port {}; set it explicitly", props.port),
                )
            })?,
        };

        Ok(Self {
            path: path.to_string(),
            load_balancer,
            port: props.port,
            protocol,
            default_action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Handle;

    fn lb() -> LoadBalancerRef {
        Handle::new(0, 0)
    }

    fn tg() -> TargetGroupRef {
        Handle::new(0, 0)
    }

    #[test]
    fn test_action_styles_are_equivalent() {
        let a = Listener::from_props(
            "Alb/Listener",
            lb(),
            ListenerProps::new(80).with_default_target_groups([tg()]),
        )
        .unwrap();
        let b = Listener::from_props(
            "Alb/Listener",
            lb(),
            ListenerProps::new(80).with_default_action(ListenerAction::forward([tg()])),
        )
        .unwrap();
        assert_eq!(a.default_action, b.default_action);
        assert_eq!(a.protocol, ApplicationProtocol::Http);
    }

    #[test]
    fn test_both_action_styles_rejected() {
        let props = ListenerProps::new(80)
            .with_default_target_groups([tg()])
            .with_default_action(ListenerAction::forward([tg()]));
        assert!(Listener::from_props("Alb/Listener", lb(), props).is_err());
    }

    #[test]
    fn test_missing_action_rejected() {
        assert!(Listener::from_props("Alb/Listener", lb(), ListenerProps::new(80)).is_err());
    }

    #[test]
    fn test_unknown_port_needs_protocol() {
        let props = ListenerProps::new(9000).with_default_target_groups([tg()]);
        assert!(Listener::from_props("Alb/Listener", lb(), props.clone()).is_err());
        let listener = Listener::from_props(
            "Alb/Listener",
            lb(),
            props.with_protocol(ApplicationProtocol::Http),
        )
        .unwrap();
        assert_eq!(listener.port, 9000);
    }

    #[test]
    fn test_scheme() {
        let alb = ApplicationLoadBalancer::new("Alb", Handle::new(0, 0), true, Handle::new(0, 0));
        assert_eq!(alb.scheme(), "internet-facing");
    }
}
