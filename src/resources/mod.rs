//! Typed cloud resource descriptors.
//!
//! Descriptors are plain data: they record what should exist, never how to
//! create it. A descriptor refers to another one through a [`Handle`] that
//! only the owning [`Stack`](crate::stack::Stack) can mint, which keeps every
//! reference inside the stack that declared it.

pub mod endpoint;
pub mod load_balancer;
pub mod network;
pub mod security_group;
pub mod target_group;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

pub use endpoint::{EndpointService, InterfaceEndpoint, InterfaceEndpointProps};
pub use load_balancer::{
    ApplicationLoadBalancer, Listener, ListenerAction, ListenerProps, LoadBalancerProps,
};
pub use network::{IpAddresses, Subnet, SubnetConfiguration, SubnetType, Vpc, VpcProps};
pub use security_group::{IngressRule, Peer, Port, Protocol, SecurityGroup, SecurityGroupProps};
pub use target_group::{
    ApplicationProtocol, HealthCheck, TargetGroup, TargetGroupProps, TargetType,
};

/// Kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    SecurityGroup,
    LoadBalancer,
    TargetGroup,
    Listener,
    InterfaceEndpoint,
}

impl ResourceKind {
    /// Human readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::TargetGroup => "target_group",
            ResourceKind::Listener => "listener",
            ResourceKind::InterfaceEndpoint => "interface_endpoint",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every descriptor that can be the target of a [`Handle`].
pub trait Resource {
    /// Kind tag of the descriptor.
    const KIND: ResourceKind;

    /// Construct path relative to the owning stack, e.g. `ApplicationLoadBalancer/Listener`.
    fn path(&self) -> &str;
}

/// Reference to a resource declared in a specific stack.
pub struct Handle<T> {
    pub(crate) stack: u64,
    pub(crate) index: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(stack: u64, index: usize) -> Self {
        Self {
            stack,
            index,
            _kind: PhantomData,
        }
    }

    /// Position of the resource in its stack's table.
    pub fn index(&self) -> usize {
        self.index
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.stack == other.stack && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stack.hash(state);
        self.index.hash(state);
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", T::KIND, self.index)
    }
}

pub type VpcRef = Handle<Vpc>;
pub type SecurityGroupRef = Handle<SecurityGroup>;
pub type LoadBalancerRef = Handle<ApplicationLoadBalancer>;
pub type TargetGroupRef = Handle<TargetGroup>;
pub type ListenerRef = Handle<Listener>;
pub type InterfaceEndpointRef = Handle<InterfaceEndpoint>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_handle_equality_includes_stack() {
        let a: VpcRef = Handle::new(1, 0);
        let b: VpcRef = Handle::new(2, 0);
        assert_ne!(a, b);
        assert_eq!(a, Handle::new(1, 0));

        let set: HashSet<VpcRef> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_handle_debug() {
        let tg: TargetGroupRef = Handle::new(7, 3);
        assert_eq!(format!("{:?}", tg), "target_group#3");
    }
}
