//! Stacks: the unit of declaration and synthesis.
//!
//! A [`Stack`] owns one table per resource kind. Declaring a resource appends
//! it to its table and returns a [`Handle`] into that table; every handle a
//! declaration receives is checked against the stack that minted it. Each
//! resource is registered under a construct path (its id, or `parent/id` for
//! nested constructs such as listeners) that must be unique in the stack.

pub mod app;
pub mod dependencies;
pub mod logical_id;

use indexmap::IndexMap;
use tracing::{debug, trace};

pub use app::App;
pub use dependencies::{DependencyGraph, DependencyNode, DependencyType, ResourceDependency};
pub use logical_id::{logical_id, resource_logical_id};

use crate::error::{Error, Result};
use crate::resources::endpoint::ENDPOINT_PORT;
use crate::resources::{
    ApplicationLoadBalancer, Handle, IngressRule, InterfaceEndpoint, InterfaceEndpointProps,
    InterfaceEndpointRef, Listener, ListenerProps, ListenerRef, LoadBalancerProps,
    LoadBalancerRef, Peer, Port, Protocol, Resource, ResourceKind, SecurityGroup, SecurityGroupProps,
    SecurityGroupRef, TargetGroup, TargetGroupProps, TargetGroupRef, Vpc, VpcProps, VpcRef,
};

/// Access to the table holding resources of type `T`.
pub trait ResourceTable<T> {
    fn table(&self) -> &[T];
}

/// A set of resource declarations deployed together.
#[derive(Debug)]
pub struct Stack {
    ordinal: u64,
    id: String,
    region: String,
    description: Option<String>,
    constructs: IndexMap<String, ResourceKind>,
    vpcs: Vec<Vpc>,
    security_groups: Vec<SecurityGroup>,
    load_balancers: Vec<ApplicationLoadBalancer>,
    target_groups: Vec<TargetGroup>,
    listeners: Vec<Listener>,
    endpoints: Vec<InterfaceEndpoint>,
    /// (dependency, dependent) construct paths
    explicit_dependencies: Vec<(String, String)>,
}

macro_rules! resource_table {
    ($ty:ty, $field:ident) => {
        impl ResourceTable<$ty> for Stack {
            fn table(&self) -> &[$ty] {
                &self.$field
            }
        }
    };
}

resource_table!(Vpc, vpcs);
resource_table!(SecurityGroup, security_groups);
resource_table!(ApplicationLoadBalancer, load_balancers);
resource_table!(TargetGroup, target_groups);
resource_table!(Listener, listeners);
resource_table!(InterfaceEndpoint, endpoints);

impl Stack {
    /// Create an empty standalone stack deployed to `region`.
    ///
    /// Stacks added through [`App::add_stack`] get an ordinal unique within
    /// their app, so handles cannot cross between them. Standalone stacks all
    /// share ordinal 0.
    pub fn new(id: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        Self::with_ordinal(id, region, 0)
    }

    pub(crate) fn with_ordinal(
        id: impl Into<String>,
        region: impl Into<String>,
        ordinal: u64,
    ) -> Result<Self> {
        let id = id.into();
        if !logical_id::is_valid_construct_id(&id) {
            return Err(Error::validation(&id, "invalid stack id"));
        }

        Ok(Self {
            ordinal,
            id,
            region: region.into(),
            description: None,
            constructs: IndexMap::new(),
            vpcs: Vec::new(),
            security_groups: Vec::new(),
            load_balancers: Vec::new(),
            target_groups: Vec::new(),
            listeners: Vec::new(),
            endpoints: Vec::new(),
            explicit_dependencies: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Declared construct paths with their kinds, in declaration order.
    pub fn constructs(&self) -> impl Iterator<Item = (&str, ResourceKind)> {
        self.constructs.iter().map(|(p, k)| (p.as_str(), *k))
    }

    pub fn vpcs(&self) -> &[Vpc] {
        &self.vpcs
    }

    pub fn security_groups(&self) -> &[SecurityGroup] {
        &self.security_groups
    }

    pub fn load_balancers(&self) -> &[ApplicationLoadBalancer] {
        &self.load_balancers
    }

    pub fn target_groups(&self) -> &[TargetGroup] {
        &self.target_groups
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn interface_endpoints(&self) -> &[InterfaceEndpoint] {
        &self.endpoints
    }

    /// Resolve a handle minted by this stack.
    pub fn get<T: Resource>(&self, handle: Handle<T>) -> Result<&T>
    where
        Self: ResourceTable<T>,
    {
        if handle.stack != self.ordinal {
            return Err(self.unknown::<T>(handle));
        }
        <Self as ResourceTable<T>>::table(self)
            .get(handle.index)
            .ok_or_else(|| self.unknown::<T>(handle))
    }

    /// Construct path of a handle's target.
    pub fn path_of<'a, T: Resource + 'a>(&'a self, handle: Handle<T>) -> Result<&'a str>
    where
        Self: ResourceTable<T>,
    {
        self.get(handle).map(|r| r.path())
    }

    /// Look up a security group by construct path.
    pub fn security_group(&self, path: &str) -> Option<&SecurityGroup> {
        self.security_groups.iter().find(|sg| sg.path == path)
    }

    fn unknown<T: Resource>(&self, handle: Handle<T>) -> Error {
        Error::UnknownReference {
            stack: self.id.clone(),
            kind: T::KIND.as_str(),
            index: handle.index,
        }
    }

    fn handle<T>(&self, index: usize) -> Handle<T> {
        Handle::new(self.ordinal, index)
    }

    /// Fail unless `path` is well formed and not yet declared.
    fn ensure_available(&self, path: &str) -> Result<()> {
        if !path.split('/').all(logical_id::is_valid_construct_id) {
            return Err(Error::validation(path, "invalid construct id"));
        }
        if self.constructs.contains_key(path) {
            return Err(Error::DuplicateConstruct {
                stack: self.id.clone(),
                id: path.to_string(),
            });
        }
        Ok(())
    }

    fn register(&mut self, path: &str, kind: ResourceKind) -> Result<()> {
        self.ensure_available(path)?;
        self.constructs.insert(path.to_string(), kind);
        debug!(stack = %self.id, construct = path, kind = %kind, "declared");
        Ok(())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declare a VPC and carve its subnets.
    pub fn add_vpc(&mut self, id: &str, props: VpcProps) -> Result<VpcRef> {
        let vpc = Vpc::from_props(id, props)?;
        self.register(id, ResourceKind::Vpc)?;
        self.vpcs.push(vpc);
        Ok(self.handle(self.vpcs.len() - 1))
    }

    /// Declare a security group with no inbound rules.
    pub fn add_security_group(
        &mut self,
        id: &str,
        props: SecurityGroupProps,
    ) -> Result<SecurityGroupRef> {
        self.get(props.vpc)?;
        self.register(id, ResourceKind::SecurityGroup)?;
        self.security_groups
            .push(SecurityGroup::from_props(id, &self.id, props));
        Ok(self.handle(self.security_groups.len() - 1))
    }

    /// Add an inbound rule. Returns `false` when an equivalent rule already exists.
    pub fn add_ingress_rule(
        &mut self,
        group: SecurityGroupRef,
        peer: Peer,
        port: Port,
        description: impl Into<String>,
    ) -> Result<bool> {
        self.get(group)?;
        let sg = &mut self.security_groups[group.index];
        let added = sg.add_ingress_rule(IngressRule::new(peer, port, description));
        if added {
            trace!(group = %sg.path, %peer, %port, "ingress rule added");
        }
        Ok(added)
    }

    /// Declare an application load balancer.
    ///
    /// Without an explicit security group, one is created at `<id>/SecurityGroup`.
    pub fn add_application_load_balancer(
        &mut self,
        id: &str,
        props: LoadBalancerProps,
    ) -> Result<LoadBalancerRef> {
        // Before the automatic security group exists.
        self.ensure_available(id)?;
        let vpc = self.get(props.vpc)?;
        if props.internet_facing && vpc.public_subnets().is_empty() {
            return Err(Error::validation(
                id,
                "an internet-facing load balancer needs public subnets",
            ));
        }

        let security_group = match props.security_group {
            Some(sg) => {
                if self.get(sg)?.vpc != props.vpc {
                    return Err(Error::validation(
                        id,
                        "security group belongs to a different VPC",
                    ));
                }
                sg
            }
            None => {
                let description = format!(
                    "Automatically created Security Group for ELB {}{}",
                    self.id, id
                );
                self.add_security_group(
                    &format!("{}/SecurityGroup", id),
                    SecurityGroupProps::new(props.vpc)
                        .with_description(description)
                        .with_allow_all_outbound(false),
                )?
            }
        };

        self.register(id, ResourceKind::LoadBalancer)?;
        self.load_balancers.push(ApplicationLoadBalancer::new(
            id,
            props.vpc,
            props.internet_facing,
            security_group,
        ));
        Ok(self.handle(self.load_balancers.len() - 1))
    }

    /// Declare a target group.
    pub fn add_target_group(&mut self, id: &str, props: TargetGroupProps) -> Result<TargetGroupRef> {
        self.get(props.vpc)?;
        self.register(id, ResourceKind::TargetGroup)?;
        self.target_groups.push(TargetGroup::from_props(id, props));
        Ok(self.handle(self.target_groups.len() - 1))
    }

    /// Add a listener to a load balancer, at `<load balancer>/<id>`.
    ///
    /// An `open` listener admits its port from anywhere on every security group
    /// of the load balancer.
    pub fn add_listener(
        &mut self,
        load_balancer: LoadBalancerRef,
        id: &str,
        props: ListenerProps,
    ) -> Result<ListenerRef> {
        let lb = self.get(load_balancer)?.clone();
        let path = format!("{}/{}", lb.path, id);
        let open = props.open;
        let listener = Listener::from_props(&path, load_balancer, props)?;

        for tg in listener.default_action.target_groups() {
            if self.get(*tg)?.vpc != lb.vpc {
                return Err(Error::validation(
                    &path,
                    "target group belongs to a different VPC than the load balancer",
                ));
            }
        }

        self.register(&path, ResourceKind::Listener)?;
        if open {
            for sg in &lb.security_groups {
                self.add_ingress_rule(
                    *sg,
                    Peer::any_ipv4(),
                    Port::tcp(listener.port),
                    format!("Allow from anyone on port {}", listener.port),
                )?;
            }
        }
        self.listeners.push(listener);
        Ok(self.handle(self.listeners.len() - 1))
    }

    /// Declare an interface endpoint.
    ///
    /// Without security groups, one is created at `<id>/SecurityGroup`. An
    /// `open` endpoint admits HTTPS from the VPC block on its groups.
    pub fn add_interface_endpoint(
        &mut self,
        id: &str,
        props: InterfaceEndpointProps,
    ) -> Result<InterfaceEndpointRef> {
        self.ensure_available(id)?;
        let vpc = self.get(props.vpc)?;
        let vpc_cidr = vpc.cidr;
        if vpc.subnets_of(props.subnet_type).is_empty() {
            return Err(Error::validation(
                id,
                format!("VPC has no {:?} subnets to place the endpoint in", props.subnet_type),
            ));
        }

        for sg in &props.security_groups {
            if self.get(*sg)?.vpc != props.vpc {
                return Err(Error::validation(
                    id,
                    "security group belongs to a different VPC",
                ));
            }
        }

        let endpoint = InterfaceEndpoint::new(id, &props, props.security_groups.clone())?;
        let groups = if props.security_groups.is_empty() {
            vec![self.add_security_group(
                &format!("{}/SecurityGroup", id),
                SecurityGroupProps::new(props.vpc),
            )?]
        } else {
            props.security_groups.clone()
        };

        self.register(id, ResourceKind::InterfaceEndpoint)?;
        if props.open {
            for sg in &groups {
                self.add_ingress_rule(
                    *sg,
                    Peer::ipv4(vpc_cidr),
                    Port::tcp(ENDPOINT_PORT),
                    format!("from {}:{}", vpc_cidr, ENDPOINT_PORT),
                )?;
            }
        }

        self.endpoints.push(InterfaceEndpoint {
            security_groups: groups,
            ..endpoint
        });
        Ok(self.handle(self.endpoints.len() - 1))
    }

    /// Make `dependent` wait for `dependency`, both given as construct paths.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        for path in [dependent, dependency] {
            if !self.constructs.contains_key(path) {
                return Err(Error::validation(path, "unknown construct in dependency"));
            }
        }
        self.explicit_dependencies
            .push((dependency.to_string(), dependent.to_string()));
        Ok(())
    }

    /// Construct paths `path` was told to wait for with [`Stack::add_dependency`].
    pub fn explicit_dependencies_of(&self, path: &str) -> Vec<&str> {
        self.explicit_dependencies
            .iter()
            .filter(|(_, dependent)| dependent == path)
            .map(|(dependency, _)| dependency.as_str())
            .collect()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Build the dependency graph from the typed references between declarations.
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for (path, kind) in &self.constructs {
            graph.add_node(DependencyNode::new(path, resource_logical_id(path), *kind));
        }

        for sg in &self.security_groups {
            graph.add_dependency(self.path_of(sg.vpc)?, &sg.path, DependencyType::Reference)?;
        }
        for lb in &self.load_balancers {
            graph.add_dependency(self.path_of(lb.vpc)?, &lb.path, DependencyType::Placement)?;
            for sg in &lb.security_groups {
                graph.add_dependency(self.path_of(*sg)?, &lb.path, DependencyType::Reference)?;
            }
        }
        for tg in &self.target_groups {
            graph.add_dependency(self.path_of(tg.vpc)?, &tg.path, DependencyType::Reference)?;
        }
        for listener in &self.listeners {
            graph.add_dependency(
                self.path_of(listener.load_balancer)?,
                &listener.path,
                DependencyType::Reference,
            )?;
            for tg in listener.default_action.target_groups() {
                graph.add_dependency(
                    self.path_of(*tg)?,
                    &listener.path,
                    DependencyType::Reference,
                )?;
            }
        }
        for endpoint in &self.endpoints {
            graph.add_dependency(
                self.path_of(endpoint.vpc)?,
                &endpoint.path,
                DependencyType::Placement,
            )?;
            for sg in &endpoint.security_groups {
                graph.add_dependency(
                    self.path_of(*sg)?,
                    &endpoint.path,
                    DependencyType::Reference,
                )?;
            }
        }
        for (dependency, dependent) in &self.explicit_dependencies {
            graph.add_dependency(dependency, dependent, DependencyType::Explicit)?;
        }

        Ok(graph)
    }

    /// Validate every declaration and the dependency graph.
    pub fn validate(&self) -> Result<()> {
        for vpc in &self.vpcs {
            vpc.validate()?;
        }
        for sg in &self.security_groups {
            self.get(sg.vpc)?;
            sg.validate()?;
        }
        for tg in &self.target_groups {
            self.get(tg.vpc)?;
            tg.validate()?;
        }
        for lb in &self.load_balancers {
            self.get(lb.vpc)?;
            if lb.security_groups.is_empty() {
                return Err(Error::validation(&lb.path, "no security group attached"));
            }
        }
        for listener in &self.listeners {
            let lb = self.get(listener.load_balancer)?;
            for tg in listener.default_action.target_groups() {
                self.get(*tg)?;
            }
            for sg in &lb.security_groups {
                let group = self.get(*sg)?;
                if !group.allows_from_anywhere(Protocol::Tcp, listener.port) {
                    debug!(
                        listener = %listener.path,
                        group = %group.path,
                        "listener port is not open to the internet"
                    );
                }
            }
        }
        for endpoint in &self.endpoints {
            self.get(endpoint.vpc)?;
            if endpoint.security_groups.is_empty() {
                return Err(Error::validation(&endpoint.path, "no security group attached"));
            }
        }

        self.dependency_graph()?.deployment_order()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{
        EndpointService, ListenerAction, SubnetConfiguration, SubnetType,
    };

    fn stack_with_vpc() -> (Stack, VpcRef) {
        let mut stack = Stack::new("TestStack", "ap-northeast-2").unwrap();
        let vpc = stack
            .add_vpc(
                "Vpc",
                VpcProps::new().with_max_azs(2).with_subnets(vec![
                    SubnetConfiguration::new("Public", SubnetType::Public, 24),
                    SubnetConfiguration::new("Private", SubnetType::PrivateWithNat, 24),
                ]),
            )
            .unwrap();
        (stack, vpc)
    }

    #[test]
    fn test_duplicate_construct_rejected() {
        let (mut stack, vpc) = stack_with_vpc();
        stack
            .add_security_group("Sg", SecurityGroupProps::new(vpc))
            .unwrap();
        let err = stack
            .add_security_group("Sg", SecurityGroupProps::new(vpc))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateConstruct { .. }));
    }

    #[test]
    fn test_rejected_load_balancer_leaves_no_security_group() {
        let (mut stack, vpc) = stack_with_vpc();
        let err = stack
            .add_application_load_balancer(
                "Vpc",
                LoadBalancerProps::new(vpc).with_internet_facing(true),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateConstruct { .. }));
        assert!(stack.add_application_load_balancer("bad id", LoadBalancerProps::new(vpc)).is_err());

        let paths: Vec<&str> = stack.constructs().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["Vpc"]);
        assert!(stack.security_groups().is_empty());
        let template = crate::synth::synthesize(&stack).unwrap();
        assert_eq!(template.count_of_type("AWS::EC2::SecurityGroup"), 0);
    }

    #[test]
    fn test_rejected_endpoint_leaves_no_security_group() {
        let (mut stack, vpc) = stack_with_vpc();
        let err = stack
            .add_interface_endpoint("Vpc", InterfaceEndpointProps::new(vpc, EndpointService::Ssm))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateConstruct { .. }));

        let paths: Vec<&str> = stack.constructs().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["Vpc"]);
        assert!(stack.security_groups().is_empty());
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut app = App::default();
        let foreign_vpc = app
            .add_stack("Network")
            .unwrap()
            .add_vpc("Vpc", VpcProps::new().with_max_azs(1))
            .unwrap();
        let stack = app.add_stack("Web").unwrap();
        stack.add_vpc("Vpc", VpcProps::new().with_max_azs(1)).unwrap();
        let err = stack
            .add_security_group("Sg", SecurityGroupProps::new(foreign_vpc))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownReference { kind: "vpc", .. }));
    }

    #[test]
    fn test_load_balancer_creates_security_group() {
        let (mut stack, vpc) = stack_with_vpc();
        let lb = stack
            .add_application_load_balancer(
                "Alb",
                LoadBalancerProps::new(vpc).with_internet_facing(true),
            )
            .unwrap();
        let alb = stack.get(lb).unwrap();
        assert_eq!(stack.path_of(alb.security_groups[0]).unwrap(), "Alb/SecurityGroup");
        assert!(!stack.security_group("Alb/SecurityGroup").unwrap().allow_all_outbound);
    }

    #[test]
    fn test_open_listener_adds_rule_once() {
        let (mut stack, vpc) = stack_with_vpc();
        let sg = stack
            .add_security_group("AlbSg", SecurityGroupProps::new(vpc))
            .unwrap();
        stack
            .add_ingress_rule(sg, Peer::any_ipv4(), Port::tcp(80), "Allow HTTP traffic")
            .unwrap();
        let lb = stack
            .add_application_load_balancer(
                "Alb",
                LoadBalancerProps::new(vpc)
                    .with_internet_facing(true)
                    .with_security_group(sg),
            )
            .unwrap();
        let tg = stack
            .add_target_group("Tg", TargetGroupProps::new(vpc))
            .unwrap();
        let listener = stack
            .add_listener(lb, "Listener", ListenerProps::new(80).with_default_target_groups([tg]))
            .unwrap();

        assert_eq!(stack.path_of(listener).unwrap(), "Alb/Listener");
        let group = stack.get(sg).unwrap();
        assert_eq!(group.ingress.len(), 1);
        assert_eq!(group.ingress[0].description, "Allow HTTP traffic");
    }

    #[test]
    fn test_closed_listener_leaves_rules_alone() {
        let (mut stack, vpc) = stack_with_vpc();
        let lb = stack
            .add_application_load_balancer("Alb", LoadBalancerProps::new(vpc))
            .unwrap();
        let tg = stack
            .add_target_group("Tg", TargetGroupProps::new(vpc))
            .unwrap();
        stack
            .add_listener(
                lb,
                "Listener",
                ListenerProps::new(80)
                    .with_open(false)
                    .with_default_action(ListenerAction::forward([tg])),
            )
            .unwrap();
        assert!(stack
            .security_group("Alb/SecurityGroup")
            .unwrap()
            .ingress
            .is_empty());
    }

    #[test]
    fn test_endpoint_opens_https_from_vpc() {
        let (mut stack, vpc) = stack_with_vpc();
        let endpoint = stack
            .add_interface_endpoint("Ssm", InterfaceEndpointProps::new(vpc, EndpointService::Ssm))
            .unwrap();
        let ep = stack.get(endpoint).unwrap();
        let sg = stack.get(ep.security_groups[0]).unwrap();
        assert_eq!(sg.path, "Ssm/SecurityGroup");
        assert_eq!(sg.ingress[0].peer.cidr().to_string(), "10.0.0.0/16");
        assert_eq!(sg.ingress[0].port, Port::tcp(443));
        assert_eq!(sg.ingress[0].description, "from 10.0.0.0/16:443");
    }

    #[test]
    fn test_endpoint_needs_matching_subnets() {
        let mut stack = Stack::new("TestStack", "ap-northeast-2").unwrap();
        let vpc = stack
            .add_vpc(
                "Vpc",
                VpcProps::new().with_max_azs(1).with_subnets(vec![SubnetConfiguration::new(
                    "Public",
                    SubnetType::Public,
                    24,
                )]),
            )
            .unwrap();
        assert!(stack
            .add_interface_endpoint("Ssm", InterfaceEndpointProps::new(vpc, EndpointService::Ssm))
            .is_err());
    }

    #[test]
    fn test_explicit_dependency_cycle_fails_validation() {
        let (mut stack, vpc) = stack_with_vpc();
        stack
            .add_security_group("Sg", SecurityGroupProps::new(vpc))
            .unwrap();
        stack.validate().unwrap();

        stack.add_dependency("Vpc", "Sg").unwrap();
        assert!(matches!(stack.validate(), Err(Error::DependencyCycle(_))));
    }

    #[test]
    fn test_add_dependency_requires_known_paths() {
        let (mut stack, _) = stack_with_vpc();
        assert!(stack.add_dependency("Vpc", "Missing").is_err());
    }

    #[test]
    fn test_invalid_stack_id() {
        assert!(Stack::new("bad/id", "ap-northeast-2").is_err());
    }
}
