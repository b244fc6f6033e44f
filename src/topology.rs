//! The VPC + ALB topology, in its two flavours.
//!
//! Both stacks declare the same network: a `10.0.0.0/16` VPC over two
//! availability zones with one public and one private-with-NAT `/24` subnet
//! group, an internet-facing load balancer with an HTTP listener forwarding to
//! an IP target group, and a UI security group. They differ in:
//!
//! | | [`StackVariant::Ssm`] | [`StackVariant::Lean`] |
//! |---|---|---|
//! | CIDR | `cidr` setter | [`IpAddresses::cidr`] |
//! | NAT gateways | one per AZ | 1 |
//! | Listener action | default target groups | [`ListenerAction::forward`] |
//! | SSM endpoints | yes | no |

use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::resources::{
    ApplicationProtocol, EndpointService, HealthCheck, InterfaceEndpointProps, IpAddresses,
    ListenerAction, ListenerProps, LoadBalancerProps, Peer, Port, SecurityGroupProps,
    SubnetConfiguration, SubnetType, TargetGroupProps, TargetType, VpcProps,
};
use crate::stack::App;

/// Id of the stack with SSM endpoints.
pub const SSM_STACK_ID: &str = "VpcAlbStack";

/// Id of the stack without them.
pub const LEAN_STACK_ID: &str = "VpcAlbLeanStack";

pub const VPC_CIDR: &str = "10.0.0.0/16";

/// Which flavour of the topology to declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackVariant {
    /// Legacy CIDR setter, a NAT gateway per AZ, SSM interface endpoints
    Ssm,
    /// CIDR allocator, a single NAT gateway, no endpoints
    Lean,
}

impl StackVariant {
    pub fn stack_id(&self) -> &'static str {
        match self {
            StackVariant::Ssm => SSM_STACK_ID,
            StackVariant::Lean => LEAN_STACK_ID,
        }
    }
}

fn subnet_groups() -> Vec<SubnetConfiguration> {
    vec![
        SubnetConfiguration::new("PublicSubnet", SubnetType::Public, 24),
        SubnetConfiguration::new("PrivateSubnet", SubnetType::PrivateWithNat, 24),
    ]
}

fn health_check() -> HealthCheck {
    HealthCheck {
        path: "/".to_string(),
        interval: Duration::from_secs(30),
        timeout: Duration::from_secs(5),
        healthy_threshold_count: 3,
        unhealthy_threshold_count: 3,
    }
}

/// Declare the topology as stack `id` of `app`.
pub fn define_vpc_alb_stack(app: &mut App, id: &str, variant: StackVariant) -> Result<()> {
    let stack = app.add_stack(id)?;

    let vpc_props = VpcProps::new().with_max_azs(2).with_subnets(subnet_groups());
    let vpc_props = match variant {
        StackVariant::Ssm => vpc_props.with_cidr(VPC_CIDR),
        StackVariant::Lean => vpc_props
            .with_ip_addresses(IpAddresses::cidr(VPC_CIDR)?)
            .with_nat_gateways(1),
    };
    let vpc = stack.add_vpc("MyVPC", vpc_props)?;

    let alb_sg = stack.add_security_group(
        "ALBSecurityGroup",
        SecurityGroupProps::new(vpc)
            .with_description("Allow HTTP traffic to ALB")
            .with_allow_all_outbound(true),
    )?;
    stack.add_ingress_rule(alb_sg, Peer::any_ipv4(), Port::tcp(80), "Allow HTTP traffic")?;

    let alb = stack.add_application_load_balancer(
        "ApplicationLoadBalancer",
        LoadBalancerProps::new(vpc)
            .with_internet_facing(true)
            .with_security_group(alb_sg),
    )?;

    let target_group = stack.add_target_group(
        "TargetGroup",
        TargetGroupProps::new(vpc)
            .with_protocol(ApplicationProtocol::Http)
            .with_port(80)
            .with_target_type(TargetType::Ip)
            .with_health_check(health_check()),
    )?;

    let listener = ListenerProps::new(80).with_open(true);
    let listener = match variant {
        StackVariant::Ssm => listener.with_default_target_groups([target_group]),
        StackVariant::Lean => {
            listener.with_default_action(ListenerAction::forward([target_group]))
        }
    };
    stack.add_listener(alb, "Listener", listener)?;

    let ui_sg = stack.add_security_group(
        "UISecurityGroup",
        SecurityGroupProps::new(vpc)
            .with_description("Allow TCP traffic on ports 80 and 8080")
            .with_allow_all_outbound(true),
    )?;
    stack.add_ingress_rule(ui_sg, Peer::any_ipv4(), Port::tcp(80), "Allow HTTP traffic")?;
    stack.add_ingress_rule(
        ui_sg,
        Peer::any_ipv4(),
        Port::tcp(8080),
        "Allow traffic on port 8080",
    )?;

    if variant == StackVariant::Ssm {
        let ssm_sg = stack.add_security_group(
            "SSMSecurityGroup",
            SecurityGroupProps::new(vpc)
                .with_description("Allow SSM access to private instances")
                .with_allow_all_outbound(true),
        )?;

        for (endpoint_id, service) in [
            ("SSMEndpoint", EndpointService::Ssm),
            ("SSMMessagesEndpoint", EndpointService::SsmMessages),
            ("EC2MessagesEndpoint", EndpointService::Ec2Messages),
        ] {
            stack.add_interface_endpoint(
                endpoint_id,
                InterfaceEndpointProps::new(vpc, service)
                    .with_security_groups([ssm_sg])
                    .with_subnet_type(SubnetType::PrivateWithNat),
            )?;
        }
    }

    info!(stack = id, ?variant, constructs = stack.constructs().count(), "topology declared");
    Ok(())
}

/// Build the app with both stacks in `region`.
pub fn build_app(region: &str) -> Result<App> {
    let mut app = App::new(region);
    define_vpc_alb_stack(&mut app, SSM_STACK_ID, StackVariant::Ssm)?;
    define_vpc_alb_stack(&mut app, LEAN_STACK_ID, StackVariant::Lean)?;
    Ok(app)
}
