//! Integration tests for the VPC + ALB topology
//!
//! Each declared resource is checked against its literal parameters, both on
//! the typed declarations and in the synthesized templates.

use netform::prelude::*;
use netform::stack::{logical_id, resource_logical_id};
use netform::topology::{LEAN_STACK_ID, SSM_STACK_ID};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

fn app() -> App {
    build_app("ap-northeast-2").unwrap()
}

fn template(stack_id: &str) -> Template {
    let app = app();
    synthesize(app.stack(stack_id).unwrap()).unwrap()
}

/// Property of the resource at `path`, below the construct tree.
fn property<'a>(template: &'a Template, path: &str, name: &str) -> &'a Value {
    template
        .resource(&logical_id(path))
        .unwrap_or_else(|| panic!("no resource for {}", path))
        .property(name)
        .unwrap_or_else(|| panic!("{} has no {}", path, name))
}

// ============================================================================
// Network
// ============================================================================

#[test]
fn test_subnet_blocks() {
    for stack_id in [SSM_STACK_ID, LEAN_STACK_ID] {
        let app = app();
        let vpc = &app.stack(stack_id).unwrap().vpcs()[0];
        assert_eq!(vpc.cidr.to_string(), "10.0.0.0/16");

        let blocks: Vec<(String, String)> = vpc
            .subnets
            .iter()
            .map(|s| (s.id.clone(), s.cidr.to_string()))
            .collect();
        assert_eq!(
            blocks,
            vec![
                ("PublicSubnetSubnet1".to_string(), "10.0.0.0/24".to_string()),
                ("PublicSubnetSubnet2".to_string(), "10.0.1.0/24".to_string()),
                ("PrivateSubnetSubnet1".to_string(), "10.0.2.0/24".to_string()),
                ("PrivateSubnetSubnet2".to_string(), "10.0.3.0/24".to_string()),
            ]
        );
    }
}

#[test]
fn test_cidr_styles_produce_identical_networks() {
    let ssm = template(SSM_STACK_ID);
    let lean = template(LEAN_STACK_ID);
    let blocks = |t: &Template| -> Vec<Value> {
        t.resources_of_type("AWS::EC2::Subnet")
            .map(|(_, r)| r.property("CidrBlock").unwrap().clone())
            .collect()
    };
    assert_eq!(blocks(&ssm), blocks(&lean));
    assert_eq!(
        property(&ssm, "MyVPC/Resource", "CidrBlock"),
        property(&lean, "MyVPC/Resource", "CidrBlock")
    );
}

#[test]
fn test_vpc_properties() {
    let t = template(SSM_STACK_ID);
    assert_eq!(property(&t, "MyVPC/Resource", "EnableDnsHostnames"), &json!(true));
    assert_eq!(property(&t, "MyVPC/Resource", "EnableDnsSupport"), &json!(true));
    assert_eq!(
        property(&t, "MyVPC/PublicSubnetSubnet2/Subnet", "AvailabilityZone"),
        &json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
    );
    assert_eq!(
        property(&t, "MyVPC/PublicSubnetSubnet1/Subnet", "MapPublicIpOnLaunch"),
        &json!(true)
    );
    assert_eq!(
        property(&t, "MyVPC/PrivateSubnetSubnet1/Subnet", "MapPublicIpOnLaunch"),
        &json!(false)
    );
    assert_eq!(t.count_of_type("AWS::EC2::InternetGateway"), 1);
    assert_eq!(t.count_of_type("AWS::EC2::VPCGatewayAttachment"), 1);
}

#[test]
fn test_nat_gateways_per_variant() {
    let ssm = template(SSM_STACK_ID);
    let lean = template(LEAN_STACK_ID);
    assert_eq!(ssm.count_of_type("AWS::EC2::NatGateway"), 2);
    assert_eq!(ssm.count_of_type("AWS::EC2::EIP"), 2);
    assert_eq!(lean.count_of_type("AWS::EC2::NatGateway"), 1);
    assert_eq!(lean.count_of_type("AWS::EC2::EIP"), 1);

    // One gateway per AZ: each private subnet routes through its own zone's NAT.
    assert_eq!(
        property(&ssm, "MyVPC/PrivateSubnetSubnet2/DefaultRoute", "NatGatewayId"),
        &json!({ "Ref": logical_id("MyVPC/PublicSubnetSubnet2/NATGateway") })
    );
    // A single gateway serves both zones.
    assert_eq!(
        property(&lean, "MyVPC/PrivateSubnetSubnet2/DefaultRoute", "NatGatewayId"),
        &json!({ "Ref": logical_id("MyVPC/PublicSubnetSubnet1/NATGateway") })
    );
}

// ============================================================================
// Security groups
// ============================================================================

#[test]
fn test_alb_security_group() {
    let t = template(SSM_STACK_ID);
    assert_eq!(
        property(&t, "ALBSecurityGroup/Resource", "GroupDescription"),
        "Allow HTTP traffic to ALB"
    );
    assert_eq!(
        property(&t, "ALBSecurityGroup/Resource", "SecurityGroupIngress"),
        &json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow HTTP traffic",
            "FromPort": 80,
            "IpProtocol": "tcp",
            "ToPort": 80,
        }])
    );
    assert_eq!(
        property(&t, "ALBSecurityGroup/Resource", "SecurityGroupEgress"),
        &json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1",
        }])
    );
}

#[test]
fn test_ui_security_group_opens_exactly_80_and_8080() {
    for stack_id in [SSM_STACK_ID, LEAN_STACK_ID] {
        let app = app();
        let sg = app
            .stack(stack_id)
            .unwrap()
            .security_group("UISecurityGroup")
            .unwrap();
        assert_eq!(sg.description, "Allow TCP traffic on ports 80 and 8080");
        assert_eq!(sg.tcp_ports(), vec![80, 8080]);
        assert!(sg.ingress.iter().all(|r| r.peer == Peer::any_ipv4()));
        assert_eq!(sg.ingress[1].description, "Allow traffic on port 8080");
    }
}

#[test]
fn test_ssm_security_group() {
    let t = template(SSM_STACK_ID);
    assert_eq!(
        property(&t, "SSMSecurityGroup/Resource", "GroupDescription"),
        "Allow SSM access to private instances"
    );
    assert_eq!(
        property(&t, "SSMSecurityGroup/Resource", "SecurityGroupIngress"),
        &json!([{
            "CidrIp": "10.0.0.0/16",
            "Description": "from 10.0.0.0/16:443",
            "FromPort": 443,
            "IpProtocol": "tcp",
            "ToPort": 443,
        }])
    );
}

// ============================================================================
// Load balancing
// ============================================================================

#[test]
fn test_load_balancer() {
    let t = template(SSM_STACK_ID);
    let path = "ApplicationLoadBalancer/Resource";
    assert_eq!(property(&t, path, "Scheme"), "internet-facing");
    assert_eq!(property(&t, path, "Type"), "application");
    assert_eq!(
        property(&t, path, "SecurityGroups"),
        &json!([{ "Fn::GetAtt": [resource_logical_id("ALBSecurityGroup"), "GroupId"] }])
    );
    assert_eq!(
        property(&t, path, "Subnets"),
        &json!([
            { "Ref": logical_id("MyVPC/PublicSubnetSubnet1/Subnet") },
            { "Ref": logical_id("MyVPC/PublicSubnetSubnet2/Subnet") },
        ])
    );

    let alb = t.resource(&logical_id(path)).unwrap();
    assert!(alb
        .depends_on
        .contains(&logical_id("MyVPC/PublicSubnetSubnet1/DefaultRoute")));
}

#[test]
fn test_target_group_health_check() {
    let app = app();
    let stack = app.stack(SSM_STACK_ID).unwrap();
    let tg = &stack.target_groups()[0];
    assert_eq!(tg.port, 80);
    assert_eq!(tg.protocol, ApplicationProtocol::Http);
    assert_eq!(tg.target_type, TargetType::Ip);
    assert_eq!(tg.health_check.path, "/");
    assert_eq!(tg.health_check.interval, Duration::from_secs(30));
    assert_eq!(tg.health_check.timeout, Duration::from_secs(5));
    assert_eq!(tg.health_check.healthy_threshold_count, 3);
    assert_eq!(tg.health_check.unhealthy_threshold_count, 3);

    let t = synthesize(stack).unwrap();
    assert_eq!(property(&t, "TargetGroup/Resource", "HealthCheckIntervalSeconds"), &json!(30));
    assert_eq!(property(&t, "TargetGroup/Resource", "HealthCheckTimeoutSeconds"), &json!(5));
    assert_eq!(property(&t, "TargetGroup/Resource", "HealthCheckPath"), "/");
    assert_eq!(property(&t, "TargetGroup/Resource", "TargetType"), "ip");
    assert_eq!(property(&t, "TargetGroup/Resource", "Protocol"), "HTTP");
}

#[test]
fn test_listener_forwards_to_target_group_in_both_styles() {
    for stack_id in [SSM_STACK_ID, LEAN_STACK_ID] {
        let t = template(stack_id);
        let path = "ApplicationLoadBalancer/Listener/Resource";
        assert_eq!(property(&t, path, "Port"), &json!(80));
        assert_eq!(property(&t, path, "Protocol"), "HTTP");
        assert_eq!(
            property(&t, path, "DefaultActions"),
            &json!([{
                "TargetGroupArn": { "Ref": resource_logical_id("TargetGroup") },
                "Type": "forward",
            }])
        );
    }
}

// ============================================================================
// Endpoints
// ============================================================================

#[test]
fn test_ssm_endpoints_only_in_ssm_variant() {
    let ssm = template(SSM_STACK_ID);
    let lean = template(LEAN_STACK_ID);
    assert_eq!(ssm.count_of_type("AWS::EC2::VPCEndpoint"), 3);
    assert_eq!(lean.count_of_type("AWS::EC2::VPCEndpoint"), 0);

    let services: Vec<&Value> = ssm
        .resources_of_type("AWS::EC2::VPCEndpoint")
        .map(|(_, r)| r.property("ServiceName").unwrap())
        .collect();
    assert_eq!(
        services,
        vec![
            &json!("com.amazonaws.ap-northeast-2.ssm"),
            &json!("com.amazonaws.ap-northeast-2.ssmmessages"),
            &json!("com.amazonaws.ap-northeast-2.ec2messages"),
        ]
    );

    assert_eq!(
        property(&ssm, "SSMEndpoint/Resource", "SubnetIds"),
        &json!([
            { "Ref": logical_id("MyVPC/PrivateSubnetSubnet1/Subnet") },
            { "Ref": logical_id("MyVPC/PrivateSubnetSubnet2/Subnet") },
        ])
    );
    assert_eq!(property(&ssm, "SSMEndpoint/Resource", "PrivateDnsEnabled"), &json!(true));
}

#[test]
fn test_region_flows_into_service_names() {
    let app = build_app("us-west-2").unwrap();
    let t = synthesize(app.stack(SSM_STACK_ID).unwrap()).unwrap();
    assert_eq!(
        property(&t, "EC2MessagesEndpoint/Resource", "ServiceName"),
        "com.amazonaws.us-west-2.ec2messages"
    );
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_dependency_graph_is_acyclic_and_vpc_first() {
    let app = app();
    for stack in app.stacks() {
        let graph = stack.dependency_graph().unwrap();
        assert!(!graph.has_cycles());

        let order = graph.deployment_order().unwrap();
        let position = |path: &str| order.iter().position(|p| p == path).unwrap();
        assert_eq!(position("MyVPC"), 0);
        assert!(position("ALBSecurityGroup") < position("ApplicationLoadBalancer"));
        assert!(position("TargetGroup") < position("ApplicationLoadBalancer/Listener"));
        assert!(position("ApplicationLoadBalancer") < position("ApplicationLoadBalancer/Listener"));
        assert_eq!(graph.dependents_of("MyVPC").len(), graph.node_count() - 1);
    }
}

#[test]
fn test_primary_resources_keep_their_deployed_ids() {
    let t = template(SSM_STACK_ID);
    for id in [
        "MyVPCAFB07A31",
        "MyVPCPublicSubnetSubnet1SubnetADEB7CE8",
    ] {
        assert!(t.resource(id).is_some(), "missing {}", id);
    }
    let vpc = t.resource(&resource_logical_id("MyVPC")).unwrap();
    assert_eq!(vpc.resource_type, "AWS::EC2::VPC");
    assert_eq!(vpc.metadata["aws:cdk:path"], "VpcAlbStack/MyVPC/Resource");
    assert_eq!(
        property(&t, "MyVPC/PublicSubnetSubnet1/Subnet", "VpcId"),
        &json!({ "Ref": "MyVPCAFB07A31" })
    );
}

#[test]
fn test_logical_ids_are_stable() {
    let first = template(SSM_STACK_ID);
    let second = template(SSM_STACK_ID);
    let ids = |t: &Template| t.resources.keys().cloned().collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}
