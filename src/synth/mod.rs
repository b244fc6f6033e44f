//! Synthesis of stacks into CloudFormation templates.
//!
//! Each declaration expands into one or more template resources. The VPC is
//! the largest expansion:
//!
//! ```text
//! VPC ─┬─ per subnet: Subnet, RouteTable, SubnetRouteTableAssociation, [DefaultRoute]
//!      │     public:  DefaultRoute -> InternetGateway   (+ EIP, NatGateway on the first N)
//!      │     private: DefaultRoute -> NatGateway (az index modulo NAT count)
//!      └─ InternetGateway + VPCGatewayAttachment (when public subnets exist)
//! ```
//!
//! Logical ids come from construct paths, so a resource can be referenced
//! before it is emitted.

pub mod assembly;
pub mod template;

use serde_json::{json, Value};
use tracing::{debug, info};

pub use assembly::{Artifact, CloudAssembly};
pub use template::{CfnResource, Template, TemplateFormat};

use template::{availability_zone, cfn_ref, get_att, tag};

use crate::error::{Error, Result};
use crate::resources::{
    ApplicationLoadBalancer, InterfaceEndpoint, Listener, Protocol, Resource, ResourceKind,
    SecurityGroup, SecurityGroupRef, Subnet, SubnetType, TargetGroup, Vpc,
};
use crate::stack::logical_id::{logical_id, resource_logical_id, PRIMARY_ID};
use crate::stack::Stack;

/// Validate `stack` and render it as a template.
pub fn synthesize(stack: &Stack) -> Result<Template> {
    stack.validate()?;

    let mut synth = Synthesizer {
        stack,
        template: Template::new(stack.id(), stack.description().map(String::from)),
    };

    for (path, kind) in stack.constructs() {
        match kind {
            ResourceKind::Vpc => synth.vpc(find(stack.vpcs(), path)?)?,
            ResourceKind::SecurityGroup => {
                synth.security_group(find(stack.security_groups(), path)?)?
            }
            ResourceKind::LoadBalancer => synth.load_balancer(find(stack.load_balancers(), path)?)?,
            ResourceKind::TargetGroup => synth.target_group(find(stack.target_groups(), path)?)?,
            ResourceKind::Listener => synth.listener(find(stack.listeners(), path)?)?,
            ResourceKind::InterfaceEndpoint => {
                synth.interface_endpoint(find(stack.interface_endpoints(), path)?)?
            }
        }
    }
    synth.explicit_dependencies();

    info!(
        stack = stack.id(),
        resources = synth.template.resources.len(),
        "synthesized"
    );
    Ok(synth.template)
}

/// Declaration registered under `path` in its kind's table.
fn find<'a, T: Resource>(table: &'a [T], path: &str) -> Result<&'a T> {
    table
        .iter()
        .find(|r| r.path() == path)
        .ok_or_else(|| Error::validation(path, "construct registered without a declaration"))
}

fn subnet_path(vpc: &Vpc, subnet: &Subnet) -> String {
    format!("{}/{}", vpc.path(), subnet.id)
}

fn subnet_logical_id(vpc: &Vpc, subnet: &Subnet) -> String {
    logical_id(&format!("{}/Subnet", subnet_path(vpc, subnet)))
}

struct Synthesizer<'a> {
    stack: &'a Stack,
    template: Template,
}

impl<'a> Synthesizer<'a> {
    fn add(&mut self, path: &str, resource_type: &str, properties: Value) -> String {
        self.add_with_deps(path, resource_type, properties, Vec::new())
    }

    /// Emit the primary resource of the construct at `path`.
    fn add_primary(
        &mut self,
        path: &str,
        resource_type: &str,
        properties: Value,
        depends_on: Vec<String>,
    ) -> String {
        let resource_path = format!("{}/{}", path, PRIMARY_ID);
        self.add_with_deps(&resource_path, resource_type, properties, depends_on)
    }

    fn add_with_deps(
        &mut self,
        path: &str,
        resource_type: &str,
        properties: Value,
        depends_on: Vec<String>,
    ) -> String {
        let id = logical_id(path);
        debug!(logical_id = %id, resource_type, "emit");
        self.template.resources.insert(
            id.clone(),
            CfnResource {
                resource_type: resource_type.to_string(),
                properties,
                depends_on,
                metadata: json!({ "aws:cdk:path": format!("{}/{}", self.stack.id(), path) }),
            },
        );
        id
    }

    fn name_tag(&self, path: &str) -> Value {
        tag("Name", &format!("{}/{}", self.stack.id(), path))
    }

    fn vpc(&mut self, vpc: &Vpc) -> Result<()> {
        let vpc_id = self.add_primary(
            vpc.path(),
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": vpc.cidr.to_string(),
                "EnableDnsHostnames": vpc.enable_dns_hostnames,
                "EnableDnsSupport": vpc.enable_dns_support,
                "InstanceTenancy": "default",
                "Tags": [self.name_tag(vpc.path())],
            }),
            Vec::new(),
        );

        let igw_path = format!("{}/IGW", vpc.path());
        let attachment_path = format!("{}/VPCGW", vpc.path());
        let igw_id = logical_id(&igw_path);
        let attachment_id = logical_id(&attachment_path);

        let nat_subnets = vpc.nat_subnets();

        for subnet in &vpc.subnets {
            let base = subnet_path(vpc, subnet);
            let subnet_id = self.add(
                &format!("{}/Subnet", base),
                "AWS::EC2::Subnet",
                json!({
                    "AvailabilityZone": availability_zone(subnet.az_index),
                    "CidrBlock": subnet.cidr.to_string(),
                    "MapPublicIpOnLaunch": subnet.subnet_type.is_public(),
                    "Tags": [
                        tag("aws-cdk:subnet-name", &subnet.group),
                        tag("aws-cdk:subnet-type", subnet.subnet_type.tag_value()),
                        self.name_tag(&base),
                    ],
                    "VpcId": cfn_ref(&vpc_id),
                }),
            );
            let route_table_id = self.add(
                &format!("{}/RouteTable", base),
                "AWS::EC2::RouteTable",
                json!({
                    "Tags": [self.name_tag(&base)],
                    "VpcId": cfn_ref(&vpc_id),
                }),
            );
            let association_id = self.add(
                &format!("{}/RouteTableAssociation", base),
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": cfn_ref(&route_table_id),
                    "SubnetId": cfn_ref(&subnet_id),
                }),
            );

            match subnet.subnet_type {
                SubnetType::Public => {
                    let route_id = self.add_with_deps(
                        &format!("{}/DefaultRoute", base),
                        "AWS::EC2::Route",
                        json!({
                            "DestinationCidrBlock": "0.0.0.0/0",
                            "GatewayId": cfn_ref(&igw_id),
                            "RouteTableId": cfn_ref(&route_table_id),
                        }),
                        vec![attachment_id.clone()],
                    );

                    if nat_subnets.iter().any(|s| s.id == subnet.id) {
                        let eip_id = self.add(
                            &format!("{}/EIP", base),
                            "AWS::EC2::EIP",
                            json!({
                                "Domain": "vpc",
                                "Tags": [self.name_tag(&base)],
                            }),
                        );
                        self.add_with_deps(
                            &format!("{}/NATGateway", base),
                            "AWS::EC2::NatGateway",
                            json!({
                                "AllocationId": get_att(&eip_id, "AllocationId"),
                                "SubnetId": cfn_ref(&subnet_id),
                                "Tags": [self.name_tag(&base)],
                            }),
                            vec![route_id, association_id],
                        );
                    }
                }
                SubnetType::PrivateWithNat => {
                    if nat_subnets.is_empty() {
                        return Err(Error::validation(
                            &base,
                            "private subnet has no NAT gateway to route through",
                        ));
                    }
                    let gateway = nat_subnets[usize::from(subnet.az_index) % nat_subnets.len()];
                    let nat = logical_id(&format!("{}/NATGateway", subnet_path(vpc, gateway)));
                    self.add(
                        &format!("{}/DefaultRoute", base),
                        "AWS::EC2::Route",
                        json!({
                            "DestinationCidrBlock": "0.0.0.0/0",
                            "NatGatewayId": cfn_ref(&nat),
                            "RouteTableId": cfn_ref(&route_table_id),
                        }),
                    );
                }
                SubnetType::PrivateIsolated => {}
            }
        }

        if !vpc.public_subnets().is_empty() {
            self.add(
                &igw_path,
                "AWS::EC2::InternetGateway",
                json!({ "Tags": [self.name_tag(vpc.path())] }),
            );
            self.add(
                &attachment_path,
                "AWS::EC2::VPCGatewayAttachment",
                json!({
                    "InternetGatewayId": cfn_ref(&igw_id),
                    "VpcId": cfn_ref(&vpc_id),
                }),
            );
        }
        Ok(())
    }

    fn security_group(&mut self, sg: &SecurityGroup) -> Result<()> {
        let ingress: Vec<Value> = sg
            .ingress
            .iter()
            .map(|rule| {
                let mut entry = json!({
                    "CidrIp": rule.peer.cidr().to_string(),
                    "Description": rule.description,
                    "IpProtocol": rule.port.protocol.as_cfn(),
                });
                if rule.port.protocol != Protocol::All {
                    entry["FromPort"] = json!(rule.port.from_port);
                    entry["ToPort"] = json!(rule.port.to_port);
                }
                entry
            })
            .collect();

        let egress = if sg.allow_all_outbound {
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }])
        } else {
            // Placeholder rule: an empty egress list would default to allow-all.
            json!([{
                "CidrIp": "255.255.255.255/32",
                "Description": "Disallow all traffic",
                "FromPort": 252,
                "IpProtocol": "icmp",
                "ToPort": 86,
            }])
        };

        let vpc_path = self.stack.path_of(sg.vpc)?;
        let mut properties = json!({
            "GroupDescription": sg.description,
            "SecurityGroupEgress": egress,
            "VpcId": cfn_ref(&resource_logical_id(vpc_path)),
        });
        if !ingress.is_empty() {
            properties["SecurityGroupIngress"] = Value::Array(ingress);
        }
        self.add_primary(sg.path(), "AWS::EC2::SecurityGroup", properties, Vec::new());
        Ok(())
    }

    fn group_ids(&self, groups: &[SecurityGroupRef]) -> Result<Vec<Value>> {
        groups
            .iter()
            .map(|sg| -> Result<Value> {
                Ok(get_att(&resource_logical_id(self.stack.path_of(*sg)?), "GroupId"))
            })
            .collect()
    }

    fn load_balancer(&mut self, lb: &ApplicationLoadBalancer) -> Result<()> {
        let vpc = self.stack.get(lb.vpc)?;
        let placement = if lb.internet_facing {
            vpc.public_subnets()
        } else {
            let private = vpc.private_subnets();
            if private.is_empty() {
                vpc.subnets_of(SubnetType::PrivateIsolated)
            } else {
                private
            }
        };

        let subnets: Vec<Value> = placement
            .iter()
            .map(|s| cfn_ref(&subnet_logical_id(vpc, s)))
            .collect();

        // Internet-facing balancers must wait for the public routes.
        let depends_on = if lb.internet_facing {
            placement
                .iter()
                .flat_map(|s| {
                    let base = subnet_path(vpc, s);
                    [
                        logical_id(&format!("{}/DefaultRoute", base)),
                        logical_id(&format!("{}/RouteTableAssociation", base)),
                    ]
                })
                .collect()
        } else {
            Vec::new()
        };

        let security_groups = self.group_ids(&lb.security_groups)?;
        self.add_primary(
            lb.path(),
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "LoadBalancerAttributes": [
                    { "Key": "deletion_protection.enabled", "Value": "false" }
                ],
                "Scheme": lb.scheme(),
                "SecurityGroups": security_groups,
                "Subnets": subnets,
                "Type": "application",
            }),
            depends_on,
        );
        Ok(())
    }

    fn target_group(&mut self, tg: &TargetGroup) -> Result<()> {
        let vpc_path = self.stack.path_of(tg.vpc)?;
        let hc = &tg.health_check;
        self.add_primary(
            tg.path(),
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "HealthCheckIntervalSeconds": hc.interval.as_secs(),
                "HealthCheckPath": hc.path,
                "HealthCheckTimeoutSeconds": hc.timeout.as_secs(),
                "HealthyThresholdCount": hc.healthy_threshold_count,
                "Port": tg.port,
                "Protocol": tg.protocol.as_cfn(),
                "TargetType": tg.target_type.as_cfn(),
                "UnhealthyThresholdCount": hc.unhealthy_threshold_count,
                "VpcId": cfn_ref(&resource_logical_id(vpc_path)),
            }),
            Vec::new(),
        );
        Ok(())
    }

    fn listener(&mut self, listener: &Listener) -> Result<()> {
        let lb_path = self.stack.path_of(listener.load_balancer)?;
        let target_groups = listener
            .default_action
            .target_groups()
            .iter()
            .map(|tg| -> Result<Value> {
                Ok(cfn_ref(&resource_logical_id(self.stack.path_of(*tg)?)))
            })
            .collect::<Result<Vec<Value>>>()?;

        let action = match target_groups.as_slice() {
            [single] => json!({ "TargetGroupArn": single, "Type": "forward" }),
            many => json!({
                "ForwardConfig": {
                    "TargetGroups": many
                        .iter()
                        .map(|arn| json!({ "TargetGroupArn": arn, "Weight": 1 }))
                        .collect::<Vec<_>>(),
                },
                "Type": "forward",
            }),
        };

        self.add_primary(
            listener.path(),
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "DefaultActions": [action],
                "LoadBalancerArn": cfn_ref(&resource_logical_id(lb_path)),
                "Port": listener.port,
                "Protocol": listener.protocol.as_cfn(),
            }),
            Vec::new(),
        );
        Ok(())
    }

    fn interface_endpoint(&mut self, endpoint: &InterfaceEndpoint) -> Result<()> {
        let vpc = self.stack.get(endpoint.vpc)?;
        let subnets: Vec<Value> = vpc
            .subnets_of(endpoint.subnet_type)
            .iter()
            .map(|s| cfn_ref(&subnet_logical_id(vpc, s)))
            .collect();
        let security_groups = self.group_ids(&endpoint.security_groups)?;

        self.add_primary(
            endpoint.path(),
            "AWS::EC2::VPCEndpoint",
            json!({
                "PrivateDnsEnabled": endpoint.private_dns_enabled,
                "SecurityGroupIds": security_groups,
                "ServiceName": endpoint.service.service_name(self.stack.region()),
                "SubnetIds": subnets,
                "VpcEndpointType": "Interface",
                "VpcId": cfn_ref(&resource_logical_id(vpc.path())),
            }),
            Vec::new(),
        );
        Ok(())
    }

    fn explicit_dependencies(&mut self) {
        let stack = self.stack;
        for (path, _) in stack.constructs() {
            let extra: Vec<String> = stack
                .explicit_dependencies_of(path)
                .into_iter()
                .map(resource_logical_id)
                .collect();
            if extra.is_empty() {
                continue;
            }
            if let Some(resource) = self.template.resource_mut(&resource_logical_id(path)) {
                resource.depends_on.extend(extra);
                resource.depends_on.sort();
                resource.depends_on.dedup();
            }
        }
    }
}
