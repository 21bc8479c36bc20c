//! The stack definition builder
//!
//! [`StackDefinition::new`] turns a name, a target environment, and a
//! [`StackConfig`](crate::config::StackConfig) into a complete, internally
//! consistent resource graph. Construction is linear and strictly ordered:
//!
//! 1. network (VPC, subnets, internet gateway, public routing)
//! 2. edge/DNS (explicit load balancer, or hosted-zone lookup + certificate)
//! 3. cluster (plus namespace and container insights)
//! 4. service (task definition, load balancer wiring, listeners, DNS record)
//! 5. autoscaling (scalable target and both utilization rules)
//! 6. outputs
//!
//! Every phase receives the handles of earlier phases as explicit arguments
//! and returns its own. A failed declaration aborts the whole definition:
//! fail-fast, all-or-nothing, with no retry or partial-state management -
//! deployment-time failure handling belongs to the provider.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{Environment, LoadBalancerMode, StackConfig};
use crate::graph::{LogicalId, ResourceGraph};
use crate::spec::{
    AutoscalingSpec, CertificateSpec, ClusterSpec, HostedZoneLookup, NamespaceSpec, NetworkSpec,
    ServiceSpec, SubnetVisibility,
};
use crate::DEFAULT_NAMESPACE_NAME;

/// Handles produced by the network phase
#[derive(Clone, Debug)]
pub struct NetworkHandles {
    /// The VPC
    pub vpc: LogicalId,
    /// Every declared subnet with its group name
    pub subnets: Vec<(String, LogicalId)>,
    /// Subnets of the public group, in AZ order
    pub public_subnets: Vec<LogicalId>,
}

impl NetworkHandles {
    /// Subnets belonging to the named group, in AZ order
    pub fn group_subnets(&self, group: &str) -> Vec<&LogicalId> {
        self.subnets
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, id)| id)
            .collect()
    }
}

/// Handles produced by the edge/DNS phase
#[derive(Clone, Debug, Default)]
pub struct EdgeHandles {
    /// Explicitly declared load balancer (explicit mode only)
    pub load_balancer: Option<LogicalId>,
    /// Security group of the explicit load balancer
    pub load_balancer_security_group: Option<LogicalId>,
    /// Parameter standing in for the looked-up hosted zone id
    pub hosted_zone: Option<LogicalId>,
    /// Declared certificate (TLS only)
    pub certificate: Option<LogicalId>,
}

/// Handles produced by the cluster phase
#[derive(Clone, Debug)]
pub struct ClusterHandles {
    /// The ECS cluster
    pub cluster: LogicalId,
    /// Service-discovery namespace, when enabled, with its declared name
    pub namespace: Option<(LogicalId, String)>,
}

/// Handles produced by the service phase
#[derive(Clone, Debug)]
pub struct ServiceHandles {
    /// The ECS service
    pub service: LogicalId,
    /// The Fargate task definition
    pub task_definition: LogicalId,
    /// Security group owned by the service's tasks
    pub security_group: LogicalId,
    /// Target group the load balancer forwards to
    pub target_group: LogicalId,
}

/// A complete, validated stack of resource declarations
#[derive(Clone, Debug)]
pub struct StackDefinition {
    name: String,
    environment: Environment,
    config: StackConfig,
    network: NetworkSpec,
    graph: ResourceGraph,
    /// Security groups owned by the cluster itself
    ///
    /// The cluster never owns any - the service's group belongs to the
    /// service - but the outputs contract reads this list, so it is tracked
    /// rather than assumed.
    cluster_security_groups: Vec<Value>,
}

impl StackDefinition {
    /// Build the full stack definition for a configuration
    ///
    /// Validates the configuration, then declares every resource in strict
    /// dependency order. The first error aborts the definition.
    pub fn new(
        name: impl Into<String>,
        environment: Environment,
        config: StackConfig,
    ) -> crate::Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(crate::Error::validation("stack name must not be empty"));
        }
        config.validate()?;

        info!(stack = %name, env = %environment, "defining stack");

        let mut stack = Self {
            name,
            environment,
            config,
            network: NetworkSpec::default(),
            graph: ResourceGraph::new(),
            cluster_security_groups: Vec::new(),
        };

        let network = stack.declare_network()?;
        if stack.config.network_only {
            info!(resources = stack.graph.len(), "network-only stack defined");
            return Ok(stack);
        }

        let edge = stack.declare_edge(&network)?;
        let cluster = stack.declare_cluster(&network)?;
        let service = stack.declare_service(&network, &edge, &cluster)?;
        stack.declare_autoscaling(&cluster, &service)?;
        if stack.config.enable_outputs {
            stack.declare_outputs(&cluster)?;
        }

        info!(resources = stack.graph.len(), "stack defined");
        Ok(stack)
    }

    /// Stack name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target deployment environment
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The configuration this stack was built from
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// The network specification the stack declares
    pub fn network(&self) -> &NetworkSpec {
        &self.network
    }

    /// The declared resource graph
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    // =========================================================================
    // Phase 1: Network
    // =========================================================================

    fn declare_network(&mut self) -> crate::Result<NetworkHandles> {
        let spec = self.network.clone();
        spec.validate()?;
        debug!(cidr = %spec.cidr, azs = spec.max_azs, "declaring network");

        let vpc = self.graph.declare(
            "Vpc",
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": spec.cidr,
                "EnableDnsSupport": spec.enable_dns_support,
                "EnableDnsHostnames": spec.enable_dns_hostnames,
            }),
        )?;

        let mut subnets = Vec::new();
        let mut public_subnets = Vec::new();
        for block in spec.allocate(spec.max_azs)? {
            let id = format!("{}{}", logical(&block.group), block.az_index + 1);
            let subnet = self.graph.declare(
                &id,
                "AWS::EC2::Subnet",
                json!({
                    "VpcId": vpc.reference(),
                    "CidrBlock": block.cidr,
                    "AvailabilityZone": { "Fn::Select": [block.az_index, { "Fn::GetAZs": "" }] },
                    "MapPublicIpOnLaunch": block.visibility == SubnetVisibility::Public,
                }),
            )?;
            if block.visibility == SubnetVisibility::Public {
                public_subnets.push(subnet.clone());
            }
            subnets.push((block.group, subnet));
        }

        // Public routing: one internet gateway, one shared route table
        if !public_subnets.is_empty() {
            let igw = self
                .graph
                .declare("InternetGateway", "AWS::EC2::InternetGateway", json!({}))?;
            let attachment = self.graph.declare(
                "VpcGatewayAttachment",
                "AWS::EC2::VPCGatewayAttachment",
                json!({
                    "VpcId": vpc.reference(),
                    "InternetGatewayId": igw.reference(),
                }),
            )?;
            let route_table = self.graph.declare(
                "PublicRouteTable",
                "AWS::EC2::RouteTable",
                json!({ "VpcId": vpc.reference() }),
            )?;
            self.graph.declare_with_deps(
                "PublicDefaultRoute",
                "AWS::EC2::Route",
                json!({
                    "RouteTableId": route_table.reference(),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "GatewayId": igw.reference(),
                }),
                &[&attachment],
            )?;
            for subnet in &public_subnets {
                self.graph.declare(
                    &format!("{}RouteTableAssociation", subnet.name()),
                    "AWS::EC2::SubnetRouteTableAssociation",
                    json!({
                        "RouteTableId": route_table.reference(),
                        "SubnetId": subnet.reference(),
                    }),
                )?;
            }
        }

        Ok(NetworkHandles {
            vpc,
            subnets,
            public_subnets,
        })
    }

    // =========================================================================
    // Phase 2: Edge / DNS
    // =========================================================================

    fn declare_edge(&mut self, network: &NetworkHandles) -> crate::Result<EdgeHandles> {
        let mut edge = EdgeHandles::default();

        if self.config.load_balancer_mode == LoadBalancerMode::Explicit {
            debug!("declaring explicit load balancer");
            let sg = self.graph.declare(
                "LoadBalancerSecurityGroup",
                "AWS::EC2::SecurityGroup",
                json!({
                    "GroupDescription": "Load balancer ingress",
                    "VpcId": network.vpc.reference(),
                    "SecurityGroupIngress": [public_ingress(80)],
                }),
            )?;
            let lb = self.graph.declare(
                "LoadBalancer",
                "AWS::ElasticLoadBalancingV2::LoadBalancer",
                json!({
                    "Type": "application",
                    "Scheme": "internet-facing",
                    "Subnets": refs(&network.public_subnets),
                    "SecurityGroups": [sg.get_att("GroupId")],
                }),
            )?;
            edge.load_balancer_security_group = Some(sg);
            edge.load_balancer = Some(lb);
        }

        if self.config.enable_tls {
            // The zone is owned outside the stack: it is looked up, never
            // created, and enters the template as a parameter.
            let domain = self
                .config
                .domain_name
                .clone()
                .ok_or_else(|| crate::Error::validation("TLS stack has no domain name"))?;
            let zone = HostedZoneLookup::new(&domain);
            zone.validate()?;
            debug!(domain = %domain, "declaring hosted zone lookup and certificate");

            let zone_param = self.graph.parameter(
                "HostedZoneId",
                "String",
                Some("Id of the externally managed hosted zone the stack is wired into"),
            )?;

            let cert_spec = CertificateSpec::for_zone(&zone);
            cert_spec.validate()?;
            let certificate = self.graph.declare(
                "Certificate",
                "AWS::CertificateManager::Certificate",
                json!({
                    "DomainName": cert_spec.domain_name,
                    "SubjectAlternativeNames": cert_spec.subject_alternative_names,
                    "ValidationMethod": cert_spec.validation_method.to_string(),
                    "DomainValidationOptions": [{
                        "DomainName": cert_spec.domain_name,
                        "HostedZoneId": zone_param.reference(),
                    }],
                }),
            )?;
            edge.hosted_zone = Some(zone_param);
            edge.certificate = Some(certificate);
        }

        Ok(edge)
    }

    // =========================================================================
    // Phase 3: Cluster
    // =========================================================================

    fn declare_cluster(&mut self, network: &NetworkHandles) -> crate::Result<ClusterHandles> {
        let spec = if self.config.enable_service_discovery {
            ClusterSpec {
                name: Some(format!("{}-cluster", self.name)),
                container_insights: true,
                default_namespace: Some(NamespaceSpec::new(DEFAULT_NAMESPACE_NAME)),
            }
        } else {
            ClusterSpec::default()
        };
        spec.validate()?;
        debug!(name = ?spec.name, insights = spec.container_insights, "declaring cluster");

        let mut properties = json!({
            "ClusterSettings": [{
                "Name": "containerInsights",
                "Value": if spec.container_insights { "enabled" } else { "disabled" },
            }],
        });
        if let Some(name) = &spec.name {
            properties["ClusterName"] = json!(name);
        }
        let cluster = self.graph.declare("Cluster", "AWS::ECS::Cluster", properties)?;

        let namespace = match &spec.default_namespace {
            Some(ns) => {
                let id = self.graph.declare(
                    "Namespace",
                    "AWS::ServiceDiscovery::PrivateDnsNamespace",
                    json!({
                        "Name": ns.name,
                        "Vpc": network.vpc.reference(),
                    }),
                )?;
                Some((id, ns.name.clone()))
            }
            None => None,
        };

        Ok(ClusterHandles { cluster, namespace })
    }

    // =========================================================================
    // Phase 4: Service
    // =========================================================================

    fn declare_service(
        &mut self,
        network: &NetworkHandles,
        edge: &EdgeHandles,
        cluster: &ClusterHandles,
    ) -> crate::Result<ServiceHandles> {
        let implicit = self.config.load_balancer_mode == LoadBalancerMode::Implicit;
        let spec = ServiceSpec {
            image: self.config.image.clone(),
            // Tasks pull their image at launch. Without a NAT path they need
            // public IPs, so the two settings are derived together, never set
            // independently.
            assign_public_ip: implicit && !self.network.group_has_nat(crate::PUBLIC_SUBNET_GROUP),
            redirect_http: self.config.enable_tls,
            domain_name: self.config.domain_name.clone(),
            ..ServiceSpec::default()
        };
        spec.validate()?;
        if implicit {
            spec.validate_reachability(&self.network)?;
        }
        debug!(image = %spec.image, desired = spec.desired_count, "declaring service");

        let task_subnets: Vec<LogicalId> = network
            .group_subnets(&spec.task_subnet_group)
            .into_iter()
            .cloned()
            .collect();
        if task_subnets.is_empty() {
            return Err(crate::Error::validation(format!(
                "task subnet group {} has no subnets",
                spec.task_subnet_group
            )));
        }

        // Load balancer wiring: reuse the explicit one or provision our own.
        // Every listener port must have a matching ingress rule, so the TLS
        // shape opens 80 (redirect listener) alongside 443.
        let (load_balancer, lb_security_group) =
            match (&edge.load_balancer, &edge.load_balancer_security_group) {
                (Some(lb), Some(sg)) => (lb.clone(), sg.clone()),
                _ => {
                    let mut ingress = vec![public_ingress(80)];
                    if spec.redirect_http {
                        ingress.push(public_ingress(443));
                    }
                    let lb_sg = self.graph.declare(
                        "LoadBalancerSecurityGroup",
                        "AWS::EC2::SecurityGroup",
                        json!({
                            "GroupDescription": "Load balancer ingress",
                            "VpcId": network.vpc.reference(),
                            "SecurityGroupIngress": ingress,
                        }),
                    )?;
                    let lb = self.graph.declare(
                        "LoadBalancer",
                        "AWS::ElasticLoadBalancingV2::LoadBalancer",
                        json!({
                            "Type": "application",
                            "Scheme": "internet-facing",
                            "Subnets": refs(&network.public_subnets),
                            "SecurityGroups": [lb_sg.get_att("GroupId")],
                        }),
                    )?;
                    (lb, lb_sg)
                }
            };

        let target_group = self.graph.declare(
            "TargetGroup",
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "VpcId": network.vpc.reference(),
                "Port": spec.container_port,
                "Protocol": "HTTP",
                "TargetType": "ip",
            }),
        )?;

        let listener = if let Some(certificate) = &edge.certificate {
            let https = self.graph.declare(
                "HttpsListener",
                "AWS::ElasticLoadBalancingV2::Listener",
                json!({
                    "LoadBalancerArn": load_balancer.reference(),
                    "Port": 443,
                    "Protocol": "HTTPS",
                    "Certificates": [{ "CertificateArn": certificate.reference() }],
                    "DefaultActions": [{
                        "Type": "forward",
                        "TargetGroupArn": target_group.reference(),
                    }],
                }),
            )?;
            if spec.redirect_http {
                self.graph.declare(
                    "HttpRedirectListener",
                    "AWS::ElasticLoadBalancingV2::Listener",
                    json!({
                        "LoadBalancerArn": load_balancer.reference(),
                        "Port": 80,
                        "Protocol": "HTTP",
                        "DefaultActions": [{
                            "Type": "redirect",
                            "RedirectConfig": {
                                "Protocol": "HTTPS",
                                "Port": "443",
                                "StatusCode": "HTTP_301",
                            },
                        }],
                    }),
                )?;
            }
            https
        } else {
            self.graph.declare(
                "HttpListener",
                "AWS::ElasticLoadBalancingV2::Listener",
                json!({
                    "LoadBalancerArn": load_balancer.reference(),
                    "Port": 80,
                    "Protocol": "HTTP",
                    "DefaultActions": [{
                        "Type": "forward",
                        "TargetGroupArn": target_group.reference(),
                    }],
                }),
            )?
        };

        // Alias record pointing the domain at the load balancer
        if let (Some(zone_param), Some(domain)) = (&edge.hosted_zone, &spec.domain_name) {
            self.graph.declare(
                "DnsRecord",
                "AWS::Route53::RecordSet",
                json!({
                    "Name": domain,
                    "Type": "A",
                    "HostedZoneId": zone_param.reference(),
                    "AliasTarget": {
                        "DNSName": load_balancer.get_att("DNSName"),
                        "HostedZoneId": load_balancer.get_att("CanonicalHostedZoneID"),
                    },
                }),
            )?;
        }

        let task_definition = self.graph.declare(
            "TaskDefinition",
            "AWS::ECS::TaskDefinition",
            json!({
                "Family": format!("{}-task", self.name),
                "Cpu": spec.cpu.to_string(),
                "Memory": spec.memory_mib.to_string(),
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "ContainerDefinitions": [{
                    "Name": "web",
                    "Image": spec.image,
                    "Essential": true,
                    "PortMappings": [{
                        "ContainerPort": spec.container_port,
                        "Protocol": "tcp",
                    }],
                }],
            }),
        )?;

        // Health checks and forwarded traffic both come from the load
        // balancer, so its group is the only permitted source.
        let security_group = self.graph.declare(
            "ServiceSecurityGroup",
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Service tasks",
                "VpcId": network.vpc.reference(),
                "SecurityGroupIngress": [{
                    "IpProtocol": "tcp",
                    "FromPort": spec.container_port,
                    "ToPort": spec.container_port,
                    "SourceSecurityGroupId": lb_security_group.get_att("GroupId"),
                }],
            }),
        )?;

        // The service may only start once the listener is wired, so the
        // dependency is explicit rather than inferred.
        let service = self.graph.declare_with_deps(
            "Service",
            "AWS::ECS::Service",
            json!({
                "Cluster": cluster.cluster.reference(),
                "LaunchType": "FARGATE",
                "DesiredCount": spec.desired_count,
                "TaskDefinition": task_definition.reference(),
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": if spec.assign_public_ip { "ENABLED" } else { "DISABLED" },
                        "Subnets": refs(&task_subnets),
                        "SecurityGroups": [security_group.get_att("GroupId")],
                    },
                },
                "LoadBalancers": [{
                    "ContainerName": "web",
                    "ContainerPort": spec.container_port,
                    "TargetGroupArn": target_group.reference(),
                }],
            }),
            &[&listener],
        )?;

        Ok(ServiceHandles {
            service,
            task_definition,
            security_group,
            target_group,
        })
    }

    // =========================================================================
    // Phase 5: Autoscaling
    // =========================================================================

    fn declare_autoscaling(
        &mut self,
        cluster: &ClusterHandles,
        service: &ServiceHandles,
    ) -> crate::Result<()> {
        let spec = AutoscalingSpec::default();
        spec.validate()?;
        debug!(min = spec.min_capacity, max = spec.max_capacity, "declaring autoscaling");

        let target = self.graph.declare(
            "ScalableTarget",
            "AWS::ApplicationAutoScaling::ScalableTarget",
            json!({
                "MinCapacity": spec.min_capacity,
                "MaxCapacity": spec.max_capacity,
                "ResourceId": { "Fn::Join": ["", [
                    "service/",
                    cluster.cluster.reference(),
                    "/",
                    service.service.get_att("Name"),
                ]] },
                "ScalableDimension": "ecs:service:DesiredCount",
                "ServiceNamespace": "ecs",
            }),
        )?;

        // Two independent rules; either can act, no precedence is declared
        for (id, metric, value) in [
            ("CpuScaling", "ECSServiceAverageCPUUtilization", spec.cpu_target_percent),
            (
                "MemoryScaling",
                "ECSServiceAverageMemoryUtilization",
                spec.memory_target_percent,
            ),
        ] {
            self.graph.declare(
                id,
                "AWS::ApplicationAutoScaling::ScalingPolicy",
                json!({
                    "PolicyName": id,
                    "PolicyType": "TargetTrackingScaling",
                    "ScalingTargetId": target.reference(),
                    "TargetTrackingScalingPolicyConfiguration": {
                        "PredefinedMetricSpecification": { "PredefinedMetricType": metric },
                        "TargetValue": value,
                    },
                }),
            )?;
        }
        Ok(())
    }

    // =========================================================================
    // Phase 6: Outputs
    // =========================================================================

    /// Declare the fixed cross-stack output set
    ///
    /// The security-group output keeps a known quirk for compatibility: it
    /// takes the first element of the cluster's security-group list when the
    /// list is non-empty, and otherwise falls back to the list's string form
    /// (`"[]"`). Consumers must not assume a single, always-valid group id.
    fn declare_outputs(&mut self, cluster: &ClusterHandles) -> crate::Result<()> {
        debug!("declaring outputs");
        let (namespace, namespace_name) = cluster.namespace.as_ref().ok_or_else(|| {
            crate::Error::synthesis("outputs require the service-discovery namespace")
        })?;

        let export = |suffix: &str| format!("{}-{}", self.name, suffix);

        self.graph.output(
            "NSARN",
            Some("ARN of the service-discovery namespace"),
            namespace.get_att("Arn"),
            Some(&export("NSARN")),
        )?;
        self.graph.output(
            "NSNAME",
            Some("Name of the service-discovery namespace"),
            json!(namespace_name),
            Some(&export("NSNAME")),
        )?;
        self.graph.output(
            "NSID",
            Some("Id of the service-discovery namespace"),
            namespace.get_att("Id"),
            Some(&export("NSID")),
        )?;
        self.graph.output(
            "ECSClusterName",
            Some("Name of the ECS cluster"),
            cluster.cluster.reference(),
            Some(&export("ECSClusterName")),
        )?;
        self.graph.output(
            "ECSSecGrpList",
            Some("First cluster security group id, or the stringified list"),
            security_group_output(&self.cluster_security_groups),
            Some(&export("ECSSecGrpList")),
        )?;
        Ok(())
    }
}

/// Select the security-group output value from a cluster's group list
///
/// First element when the list is non-empty, otherwise the list's string form
/// (`"[]"` for an empty list). The asymmetry is preserved as-is for
/// compatibility with existing consumers; it is a latent bug, not a contract
/// worth imitating elsewhere.
pub fn security_group_output(groups: &[Value]) -> Value {
    match groups.first() {
        Some(first) => first.clone(),
        None => Value::String(stringify_group_list(groups)),
    }
}

fn stringify_group_list(groups: &[Value]) -> String {
    let items: Vec<String> = groups
        .iter()
        .map(|g| match g {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// World-reachable TCP ingress rule for one port
fn public_ingress(port: u16) -> Value {
    json!({
        "IpProtocol": "tcp",
        "FromPort": port,
        "ToPort": port,
        "CidrIp": "0.0.0.0/0",
    })
}

/// Turn handles into reference tokens
fn refs(ids: &[LogicalId]) -> Vec<Value> {
    ids.iter().map(LogicalId::reference).collect()
}

/// Strip a group name down to a template-safe logical id prefix
fn logical(group: &str) -> String {
    group.chars().filter(char::is_ascii_alphanumeric).collect()
}
