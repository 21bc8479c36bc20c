//! End-to-end template shape tests
//!
//! Each test builds a stack from a preset, synthesizes it, and checks the
//! rendered template against the contract the stack's consumers rely on.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use strata::config::{Environment, StackConfig};
use strata::stack::StackDefinition;
use strata::synth::{synthesize, OutputFormat};

fn render(config: StackConfig) -> Value {
    let stack = StackDefinition::new(
        "ecs-demo",
        Environment::new("310181001400", "us-west-2"),
        config,
    )
    .unwrap();
    let template = synthesize(&stack).unwrap();
    serde_json::from_str(&template.render(OutputFormat::Json).unwrap()).unwrap()
}

/// Story: The network policy is identical in every revision
///
/// One /24 VPC with DNS support and hostnames, four /26 subnets across two
/// AZs, an internet gateway, and a default route for the public group.
#[test]
fn story_every_revision_shares_the_network() {
    for config in [
        StackConfig::baseline(),
        StackConfig::with_tls(),
        StackConfig::service_discovery(),
        StackConfig::network_only(),
    ] {
        let template = render(config);
        let resources = &template["Resources"];

        assert_eq!(
            resources["Vpc"]["Properties"],
            json!({
                "CidrBlock": "10.0.0.0/24",
                "EnableDnsSupport": true,
                "EnableDnsHostnames": true,
            })
        );

        assert_eq!(resources["PublicSubnet1"]["Properties"]["CidrBlock"], "10.0.0.0/26");
        assert_eq!(resources["PublicSubnet2"]["Properties"]["CidrBlock"], "10.0.0.64/26");
        assert_eq!(resources["PrivateSubnet1"]["Properties"]["CidrBlock"], "10.0.0.128/26");
        assert_eq!(resources["PrivateSubnet2"]["Properties"]["CidrBlock"], "10.0.0.192/26");

        assert_eq!(
            resources["PublicSubnet1"]["Properties"]["AvailabilityZone"],
            json!({ "Fn::Select": [0, { "Fn::GetAZs": "" }] })
        );

        assert_eq!(
            resources["PublicDefaultRoute"]["Properties"]["DestinationCidrBlock"],
            "0.0.0.0/0"
        );
    }
}

/// Story: The baseline template is revision one
///
/// Explicit internet-facing load balancer, plain HTTP listener, sample image,
/// no parameters, no outputs.
#[test]
fn story_baseline_template_matches_revision_one() {
    let template = render(StackConfig::baseline());
    let resources = &template["Resources"];

    assert_eq!(
        resources["LoadBalancer"]["Properties"]["Scheme"],
        "internet-facing"
    );
    assert_eq!(resources["HttpListener"]["Properties"]["Port"], 80);
    assert_eq!(
        resources["TaskDefinition"]["Properties"]["ContainerDefinitions"][0]["Image"],
        "amazon/amazon-ecs-sample"
    );

    assert!(template.get("Parameters").is_none());
    assert!(template.get("Outputs").is_none());
    assert!(resources.get("Certificate").is_none());
    assert!(resources.get("Namespace").is_none());
}

/// Story: The TLS template is revision two
///
/// Hosted zone as a parameter, DNS-validated wildcard certificate, HTTPS
/// listener with an HTTP 301 redirect, public nginx image, tasks with public
/// IPs, and an alias record for the domain.
#[test]
fn story_tls_template_matches_revision_two() {
    let template = render(StackConfig::with_tls());
    let resources = &template["Resources"];

    assert_eq!(template["Parameters"]["HostedZoneId"]["Type"], "String");

    let cert = &resources["Certificate"]["Properties"];
    assert_eq!(cert["DomainName"], "cdkdemo.techmonkey.pro");
    assert_eq!(cert["SubjectAlternativeNames"], json!(["*.cdkdemo.techmonkey.pro"]));
    assert_eq!(cert["ValidationMethod"], "DNS");

    assert_eq!(resources["HttpsListener"]["Properties"]["Port"], 443);
    assert_eq!(
        resources["HttpRedirectListener"]["Properties"]["DefaultActions"][0]["RedirectConfig"],
        json!({ "Protocol": "HTTPS", "Port": "443", "StatusCode": "HTTP_301" })
    );

    assert_eq!(
        resources["TaskDefinition"]["Properties"]["ContainerDefinitions"][0]["Image"],
        "public.ecr.aws/nginx/nginx:latest"
    );
    assert_eq!(
        resources["Service"]["Properties"]["NetworkConfiguration"]["AwsvpcConfiguration"]
            ["AssignPublicIp"],
        "ENABLED"
    );

    let record = &resources["DnsRecord"]["Properties"];
    assert_eq!(record["Name"], "cdkdemo.techmonkey.pro");
    assert_eq!(record["Type"], "A");
    assert_eq!(
        record["AliasTarget"]["DNSName"],
        json!({ "Fn::GetAtt": ["LoadBalancer", "DNSName"] })
    );
}

/// Story: The service-discovery template is revision three
///
/// Named cluster with container insights, a `service.local` namespace, and
/// the full fixed output set with stack-prefixed export names.
#[test]
fn story_service_discovery_template_matches_revision_three() {
    let template = render(StackConfig::service_discovery());
    let resources = &template["Resources"];

    let cluster = &resources["Cluster"]["Properties"];
    assert_eq!(cluster["ClusterName"], "ecs-demo-cluster");
    assert_eq!(
        cluster["ClusterSettings"],
        json!([{ "Name": "containerInsights", "Value": "enabled" }])
    );

    assert_eq!(
        resources["Namespace"]["Properties"],
        json!({ "Name": "service.local", "Vpc": { "Ref": "Vpc" } })
    );

    let outputs = &template["Outputs"];
    assert_eq!(
        outputs["NSARN"]["Value"],
        json!({ "Fn::GetAtt": ["Namespace", "Arn"] })
    );
    assert_eq!(outputs["NSNAME"]["Value"], "service.local");
    assert_eq!(
        outputs["NSID"]["Value"],
        json!({ "Fn::GetAtt": ["Namespace", "Id"] })
    );
    assert_eq!(outputs["ECSClusterName"]["Value"], json!({ "Ref": "Cluster" }));
    assert_eq!(outputs["ECSClusterName"]["Export"]["Name"], "ecs-demo-ECSClusterName");

    // The cluster owns no security groups, so the quirky fallback ships the
    // stringified empty list rather than a group id.
    assert_eq!(outputs["ECSSecGrpList"]["Value"], "[]");
    assert_eq!(outputs["ECSSecGrpList"]["Export"]["Name"], "ecs-demo-ECSSecGrpList");
}

/// Story: The network-only template is revision four
#[test]
fn story_network_only_template_matches_revision_four() {
    let template = render(StackConfig::network_only());
    let resources = template["Resources"].as_object().unwrap();

    assert!(resources.contains_key("Vpc"));
    assert!(resources.contains_key("InternetGateway"));
    assert!(!resources.contains_key("Cluster"));
    assert!(!resources.contains_key("Service"));
    assert!(!resources.contains_key("LoadBalancer"));
    assert!(template.get("Outputs").is_none());
}

/// Story: Scaling is pinned at [1, 20] with two 50% target-tracking rules
#[test]
fn story_autoscaling_contract() {
    for config in [StackConfig::baseline(), StackConfig::service_discovery()] {
        let template = render(config);
        let resources = &template["Resources"];

        let target = &resources["ScalableTarget"]["Properties"];
        assert_eq!(target["MinCapacity"], 1);
        assert_eq!(target["MaxCapacity"], 20);
        assert_eq!(target["ScalableDimension"], "ecs:service:DesiredCount");
        assert_eq!(target["ServiceNamespace"], "ecs");
        assert_eq!(
            target["ResourceId"],
            json!({ "Fn::Join": ["", [
                "service/",
                { "Ref": "Cluster" },
                "/",
                { "Fn::GetAtt": ["Service", "Name"] },
            ]] })
        );

        for (id, metric) in [
            ("CpuScaling", "ECSServiceAverageCPUUtilization"),
            ("MemoryScaling", "ECSServiceAverageMemoryUtilization"),
        ] {
            let config = &resources[id]["Properties"]["TargetTrackingScalingPolicyConfiguration"];
            assert_eq!(config["TargetValue"], 50);
            assert_eq!(
                config["PredefinedMetricSpecification"]["PredefinedMetricType"],
                metric
            );
        }
    }
}

/// Story: Task sizing is fixed policy in every serving revision
#[test]
fn story_task_sizing_contract() {
    for config in [
        StackConfig::baseline(),
        StackConfig::with_tls(),
        StackConfig::service_discovery(),
    ] {
        let template = render(config);
        let task = &template["Resources"]["TaskDefinition"]["Properties"];
        assert_eq!(task["Cpu"], "512");
        assert_eq!(task["Memory"], "1024");
        assert_eq!(task["RequiresCompatibilities"], json!(["FARGATE"]));
        assert_eq!(template["Resources"]["Service"]["Properties"]["DesiredCount"], 1);
    }
}

/// Story: Every embedded reference in every template resolves
#[test]
fn story_all_references_resolve() {
    for config in [
        StackConfig::baseline(),
        StackConfig::with_tls(),
        StackConfig::service_discovery(),
        StackConfig::network_only(),
    ] {
        let stack = StackDefinition::new(
            "ecs-demo",
            Environment::new("310181001400", "us-west-2"),
            config,
        )
        .unwrap();
        assert!(stack.graph().validate().is_ok());
    }
}

/// Story: Synthesis is deterministic across formats
#[test]
fn story_repeated_synthesis_is_identical() {
    let first = render(StackConfig::service_discovery());
    let second = render(StackConfig::service_discovery());
    assert_eq!(first, second);
}

/// Story: A YAML config file drives the same pipeline as a preset
#[test]
fn story_yaml_config_round_trips_through_synthesis() {
    let yaml = r#"
enableTls: true
enableServiceDiscovery: true
enableOutputs: true
domainName: cdkdemo.techmonkey.pro
"#;
    let config: StackConfig = serde_yaml::from_str(yaml).unwrap();
    let from_file = render(config);
    let from_preset = render(StackConfig::service_discovery());
    assert_eq!(from_file, from_preset);
}
