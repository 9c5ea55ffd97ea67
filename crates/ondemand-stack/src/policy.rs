//! Access policies derived from the composed resources
//!
//! Runs after every other node exists. Each statement is scoped to the
//! concrete identifiers of the resources it guards.

use crate::constants::CLUSTER_NAME;
use crate::error::Result;
use ondemand_cloud::{
    PARAMETER_VALUE_FIELD, PolicyDocument, PolicyStatement, Resource, ResourceGraph, Token,
    format_arn, join, select_after,
};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Role imported from the domain stack
pub const LAUNCHER_ROLE_ID: &str = "LauncherLambdaRole";

/// Identifiers the binder attaches policies to or scopes them by
#[derive(Debug, Clone)]
pub struct BindingTargets<'a> {
    pub task_role: &'a Token,
    pub service: &'a Token,
    pub file_system: &'a Token,
    pub access_point: &'a Token,
    /// Notification topic, when notifications are enabled
    pub topic: Option<&'a Token>,
    /// Read step whose `Parameter.Value` is the hosted zone ID
    pub hosted_zone_reader: &'a Token,
    /// Read step whose `Parameter.Value` is the launcher role ARN
    pub launcher_role_reader: &'a Token,
    pub region: &'a str,
    pub account: &'a str,
}

/// Policy nodes added by [`PolicyBinder::bind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPolicies {
    pub data_access: Token,
    pub topic_publish: Option<Token>,
    pub service_control: Token,
    pub dns_edit: Token,
    pub launcher_role: Token,
}

pub struct PolicyBinder<'a> {
    targets: BindingTargets<'a>,
}

impl<'a> PolicyBinder<'a> {
    pub fn new(targets: BindingTargets<'a>) -> Self {
        Self { targets }
    }

    pub fn bind(&self, graph: &mut ResourceGraph) -> Result<BoundPolicies> {
        let t = &self.targets;

        let data_access = graph.add(policy_node(
            "DataRWPolicy",
            data_access_statements(t.file_system, t.access_point),
            &[t.task_role],
        )?)?;

        let topic_publish = match t.topic {
            Some(topic) => Some(graph.add(policy_node(
                "TopicPublishPolicy",
                publish_statements(topic),
                &[t.task_role],
            )?)?),
            None => None,
        };

        let role_arn = t.launcher_role_reader.attr(PARAMETER_VALUE_FIELD);
        let launcher_role = graph.add(Resource::imported(
            LAUNCHER_ROLE_ID,
            "AWS::IAM::Role",
            json!({
                "Arn": role_arn,
                "RoleName": select_after(":role/", &role_arn),
            }),
        ))?;
        debug!(reader = %t.launcher_role_reader.logical_id(), "Imported launcher role");

        let service_control = graph.add(policy_node(
            "ServiceControlPolicy",
            service_control_statements(t.service, t.region, t.account),
            &[t.task_role, &launcher_role],
        )?)?;

        let dns_edit = graph.add(policy_node(
            "IamRoute53Policy",
            dns_edit_statements(t.hosted_zone_reader.attr(PARAMETER_VALUE_FIELD)),
            &[t.task_role],
        )?)?;

        info!(
            hosted_zone_reader = %t.hosted_zone_reader.logical_id(),
            launcher_role_reader = %t.launcher_role_reader.logical_id(),
            "Bound access policies"
        );

        Ok(BoundPolicies {
            data_access,
            topic_publish,
            service_control,
            dns_edit,
            launcher_role,
        })
    }
}

fn policy_node(
    logical_id: &str,
    statements: Vec<PolicyStatement>,
    roles: &[&Token],
) -> Result<Resource> {
    let document = PolicyDocument::new(statements).to_value()?;
    Ok(Resource::new(
        logical_id,
        "AWS::IAM::Policy",
        json!({
            "PolicyName": logical_id,
            "PolicyDocument": document,
            "Roles": roles,
        }),
    ))
}

/// Read/write on the file store, only through the access point
pub fn data_access_statements(file_system: &Token, access_point: &Token) -> Vec<PolicyStatement> {
    vec![
        PolicyStatement::allow([
            "elasticfilesystem:ClientMount",
            "elasticfilesystem:ClientWrite",
            "elasticfilesystem:DescribeFileSystems",
        ])
        .with_sid("AllowReadWriteOnEFS")
        .on(file_system.attr("Arn"))
        .with_condition(json!({
            "StringEquals": {
                "elasticfilesystem:AccessPointArn": access_point.attr("Arn"),
            },
        })),
    ]
}

pub fn publish_statements(topic: &Token) -> Vec<PolicyStatement> {
    vec![PolicyStatement::allow(["sns:Publish"]).on(topic)]
}

/// Full control of the service and its tasks, plus the network interface
/// lookup used to find the task's public IP
pub fn service_control_statements(
    service: &Token,
    region: &str,
    account: &str,
) -> Vec<PolicyStatement> {
    let tasks = format_arn("ecs", region, account, &format!("task/{}/*", CLUSTER_NAME));
    vec![
        PolicyStatement::allow(["ecs:*"])
            .with_sid("AllowAllOnServiceAndTask")
            .on(service)
            .on(tasks),
        PolicyStatement::allow(["ec2:DescribeNetworkInterfaces"]).on("*"),
    ]
}

/// Record-set edits on exactly one hosted zone
pub fn dns_edit_statements(hosted_zone_id: impl Into<Value>) -> Vec<PolicyStatement> {
    vec![
        PolicyStatement::allow([
            "route53:GetHostedZone",
            "route53:ChangeResourceRecordSets",
            "route53:ListResourceRecordSets",
        ])
        .with_sid("AllowEditRecordSets")
        .on(join(
            "",
            vec![json!("arn:aws:route53:::hostedzone/"), hosted_zone_id.into()],
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_control_scope() {
        let statements = service_control_statements(
            &Token::reference("FargateService"),
            "eu-west-1",
            "123456789012",
        );

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].resource[0], json!({"Ref": "FargateService"}));
        assert_eq!(
            statements[0].resource[1],
            "arn:aws:ecs:eu-west-1:123456789012:task/minecraft/*"
        );
        assert!(!statements[0].is_wildcard());
        assert!(statements[1].is_wildcard());
    }

    #[test]
    fn test_dns_edit_scoped_to_zone() {
        let statements = dns_edit_statements(Token::attribute("ZoneReader", "Parameter.Value"));
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].resource,
            vec![json!({"Fn::Join": ["", [
                "arn:aws:route53:::hostedzone/",
                {"Fn::GetAtt": ["ZoneReader", "Parameter.Value"]},
            ]]})]
        );
        assert!(!statements[0].is_wildcard());
        assert_eq!(statements[0].sid.as_deref(), Some("AllowEditRecordSets"));
    }

    #[test]
    fn test_data_access_condition() {
        let statements = data_access_statements(
            &Token::reference("FileSystem"),
            &Token::reference("AccessPoint"),
        );
        let condition = statements[0].condition.as_ref().unwrap();
        assert_eq!(
            condition["StringEquals"]["elasticfilesystem:AccessPointArn"],
            json!({"Fn::GetAtt": ["AccessPoint", "Arn"]})
        );
    }

    #[test]
    fn test_bind_attaches_to_both_roles() {
        let mut graph = ResourceGraph::new("test");
        let task_role = graph
            .add(Resource::new("TaskRole", "AWS::IAM::Role", json!({})))
            .unwrap();
        let service = graph
            .add(Resource::new("FargateService", "AWS::ECS::Service", json!({})))
            .unwrap();
        let file_system = graph
            .add(Resource::new("FileSystem", "AWS::EFS::FileSystem", json!({})))
            .unwrap();
        let access_point = graph
            .add(Resource::new("AccessPoint", "AWS::EFS::AccessPoint", json!({})))
            .unwrap();
        let zone_reader = graph
            .add(Resource::new("ZoneReader", "Custom::AWS", json!({})))
            .unwrap();
        let role_reader = graph
            .add(Resource::new("RoleReader", "Custom::AWS", json!({})))
            .unwrap();

        let bound = PolicyBinder::new(BindingTargets {
            task_role: &task_role,
            service: &service,
            file_system: &file_system,
            access_point: &access_point,
            topic: None,
            hosted_zone_reader: &zone_reader,
            launcher_role_reader: &role_reader,
            region: "us-east-1",
            account: "123456789012",
        })
        .bind(&mut graph)
        .unwrap();

        assert!(bound.topic_publish.is_none());

        let control = graph.get("ServiceControlPolicy").unwrap();
        assert_eq!(
            control.property("Roles").unwrap(),
            &json!([{"Ref": "TaskRole"}, {"Ref": "LauncherLambdaRole"}])
        );
        assert!(control.dependencies().contains(LAUNCHER_ROLE_ID));

        let launcher = graph.get(LAUNCHER_ROLE_ID).unwrap();
        assert!(launcher.is_imported());
        assert_eq!(
            launcher.property("Arn").unwrap(),
            &json!({"Fn::GetAtt": ["RoleReader", "Parameter.Value"]})
        );
        assert_eq!(
            launcher.property("RoleName").unwrap(),
            &json!({"Fn::Select": [1, {"Fn::Split": [":role/", {"Fn::GetAtt": ["RoleReader", "Parameter.Value"]}]}]})
        );
        assert!(launcher.dependencies().contains("RoleReader"));

        let dns = graph.get("IamRoute53Policy").unwrap();
        assert_eq!(dns.property("Roles").unwrap(), &json!([{"Ref": "TaskRole"}]));
        assert!(dns.dependencies().contains("ZoneReader"));

        let order = graph.ordered().unwrap();
        let position = |id: &str| order.iter().position(|r| r.logical_id() == id).unwrap();
        assert!(position("RoleReader") < position(LAUNCHER_ROLE_ID));
        assert!(position(LAUNCHER_ROLE_ID) < position("ServiceControlPolicy"));
        assert!(position("ZoneReader") < position("IamRoute53Policy"));
    }
}
