//! Resource graph composition
//!
//! [`StackComposer::compose`] reads the cross-region parameters first, then
//! builds every node of the server topology and finally hands the concrete
//! identifiers to the [`PolicyBinder`]. A failed parameter read stops
//! composition before any node is added.

use crate::assets::{self, DATAPACK_ARCHIVE, MODPACK_ARCHIVES, MODPACK_PREFIX};
use crate::branch::{Branches, LoggingBranch, NetworkBranch, NotificationBranch};
use crate::constants::*;
use crate::edition::{self, EditionProfile};
use crate::error::Result;
use crate::policy::{BindingTargets, BoundPolicies, PolicyBinder};
use chrono::{DateTime, Utc};
use ondemand_cloud::{
    CloudError, PARAMETER_VALUE_FIELD, ParameterReader, Plan, RemovalPolicy, Resource,
    ResourceGraph, Token, join, parameter_read_step, role_name_from_arn,
};
use ondemand_config::StackConfig;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracing::{debug, info};

/// Source of the watchdog container image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogImage {
    /// Pulled from a public registry
    Registry(String),
    /// Built from a local directory (requires a Docker daemon at deploy time)
    Asset(PathBuf),
}

impl Default for WatchdogImage {
    fn default() -> Self {
        Self::Registry(WATCHDOG_REGISTRY_IMAGE.to_string())
    }
}

impl WatchdogImage {
    fn to_value(&self) -> Value {
        match self {
            Self::Registry(image) => json!(image),
            Self::Asset(dir) => json!({ "Asset": { "Directory": dir.display().to_string() } }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub watchdog_image: WatchdogImage,
    /// Datapack file names, see [`assets::discover_datapacks`]
    pub datapacks: Vec<String>,
    /// Apply timestamp; keys the parameter read steps
    pub applied_at: DateTime<Utc>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            watchdog_image: WatchdogImage::default(),
            datapacks: Vec::new(),
            applied_at: Utc::now(),
        }
    }
}

/// Values published by the domain stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRegionValues {
    pub hosted_zone_id: String,
    pub launcher_role_arn: String,
    pub launcher_role_name: String,
}

/// Result of a composition
#[derive(Debug, Clone)]
pub struct ComposedStack {
    pub graph: ResourceGraph,
    pub profile: EditionProfile,
    pub branches: Branches,
    pub cross_region: CrossRegionValues,
    pub policies: BoundPolicies,
}

impl ComposedStack {
    /// Template for the provisioning engine
    pub fn render(&self) -> Result<Value> {
        Ok(self.graph.render()?)
    }

    pub fn plan(&self) -> Result<Plan> {
        Ok(Plan::from_graph(&self.graph)?)
    }
}

/// Nodes shared between the build phases
struct Core {
    vpc: Token,
    file_system: Token,
    file_system_security_group: Token,
    access_point: Token,
    task_role: Token,
    cluster: Token,
    task_definition: Token,
}

pub struct StackComposer<'a> {
    config: &'a StackConfig,
    reader: &'a dyn ParameterReader,
    options: ComposeOptions,
}

impl<'a> StackComposer<'a> {
    pub fn new(config: &'a StackConfig, reader: &'a dyn ParameterReader) -> Self {
        Self {
            config,
            reader,
            options: ComposeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn compose(&self) -> Result<ComposedStack> {
        let cross_region = self.read_parameters().await?;

        let config = self.config;
        let profile = edition::select(config.minecraft_edition);
        let branches = Branches::from_config(config);
        info!(
            edition = %config.minecraft_edition,
            region = %config.server_region,
            capacity = branches.capacity.as_str(),
            "Composing stack"
        );

        let mut graph = ResourceGraph::new(format!(
            "On-demand Minecraft server ({} edition) in {}",
            config.minecraft_edition, config.server_region
        ));

        let core = self.add_core(&mut graph, &branches)?;
        let (datapack_upload, modpack_upload, bucket) = self.add_assets(&mut graph)?;
        let server = self.add_server_container(&mut graph, &core, &profile, &branches, &bucket)?;

        let security_group = graph.add(Resource::new(
            "ServiceSecurityGroup",
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Security group for Minecraft on-demand",
                "VpcId": core.vpc,
                "SecurityGroupIngress": [{
                    "CidrIp": "0.0.0.0/0",
                    "IpProtocol": profile.transport.as_str(),
                    "FromPort": profile.port,
                    "ToPort": profile.port,
                }],
            }),
        ))?;

        let service = self.add_service(&mut graph, &core, &branches, &security_group)?;
        graph.add_dependency(service.logical_id(), modpack_upload.logical_id())?;
        graph.add_dependency(service.logical_id(), datapack_upload.logical_id())?;
        graph.add_dependency(service.logical_id(), server.logical_id())?;

        graph.add(Resource::new(
            "FileSystemIngressFromService",
            "AWS::EC2::SecurityGroupIngress",
            json!({
                "GroupId": core.file_system_security_group.attr("GroupId"),
                "SourceSecurityGroupId": security_group.attr("GroupId"),
                "IpProtocol": "tcp",
                "FromPort": NFS_PORT,
                "ToPort": NFS_PORT,
            }),
        ))?;

        let at = self.options.applied_at;
        let hosted_zone_reader = graph.add(parameter_read_step(
            "Route53HostedZoneIdReader",
            HOSTED_ZONE_PARAMETER,
            DOMAIN_STACK_REGION,
            at,
        ))?;
        let launcher_role_reader = graph.add(parameter_read_step(
            "LauncherLambdaRoleArnReader",
            LAUNCHER_ROLE_ARN_PARAMETER,
            DOMAIN_STACK_REGION,
            at,
        ))?;

        let topic = self.add_notifications(&mut graph, &branches.notification)?;

        let watchdog = self.add_watchdog_container(
            &mut graph,
            &core,
            &branches,
            topic.as_ref(),
            &hosted_zone_reader,
        )?;
        graph.add_dependency(service.logical_id(), watchdog.logical_id())?;

        let policies = PolicyBinder::new(BindingTargets {
            task_role: &core.task_role,
            service: &service,
            file_system: &core.file_system,
            access_point: &core.access_point,
            topic: topic.as_ref(),
            hosted_zone_reader: &hosted_zone_reader,
            launcher_role_reader: &launcher_role_reader,
            region: &config.server_region,
            account: &config.account,
        })
        .bind(&mut graph)?;

        info!(resources = graph.len(), "Stack composed");

        Ok(ComposedStack {
            graph,
            profile,
            branches,
            cross_region,
            policies,
        })
    }

    /// Reads both domain stack parameters; nothing is composed until they resolve
    async fn read_parameters(&self) -> Result<CrossRegionValues> {
        let hosted_zone_id = self
            .reader
            .read(HOSTED_ZONE_PARAMETER, DOMAIN_STACK_REGION)
            .await?;
        let launcher_role_arn = self
            .reader
            .read(LAUNCHER_ROLE_ARN_PARAMETER, DOMAIN_STACK_REGION)
            .await?;

        let malformed = |message: String| CloudError::ParameterLookup {
            name: LAUNCHER_ROLE_ARN_PARAMETER.to_string(),
            region: DOMAIN_STACK_REGION.to_string(),
            message,
        };
        let launcher_role_name =
            role_name_from_arn(&launcher_role_arn).map_err(|e| malformed(e.to_string()))?;
        // The imported role's name is split out of the read step at apply time
        if !launcher_role_arn.ends_with(&format!(":role/{}", launcher_role_name)) {
            return Err(malformed(format!(
                "Role ARNs with a path are not supported: {}",
                launcher_role_arn
            ))
            .into());
        }

        debug!(
            hosted_zone_id = %hosted_zone_id,
            launcher_role = %launcher_role_name,
            "Read domain stack parameters"
        );

        Ok(CrossRegionValues {
            hosted_zone_id,
            launcher_role_arn,
            launcher_role_name,
        })
    }

    /// Network, storage, backups, task identity, cluster and task definition
    fn add_core(&self, graph: &mut ResourceGraph, branches: &Branches) -> Result<Core> {
        let config = self.config;

        let vpc = match &branches.network {
            NetworkBranch::CreateIsolated => graph.add(Resource::new(
                "Vpc",
                "AWS::EC2::VPC",
                json!({
                    "CidrBlock": "10.0.0.0/16",
                    "MaxAzs": 3,
                    "NatGateways": 0,
                    "SubnetConfiguration": [{ "Name": "Public", "SubnetType": "PUBLIC" }],
                }),
            ))?,
            NetworkBranch::Existing { vpc_id } => graph.add(Resource::imported(
                "Vpc",
                "AWS::EC2::VPC",
                json!({ "VpcId": vpc_id }),
            ))?,
        };

        let file_system_security_group = graph.add(Resource::new(
            "FileSystemSecurityGroup",
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Minecraft world data file system",
                "VpcId": vpc,
            }),
        ))?;

        let file_system = graph.add(
            Resource::new(
                "FileSystem",
                "AWS::EFS::FileSystem",
                json!({
                    "VpcId": vpc,
                    "Encrypted": true,
                    "PerformanceMode": "generalPurpose",
                    "ThroughputMode": "bursting",
                    "LifecyclePolicies": [{ "TransitionToIA": "AFTER_14_DAYS" }],
                    "SecurityGroups": [file_system_security_group.attr("GroupId")],
                }),
            )
            .with_removal_policy(RemovalPolicy::Retain),
        )?;

        let access_point = graph.add(Resource::new(
            "AccessPoint",
            "AWS::EFS::AccessPoint",
            json!({
                "FileSystemId": file_system,
                "PosixUser": { "Uid": POSIX_ID, "Gid": POSIX_ID },
                "RootDirectory": {
                    "Path": ACCESS_POINT_PATH,
                    "CreationInfo": {
                        "OwnerUid": POSIX_ID,
                        "OwnerGid": POSIX_ID,
                        "Permissions": ACCESS_POINT_PERMISSIONS,
                    },
                },
            }),
        ))?;

        self.add_backup(graph, &file_system)?;

        let task_role = graph.add(Resource::new(
            "TaskRole",
            "AWS::IAM::Role",
            json!({
                "Description": "Minecraft ECS task role",
                "AssumeRolePolicyDocument": assume_role_document("ecs-tasks.amazonaws.com"),
            }),
        ))?;

        let cluster = graph.add(Resource::new(
            "Cluster",
            "AWS::ECS::Cluster",
            json!({
                "ClusterName": CLUSTER_NAME,
                "ClusterSettings": [{ "Name": "containerInsights", "Value": "enabled" }],
                "CapacityProviders": ["FARGATE", "FARGATE_SPOT"],
            }),
        ))?;

        let task_definition = graph.add(Resource::new(
            "TaskDefinition",
            "AWS::ECS::TaskDefinition",
            json!({
                "RequiresCompatibilities": ["FARGATE"],
                "NetworkMode": "awsvpc",
                "Cpu": config.task_cpu.to_string(),
                "Memory": config.task_memory.to_string(),
                "TaskRoleArn": task_role.attr("Arn"),
                "Volumes": [{
                    "Name": VOLUME_NAME,
                    "EFSVolumeConfiguration": {
                        "FilesystemId": file_system,
                        "TransitEncryption": "ENABLED",
                        "AuthorizationConfig": {
                            "AccessPointId": access_point,
                            "IAM": "ENABLED",
                        },
                    },
                }],
            }),
        ))?;

        Ok(Core {
            vpc,
            file_system,
            file_system_security_group,
            access_point,
            task_role,
            cluster,
            task_definition,
        })
    }

    /// Daily backups kept for 35 days
    fn add_backup(&self, graph: &mut ResourceGraph, file_system: &Token) -> Result<()> {
        let plan = graph.add(Resource::new(
            "EFSBackupPlan",
            "AWS::Backup::BackupPlan",
            json!({
                "BackupPlan": {
                    "BackupPlanName": "EFSBackupPlan",
                    "BackupPlanRule": [{
                        "RuleName": "Daily",
                        "TargetBackupVault": "Default",
                        "ScheduleExpression": "cron(0 5 * * ? *)",
                        "Lifecycle": { "DeleteAfterDays": BACKUP_RETENTION_DAYS },
                    }],
                },
            }),
        ))?;

        let role = graph.add(Resource::new(
            "EFSBackupRole",
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role_document("backup.amazonaws.com"),
                "ManagedPolicyArns": [
                    "arn:aws:iam::aws:policy/service-role/AWSBackupServiceRolePolicyForBackup",
                ],
            }),
        ))?;

        graph.add(Resource::new(
            "EFSSelection",
            "AWS::Backup::BackupSelection",
            json!({
                "BackupPlanId": plan,
                "BackupSelection": {
                    "SelectionName": "EFSSelection",
                    "IamRoleArn": role.attr("Arn"),
                    "Resources": [file_system.attr("Arn")],
                },
            }),
        ))?;
        Ok(())
    }

    /// Public bucket and the two upload steps; returns (datapack, modpack, bucket)
    fn add_assets(&self, graph: &mut ResourceGraph) -> Result<(Token, Token, Token)> {
        let bucket = graph.add(
            Resource::new(
                "ModpackBucket",
                "AWS::S3::Bucket",
                json!({
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": false,
                        "BlockPublicPolicy": false,
                        "IgnorePublicAcls": false,
                        "RestrictPublicBuckets": false,
                    },
                }),
            )
            .with_removal_policy(RemovalPolicy::Retain),
        )?;

        graph.add(Resource::new(
            "ModpackBucketPolicy",
            "AWS::S3::BucketPolicy",
            json!({
                "Bucket": bucket,
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "AWS": "*" },
                        "Action": "s3:GetObject",
                        "Resource": join("", vec![bucket.attr("Arn").into(), json!("/*")]),
                    }],
                },
            }),
        ))?;

        let datapack = graph.add(Resource::new(
            "DeployDatapack",
            "Custom::CDKBucketDeployment",
            json!({
                "SourceArchives": [DATAPACK_ARCHIVE],
                "DestinationBucketName": bucket,
                "DestinationBucketKeyPrefix": "/",
                "MemoryLimit": 2048,
            }),
        ))?;

        let modpack = graph.add(Resource::new(
            "DeployModpack",
            "Custom::CDKBucketDeployment",
            json!({
                "SourceArchives": MODPACK_ARCHIVES,
                "DestinationBucketName": bucket,
                "DestinationBucketKeyPrefix": MODPACK_PREFIX,
            }),
        ))?;

        Ok((datapack, modpack, bucket))
    }

    fn add_server_container(
        &self,
        graph: &mut ResourceGraph,
        core: &Core,
        profile: &EditionProfile,
        branches: &Branches,
        bucket: &Token,
    ) -> Result<Token> {
        let region = &self.config.server_region;

        let mut environment = Map::new();
        environment.insert("MODRINTH_MODPACK".into(), assets::modpack_url(bucket, region));
        environment.insert(
            "DATAPACKS".into(),
            assets::datapack_urls(bucket, region, &self.options.datapacks),
        );
        for (key, value) in self.config.minecraft_image_env.iter() {
            environment.insert(key.clone(), json!(value));
        }

        let mut container = Resource::new(
            "ServerContainer",
            "AWS::ECS::ContainerDefinition",
            json!({
                "TaskDefinition": core.task_definition,
                "ContainerName": SERVER_CONTAINER_NAME,
                "Image": profile.image,
                "Essential": false,
                "PortMappings": [{
                    "ContainerPort": profile.port,
                    "HostPort": profile.port,
                    "Protocol": profile.transport.as_str(),
                }],
                "Environment": environment,
                "MountPoints": [{
                    "ContainerPath": DATA_MOUNT_PATH,
                    "SourceVolume": VOLUME_NAME,
                    "ReadOnly": false,
                }],
            }),
        );
        if let Some(logging) =
            self.add_log_group(graph, "ServerContainerLogGroup", SERVER_CONTAINER_NAME, branches.logging)?
        {
            container.set_property("LogConfiguration", logging);
        }

        Ok(graph.add(container)?)
    }

    fn add_service(
        &self,
        graph: &mut ResourceGraph,
        core: &Core,
        branches: &Branches,
        security_group: &Token,
    ) -> Result<Token> {
        Ok(graph.add(Resource::new(
            "FargateService",
            "AWS::ECS::Service",
            json!({
                "Cluster": core.cluster,
                "ServiceName": SERVICE_NAME,
                "TaskDefinition": core.task_definition,
                "DesiredCount": 0,
                "PlatformVersion": "LATEST",
                "CapacityProviderStrategy": [{
                    "CapacityProvider": branches.capacity.as_str(),
                    "Weight": 1,
                    "Base": 1,
                }],
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": "ENABLED",
                        "SecurityGroups": [security_group.attr("GroupId")],
                        "Subnets": core.vpc.attr("PublicSubnetIds"),
                    },
                },
            }),
        ))?)
    }

    /// Topic and email subscription; `None` when notifications are disabled
    fn add_notifications(
        &self,
        graph: &mut ResourceGraph,
        branch: &NotificationBranch,
    ) -> Result<Option<Token>> {
        let NotificationBranch::Email { address } = branch else {
            debug!("Notifications disabled");
            return Ok(None);
        };

        let topic = graph.add(Resource::new(
            "ServerSnsTopic",
            "AWS::SNS::Topic",
            json!({ "DisplayName": "Minecraft Server Notifications" }),
        ))?;
        graph.add(Resource::new(
            "EmailSubscription",
            "AWS::SNS::Subscription",
            json!({
                "Protocol": "email",
                "TopicArn": topic,
                "Endpoint": address,
            }),
        ))?;
        Ok(Some(topic))
    }

    fn add_watchdog_container(
        &self,
        graph: &mut ResourceGraph,
        core: &Core,
        branches: &Branches,
        topic: Option<&Token>,
        hosted_zone_reader: &Token,
    ) -> Result<Token> {
        let config = self.config;
        let twilio = &config.twilio;
        let text = |value: &Option<String>| json!(value.as_deref().unwrap_or_default());

        let environment = json!({
            "CLUSTER": CLUSTER_NAME,
            "SERVICE": SERVICE_NAME,
            "DNSZONE": hosted_zone_reader.attr(PARAMETER_VALUE_FIELD),
            "SERVERNAME": config.server_hostname(),
            "SNSTOPIC": topic.map(Value::from).unwrap_or_else(|| json!("")),
            "TWILIOFROM": text(&twilio.phone_from),
            "TWILIOTO": text(&twilio.phone_to),
            "TWILIOAID": text(&twilio.account_id),
            "TWILIOAUTH": text(&twilio.auth_code),
            "STARTUPMIN": config.startup_minutes.to_string(),
            "SHUTDOWNMIN": config.shutdown_minutes.to_string(),
        });

        let mut container = Resource::new(
            "WatchDogContainer",
            "AWS::ECS::ContainerDefinition",
            json!({
                "TaskDefinition": core.task_definition,
                "ContainerName": WATCHDOG_CONTAINER_NAME,
                "Image": self.options.watchdog_image.to_value(),
                "Essential": true,
                "Environment": environment,
            }),
        );

        if let Some(logging) = self.add_log_group(
            graph,
            "WatchDogContainerLogGroup",
            WATCHDOG_CONTAINER_NAME,
            branches.logging,
        )? {
            container.set_property("LogConfiguration", logging);
        }

        Ok(graph.add(container)?)
    }

    /// Log group plus the container's log configuration, when logging is on
    fn add_log_group(
        &self,
        graph: &mut ResourceGraph,
        logical_id: &str,
        stream_prefix: &str,
        logging: LoggingBranch,
    ) -> Result<Option<Value>> {
        let LoggingBranch::CloudWatch { retention_days } = logging else {
            return Ok(None);
        };

        let group = graph.add(Resource::new(
            logical_id,
            "AWS::Logs::LogGroup",
            json!({ "RetentionInDays": retention_days }),
        ))?;

        Ok(Some(json!({
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": group,
                "awslogs-stream-prefix": stream_prefix,
                "awslogs-region": self.config.server_region,
            },
        })))
    }
}

fn assume_role_document(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole",
        }],
    })
}
