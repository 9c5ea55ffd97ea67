//! Fixed names shared with the domain stack and the watchdog

/// Name of the deployed stack
pub const STACK_NAME: &str = "minecraft-server-stack";

pub const CLUSTER_NAME: &str = "minecraft";
pub const SERVICE_NAME: &str = "minecraft-server";
pub const SERVER_CONTAINER_NAME: &str = "minecraft-server";
pub const WATCHDOG_CONTAINER_NAME: &str = "minecraft-ecsfargate-watchdog";
pub const VOLUME_NAME: &str = "data";

/// Region of the domain stack (Route 53 query logging only works there)
pub const DOMAIN_STACK_REGION: &str = "us-east-1";
/// Parameter holding the hosted zone ID published by the domain stack
pub const HOSTED_ZONE_PARAMETER: &str = "MinecraftHostedZoneID";
/// Parameter holding the launcher function's role ARN
pub const LAUNCHER_ROLE_ARN_PARAMETER: &str = "LauncherLambdaRoleArn";

pub const JAVA_EDITION_IMAGE: &str = "itzg/minecraft-server";
pub const BEDROCK_EDITION_IMAGE: &str = "itzg/minecraft-bedrock-server";
pub const WATCHDOG_REGISTRY_IMAGE: &str = "doctorray/minecraft-ecsfargate-watchdog";

pub const ACCESS_POINT_PATH: &str = "/minecraft";
pub const POSIX_ID: &str = "1000";
pub const ACCESS_POINT_PERMISSIONS: &str = "0755";
pub const DATA_MOUNT_PATH: &str = "/data";
pub const NFS_PORT: u16 = 2049;

pub const BACKUP_RETENTION_DAYS: u32 = 35;
pub const LOG_RETENTION_DAYS: u32 = 3;

pub const MODPACK_FILE_NAME: &str = "1.21.4-vanilla+ 1.0.0.mrpack";
