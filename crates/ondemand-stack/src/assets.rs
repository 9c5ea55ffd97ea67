//! Static asset staging
//!
//! Datapacks and the modpack are uploaded to a public bucket before the
//! service starts. The server container learns their URLs through its
//! environment.

use crate::constants::MODPACK_FILE_NAME;
use crate::error::{Result, StackError};
use ondemand_cloud::{Token, join};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, info};

/// Key prefix of the uploaded datapacks
pub const DATAPACK_PREFIX: &str = "datapacks/";
/// Key prefix of the uploaded modpack files
pub const MODPACK_PREFIX: &str = "modpack/";

/// Local archives uploaded by the deployment steps
pub const DATAPACK_ARCHIVE: &str = "datapacks.zip";
pub const MODPACK_ARCHIVES: [&str; 2] = ["modpack.zip", "modpack-full.zip"];

/// File names of every `*.zip` below `dir`, in sorted order
///
/// A missing directory yields no datapacks.
pub fn discover_datapacks(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Datapack directory not found");
        return Ok(Vec::new());
    }

    let pattern = dir.join("**").join("*.zip");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern)
        .map_err(|e| StackError::Asset(format!("Invalid pattern {}: {}", pattern, e)))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StackError::Asset(e.to_string()))?;
        if let Some(name) = path.file_name() {
            names.push(name.to_string_lossy().into_owned());
        }
    }
    names.sort();

    info!(count = names.len(), dir = %dir.display(), "Discovered datapacks");
    Ok(names)
}

/// `https://<bucket>.s3.<region>.amazonaws.com/<prefix><encoded name>`
pub fn object_url(bucket: &Token, region: &str, prefix: &str, file_name: &str) -> Value {
    join("", object_url_parts(bucket, region, prefix, file_name))
}

fn object_url_parts(bucket: &Token, region: &str, prefix: &str, file_name: &str) -> Vec<Value> {
    vec![
        json!("https://"),
        bucket.into(),
        json!(format!(
            ".s3.{}.amazonaws.com/{}{}",
            region,
            prefix,
            urlencoding::encode(file_name)
        )),
    ]
}

pub fn modpack_url(bucket: &Token, region: &str) -> Value {
    object_url(bucket, region, MODPACK_PREFIX, MODPACK_FILE_NAME)
}

/// Comma-separated URLs of all datapacks; the empty string when there are none
pub fn datapack_urls(bucket: &Token, region: &str, datapacks: &[String]) -> Value {
    if datapacks.is_empty() {
        return json!("");
    }

    let mut parts = Vec::new();
    for (i, name) in datapacks.iter().enumerate() {
        if i > 0 {
            parts.push(json!(","));
        }
        parts.extend(object_url_parts(bucket, region, DATAPACK_PREFIX, name));
    }
    join("", parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_datapacks_recursive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("b pack.zip"), b"").unwrap();
        fs::write(nested.join("a.zip"), b"").unwrap();
        fs::write(temp_dir.path().join("readme.txt"), b"").unwrap();

        let names = discover_datapacks(temp_dir.path()).unwrap();
        assert_eq!(names, vec!["a.zip".to_string(), "b pack.zip".to_string()]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let names = discover_datapacks(&temp_dir.path().join("none")).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_modpack_url_is_encoded() {
        let url = modpack_url(&Token::reference("ModpackBucket"), "eu-west-1");
        assert_eq!(
            url,
            json!({"Fn::Join": ["", [
                "https://",
                {"Ref": "ModpackBucket"},
                ".s3.eu-west-1.amazonaws.com/modpack/1.21.4-vanilla%2B%201.0.0.mrpack",
            ]]})
        );
    }

    #[test]
    fn test_datapack_urls() {
        let bucket = Token::reference("ModpackBucket");
        assert_eq!(datapack_urls(&bucket, "us-east-1", &[]), json!(""));

        let urls = datapack_urls(
            &bucket,
            "us-east-1",
            &["a.zip".to_string(), "b pack.zip".to_string()],
        );
        let parts = urls["Fn::Join"][1].as_array().unwrap();
        assert_eq!(parts.len(), 7);
        assert_eq!(parts[3], ",");
        assert_eq!(parts[6], ".s3.us-east-1.amazonaws.com/datapacks/b%20pack.zip");
    }
}
