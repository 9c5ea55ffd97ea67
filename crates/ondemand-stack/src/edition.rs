//! Edition-specific network parameters

use crate::constants::{BEDROCK_EDITION_IMAGE, JAVA_EDITION_IMAGE};
use ondemand_config::MinecraftEdition;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image and listener of one edition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditionProfile {
    pub image: &'static str,
    pub port: u16,
    pub transport: Transport,
}

pub fn select(edition: MinecraftEdition) -> EditionProfile {
    match edition {
        MinecraftEdition::Java => EditionProfile {
            image: JAVA_EDITION_IMAGE,
            port: 25565,
            transport: Transport::Tcp,
        },
        MinecraftEdition::Bedrock => EditionProfile {
            image: BEDROCK_EDITION_IMAGE,
            port: 19132,
            transport: Transport::Udp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java() {
        let profile = select(MinecraftEdition::Java);
        assert_eq!(profile.image, "itzg/minecraft-server");
        assert_eq!(profile.port, 25565);
        assert_eq!(profile.transport, Transport::Tcp);
    }

    #[test]
    fn test_bedrock() {
        let profile = select(MinecraftEdition::Bedrock);
        assert_eq!(profile.image, "itzg/minecraft-bedrock-server");
        assert_eq!(profile.port, 19132);
        assert_eq!(profile.transport, Transport::Udp);
    }

    #[test]
    fn test_profiles_do_not_overlap() {
        let java = select(MinecraftEdition::Java);
        let bedrock = select(MinecraftEdition::Bedrock);
        assert_ne!(java.image, bedrock.image);
        assert_ne!(java.port, bedrock.port);
        assert_ne!(java.transport, bedrock.transport);
    }
}
