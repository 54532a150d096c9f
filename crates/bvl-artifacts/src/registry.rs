//! Container image references for Docker Hub and the GitHub Container
//! Registry.

use serde::Serialize;

use crate::error::{ArtifactError, ArtifactResult};

pub const GHCR_HOST: &str = "ghcr.io";

/// Where an image is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    dockerhub_user: String,
    image: String,
    owner: String,
}

impl ImageRef {
    /// GHCR rejects upper-case namespaces, so `owner` is lowercased.
    pub fn new(dockerhub_user: &str, image: &str, owner: &str) -> Self {
        Self {
            dockerhub_user: dockerhub_user.to_string(),
            image: image.to_string(),
            owner: owner.to_lowercase(),
        }
    }

    pub fn dockerhub(&self, tag: &str) -> String {
        format!("{}/{}:{tag}", self.dockerhub_user, self.image)
    }

    pub fn ghcr(&self, tag: &str) -> String {
        format!("{GHCR_HOST}/{}/{}:{tag}", self.owner, self.image)
    }

    /// References for every version tag plus the commit SHA.
    pub fn tags<S: AsRef<str>>(&self, tags: &[S], sha: &str) -> RegistryTags {
        RegistryTags {
            dockerhub: tags.iter().map(|t| self.dockerhub(t.as_ref())).collect(),
            ghcr: tags.iter().map(|t| self.ghcr(t.as_ref())).collect(),
            sha: vec![self.dockerhub(sha), self.ghcr(sha)],
            ghcr_sha: self.ghcr(sha),
        }
    }
}

/// Parse a tag list in the JSON form emitted by `advance`.
pub fn parse_tags_json(json: &str) -> ArtifactResult<Vec<String>> {
    serde_json::from_str(json).map_err(|e| ArtifactError::InvalidTags(e.to_string()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryTags {
    pub dockerhub: Vec<String>,
    pub ghcr: Vec<String>,
    pub sha: Vec<String>,
    pub ghcr_sha: String,
}

impl RegistryTags {
    /// Every reference: Docker Hub, then GHCR, then SHA.
    pub fn all(&self) -> Vec<&str> {
        self.dockerhub
            .iter()
            .chain(&self.ghcr)
            .chain(&self.sha)
            .map(String::as_str)
            .collect()
    }

    /// Named, comma-joined lists for step outputs.
    pub fn output_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dockerhub_tags", self.dockerhub.join(",")),
            ("ghcr_tags", self.ghcr.join(",")),
            ("sha_tags", self.sha.join(",")),
            ("ghcr_sha_tag", self.ghcr_sha.clone()),
            ("tags", self.all().join(",")),
        ]
    }
}
