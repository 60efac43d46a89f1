// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AWS region catalogue with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default region for all enclave deployments.
pub const DEFAULT_AWS_REGION: &str = "us-east-2";

/// The standard commercial and GovCloud partitions.
const VALID_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "sa-east-1",
    "me-central-1",
    "me-south-1",
    "af-south-1",
    "il-central-1",
];

/// A validated AWS region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AwsRegion(String);

impl AwsRegion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(DEFAULT_AWS_REGION.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AwsRegion {
    type Err = InvalidRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if VALID_REGIONS.contains(&s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidRegion(s.to_owned()))
        }
    }
}

impl TryFrom<String> for AwsRegion {
    type Error = InvalidRegion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AwsRegion> for String {
    fn from(region: AwsRegion) -> Self {
        region.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid AWS region: {0}")]
pub struct InvalidRegion(String);
