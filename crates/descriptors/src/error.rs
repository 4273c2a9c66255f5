// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse {path} as YAML: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
    #[error(transparent)]
    Validation(#[from] core_domain::ValidationError),
    #[error("no descriptor named {0:?}")]
    NotFound(String),
}
