//! Core pipeline behind the `uplift` CLI.
//!
//! The pipeline is a single linear sequence with independently-failing
//! stages: build each enabled artifact kind, archive a local snapshot,
//! upload to the bucket, invalidate the CDN for the accumulated changed
//! set, write the published version back into the deploy config, and
//! generate the loader snippet host pages embed.
//!
//! Stage failures are caught at their own boundary and recorded in the
//! [`uplift_types::DeployReceipt`]; they do not cascade to sibling
//! stages. The only fatal errors are an unreadable config and a missing
//! template name, since every destination path depends on it.

pub mod backup;
pub mod clipboard;
pub mod engine;
pub mod naming;
pub mod publish;
pub mod snippet;

pub use engine::{DeployOptions, Reporter, run_deploy};
pub use publish::{AwsCli, Transport};
