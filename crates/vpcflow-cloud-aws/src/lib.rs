//! AWS EC2 provider for vpcflow
//!
//! This crate implements the CloudProvider trait on top of the EC2
//! management API, using explicit access keys instead of the ambient
//! credential chain.
//!
//! # Example
//!
//! ```ignore
//! use vpcflow_cloud::CloudProvider;
//! use vpcflow_cloud_aws::Ec2Provider;
//! use vpcflow_config::Credentials;
//!
//! let credentials = Credentials::load("~/.aws/cred.yml".as_ref())?;
//! let provider = Ec2Provider::connect("ap-southeast-2", &credentials).await;
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod error;
pub mod provider;

pub use error::{api_error, classify, hint_for_code};
pub use provider::Ec2Provider;
