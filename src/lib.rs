//! # netform - Typed Cloud Network Declarations
//!
//! netform declares a cloud network topology (a VPC with public and private
//! subnets, an application load balancer with its listener and target group,
//! security groups, and VPC interface endpoints) as typed Rust values, checks
//! it, and synthesizes CloudFormation templates that an external provisioning
//! engine deploys. The crate never talks to a cloud API.
//!
//! ## Core Concepts
//!
//! - **App**: the root; owns every stack and the region they deploy to
//! - **Stack**: a set of declarations deployed together, each under a unique construct id
//! - **Handles**: typed references (`VpcRef`, `SecurityGroupRef`, ...) minted by a stack
//! - **Dependency graph**: edges derived from handles; ordered with a topological sort
//! - **Template**: the CloudFormation document a stack synthesizes to
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                             │
//! │              (clap: synth, list, graph, validate)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Topology (VpcAlbStack, VpcAlbLeanStack)             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │          App / Stack (typed resource tables + construct paths)      │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │  CIDR carving   │   │  Dependency graph   │   │     Validation      │
//! │  (subnets)      │   │  (petgraph)         │   │                     │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │                         │                         │
//!          └─────────────────────────┼─────────────────────────┘
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │        Synthesizer -> CloudFormation JSON/YAML + cloud assembly     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use netform::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut app = App::new("ap-northeast-2");
//!     let stack = app.add_stack("Network")?;
//!
//!     let vpc = stack.add_vpc("Vpc", VpcProps::new().with_max_azs(2))?;
//!     let sg = stack.add_security_group("WebSg", SecurityGroupProps::new(vpc))?;
//!     stack.add_ingress_rule(sg, Peer::any_ipv4(), Port::tcp(80), "Allow HTTP traffic")?;
//!
//!     let template = synthesize(app.stack("Network")?)?;
//!     println!("{}", template.to_json()?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    // Error handling
    pub use crate::error::{Error, Result};

    // Addressing
    pub use crate::cidr::{CidrAllocator, Ipv4Cidr};

    // Resources
    pub use crate::resources::{
        ApplicationProtocol, EndpointService, HealthCheck, InterfaceEndpointProps, IpAddresses,
        ListenerAction, ListenerProps, LoadBalancerProps, Peer, Port, Protocol,
        SecurityGroupProps, SubnetConfiguration, SubnetType, TargetGroupProps, TargetType,
        VpcProps,
    };

    // Stacks
    pub use crate::stack::{App, DependencyGraph, Stack};

    // Synthesis
    pub use crate::synth::{synthesize, CloudAssembly, Template, TemplateFormat};

    // Topology
    pub use crate::topology::{build_app, define_vpc_alb_stack, StackVariant};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and the crate-wide `Result` alias.
pub mod error;

/// IPv4 CIDR blocks and sequential subnet carving.
pub mod cidr;

/// Layered configuration (files, then environment).
pub mod config;

// ============================================================================
// Declarations
// ============================================================================

/// Typed resource descriptors and their props.
pub mod resources;

/// Stacks, the app, logical ids and the dependency graph.
pub mod stack;

/// The VPC + ALB topology.
pub mod topology;

// ============================================================================
// Output
// ============================================================================

/// CloudFormation synthesis and the cloud assembly writer.
pub mod synth;

pub use error::{Error, Result};
