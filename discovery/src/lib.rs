//! `apigw-discovery` inventories API Gateway REST and HTTP APIs for the invoking account and
//! reports them to the Treblle discovery endpoint.
//!
//! The function runs once per trigger: it validates the requested regions, scans them all
//! concurrently and posts the inventory in small paced batches.
//!
//! Core modules:
//! - [`config`]: environment configuration
//! - [`regions`]: region allow-list
//! - [`identity`]: account id of the ambient credentials
//! - [`apigateway`]: per-region REST/HTTP API enumeration with stage lookup
//! - [`scan`]: region scanning and fan-out
//! - [`delivery`]: batched HTTPS delivery
//! - [`handler`]: Lambda entry point and status response

pub mod apigateway;
pub mod config;
pub mod delivery;
pub mod handler;
pub mod identity;
pub mod model;
pub mod regions;
pub mod scan;
