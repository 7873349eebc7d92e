//! AgentCore Gateway integration, gateway target handler and identity setup

pub mod client;
pub mod identity;
pub mod integration;
pub mod target;

pub use client::{GatewayClient, GatewayType, HttpGatewayClient};
pub use identity::{
    setup_gateway_integration, setup_identity_integration, GatewaySetup, GatewaySetupOptions,
    IdentitySetup,
};
pub use integration::{
    AgentCoreGateway, GatewayConnection, GatewayResponse, GatewayStatus, RestCall, S3Operation,
};
pub use target::{GatewayTarget, TargetRequest, TargetResponse};
