//! AgentCore Identity and external gateway descriptors.

use analytics_agent_common::IdentityConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundAuth {
    pub enabled: bool,
    pub oauth_provider: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundAuth {
    pub enabled: bool,
    pub api_key_management: bool,
    pub oauth_client_management: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySetup {
    pub inbound_auth: InboundAuth,
    pub outbound_auth: OutboundAuth,
}

pub fn setup_identity_integration(config: &IdentityConfig) -> IdentitySetup {
    let setup = IdentitySetup {
        inbound_auth: InboundAuth {
            enabled: true,
            oauth_provider: config.oauth_provider.clone(),
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
        },
        outbound_auth: OutboundAuth {
            enabled: true,
            api_key_management: true,
            oauth_client_management: true,
        },
    };
    tracing::info!(provider = %setup.inbound_auth.oauth_provider, "Identity integration configured");
    setup
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestGatewayDescriptor {
    #[serde(rename = "type")]
    pub gateway_type: String,
    pub base_url: String,
    pub auth_type: String,
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseGatewayDescriptor {
    #[serde(rename = "type")]
    pub gateway_type: String,
    pub connection_string: Option<String>,
    pub auth_type: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySetup {
    pub analytics_api: RestGatewayDescriptor,
    pub external_db: DatabaseGatewayDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct GatewaySetupOptions {
    pub analytics_api_url: Option<String>,
    pub db_connection: Option<String>,
}

pub fn setup_gateway_integration(options: &GatewaySetupOptions) -> GatewaySetup {
    let endpoint = |path: &str, method: &str| EndpointDescriptor {
        path: path.to_string(),
        method: method.to_string(),
    };

    let setup = GatewaySetup {
        analytics_api: RestGatewayDescriptor {
            gateway_type: "REST".to_string(),
            base_url: options
                .analytics_api_url
                .clone()
                .unwrap_or_else(|| "https://api.analytics.example.com".to_string()),
            auth_type: "api_key".to_string(),
            endpoints: vec![
                endpoint("/data/query", "POST"),
                endpoint("/data/export", "GET"),
                endpoint("/insights/generate", "POST"),
            ],
        },
        external_db: DatabaseGatewayDescriptor {
            gateway_type: "DATABASE".to_string(),
            connection_string: options.db_connection.clone(),
            auth_type: "credentials".to_string(),
            operations: vec!["SELECT".into(), "INSERT".into(), "UPDATE".into()],
        },
    };
    tracing::info!("Gateway integration configured");
    setup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_defaults() {
        let setup = setup_identity_integration(&IdentityConfig::default());
        assert_eq!(setup.inbound_auth.oauth_provider, "cognito");
        assert_eq!(setup.inbound_auth.scopes, vec!["openid", "profile", "email"]);
        assert!(setup.outbound_auth.api_key_management);
    }

    #[test]
    fn test_gateway_descriptor_serialization() {
        let setup = setup_gateway_integration(&GatewaySetupOptions::default());
        let value = serde_json::to_value(&setup).unwrap();
        assert_eq!(value["analytics_api"]["type"], "REST");
        assert_eq!(value["analytics_api"]["base_url"], "https://api.analytics.example.com");
        assert_eq!(value["analytics_api"]["endpoints"][1]["path"], "/data/export");
        assert_eq!(value["external_db"]["operations"][2], "UPDATE");
    }
}
