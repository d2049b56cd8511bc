// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP Protocol Schema Definitions
//!
//! Type-safe definitions for the MCP messages this server produces: the
//! initialize handshake, tool schemas, and resource templates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tools::{
    FETCH_ACTIVITIES_DATA, FETCH_BODY_BATTERY_DATA, FETCH_HEART_RATE_DATA, FETCH_SLEEP_DATA,
    FETCH_STEPS_DATA, FETCH_STRESS_DATA,
};

/// Server Information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP Tool Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// JSON Schema Property Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListChanged {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// MCP Server Capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ListChanged,
    pub resources: ListChanged,
}

/// Complete MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResponse {
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities {
                tools: ListChanged::default(),
                resources: ListChanged::default(),
            },
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Parameterized resource, e.g. `greeting://{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

pub const GREETING_URI_PREFIX: &str = "greeting://";

pub fn get_resource_templates() -> Vec<ResourceTemplate> {
    vec![ResourceTemplate {
        uri_template: format!("{GREETING_URI_PREFIX}{{name}}"),
        name: "get_greeting".to_string(),
        description: "Get a personalized greeting".to_string(),
        mime_type: "text/plain".to_string(),
    }]
}

/// All tool schemas exposed by `tools/list`
pub fn get_tools() -> Vec<ToolSchema> {
    vec![
        single_date_tool(
            FETCH_SLEEP_DATA,
            "Returns sleep data for a given date",
            "Date in format YYYY-MM-DD",
        ),
        create_tool(
            FETCH_STEPS_DATA,
            "Returns steps data for the given date range",
            &[
                ("date_from", "string", "Start date in format YYYY-MM-DD"),
                ("date_to", "string", "End date in format YYYY-MM-DD"),
            ],
        ),
        create_tool(
            FETCH_ACTIVITIES_DATA,
            "Returns the most recent activities",
            &[("num_activities", "integer", "Number of activities to fetch")],
        ),
        single_date_tool(
            FETCH_HEART_RATE_DATA,
            "Returns resting heart rate data for a given date",
            "Date in format YYYY-MM-DD",
        ),
        single_date_tool(
            FETCH_STRESS_DATA,
            "Returns stress data for a given date",
            "Date in format YYYY-MM-DD",
        ),
        create_tool(
            FETCH_BODY_BATTERY_DATA,
            "Returns body battery data for a given date range",
            &[
                ("start_date", "string", "Start date in format YYYY-MM-DD"),
                ("end_date", "string", "End date in format YYYY-MM-DD"),
            ],
        ),
    ]
}

fn single_date_tool(name: &str, description: &str, date_description: &str) -> ToolSchema {
    create_tool(name, description, &[("date", "string", date_description)])
}

/// Build a tool whose parameters are all required
fn create_tool(name: &str, description: &str, params: &[(&str, &str, &str)]) -> ToolSchema {
    let properties = params
        .iter()
        .map(|(param, property_type, param_description)| {
            (
                param.to_string(),
                PropertySchema {
                    property_type: property_type.to_string(),
                    description: Some(param_description.to_string()),
                },
            )
        })
        .collect();

    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(params.iter().map(|(param, _, _)| param.to_string()).collect()),
        },
    }
}
