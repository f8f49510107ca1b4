use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named capability profile a workflow step can be assigned to.
///
/// Agents own nothing: deleting one leaves any step that referenced it with
/// a dangling `agent_id`, which the graph builder reports via the
/// "Unknown Agent" label instead of cascading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServer>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// An MCP server endpoint an agent can reach. Names are not required to be
/// unique within an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub name: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }
}

#[derive(Default)]
pub struct AgentBuilder {
    name: String,
    description: Option<String>,
    role: Option<String>,
    capabilities: Option<String>,
    mcp_servers: Vec<McpServer>,
}

impl AgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = Some(capabilities.into());
        self
    }

    pub fn add_mcp_server(mut self, server: McpServer) -> Self {
        self.mcp_servers.push(server);
        self
    }

    pub fn build(self) -> Agent {
        let now = Local::now();
        Agent {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            role: self.role,
            capabilities: self.capabilities,
            mcp_servers: self.mcp_servers,
            created_at: now,
            updated_at: now,
        }
    }
}
