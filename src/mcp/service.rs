//! MCP service implementation using rmcp.
//!
//! `DbService` exposes the database tools via the rmcp framework's
//! macros and implements the resource and prompt handlers by hand.
//! Every tool returns a plain string: query results render as markdown
//! or JSON text, and failures render as inline `Error ...` sentences
//! rather than protocol faults, so the assistant always receives
//! something it can read back to the user.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, GetPromptRequestParam, GetPromptResult, Implementation, ListPromptsResult,
        ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParam, ProtocolVersion,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ResourceContents,
        ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde_json::json;

use crate::error::DbResult;
use crate::mcp::prompts;
use crate::session::SessionContext;
use crate::tools::{
    self, DatabaseInfoInput, ExecuteQueryInput, FindTableInput, GetSchemaInput, TableInput,
    TableSampleInput,
};

const SCHEMA_ALL_URI: &str = "schema://all";
const SCHEMA_URI_PREFIX: &str = "schema://";

#[derive(Clone)]
pub struct DbService {
    /// Shared registry and per-session query state
    ctx: Arc<SessionContext>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    /// Resource listing: the combined schema document plus one entry per
    /// configured database.
    fn schema_resources(&self) -> Vec<Resource> {
        let mut resources = vec![json_resource(
            SCHEMA_ALL_URI,
            "Database schemas",
            "Schemas for all configured databases",
        )];
        for database in self.ctx.registry().all() {
            resources.push(json_resource(
                format!("{SCHEMA_URI_PREFIX}{}", database.id),
                format!("{} schema", database.id),
                format!("Schema for {} ({})", database.description, database.db_type),
            ));
        }
        resources
    }

    /// Resolve a `schema://` URI to its JSON payload.
    ///
    /// `schema://all` covers every database; `schema://{db_id}` covers
    /// one. Anything else, including an unknown database ID, is a
    /// resource-not-found protocol error.
    async fn schema_resource_payload(&self, uri: &str) -> Result<String, McpError> {
        if uri == SCHEMA_ALL_URI {
            return Ok(tools::get_schema(&self.ctx, None).await?);
        }
        if let Some(db_id) = uri.strip_prefix(SCHEMA_URI_PREFIX) {
            return Ok(tools::get_schema(&self.ctx, Some(db_id)).await?);
        }
        Err(McpError::resource_not_found(
            format!("Unknown resource URI: {uri}"),
            Some(json!({ "uri": uri })),
        ))
    }
}

/// Convert a tool result into the string sent back to the assistant.
fn render(result: DbResult<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => e.user_message(),
    }
}

fn json_resource(
    uri: impl Into<String>,
    name: impl Into<String>,
    description: impl Into<String>,
) -> Resource {
    let mut resource = RawResource::new(uri.into(), name.into());
    resource.description = Some(description.into());
    resource.mime_type = Some("application/json".to_string());
    resource.no_annotation()
}

#[tool_router]
impl DbService {
    #[tool(
        description = "List all available database connections.\nReturns database IDs, descriptions, types, and table counts where the schema is known."
    )]
    async fn list_databases(&self) -> String {
        render(tools::list_databases(&self.ctx).await)
    }

    #[tool(
        description = "Get detailed information about a database, including a schema summary.\nOmit db_id to get information for every database."
    )]
    async fn get_database_info(
        &self,
        Parameters(input): Parameters<DatabaseInfoInput>,
    ) -> String {
        render(tools::get_database_info(&self.ctx, input.db_id.as_deref()).await)
    }

    #[tool(
        description = "Get the table layout of a database as JSON.\nPass a db_id for one database, or \"all\" (or nothing) for every database."
    )]
    async fn get_schema(&self, Parameters(input): Parameters<GetSchemaInput>) -> String {
        render(tools::get_schema(&self.ctx, input.db_id.as_deref()).await)
    }

    #[tool(
        description = "Execute a SQL query on the selected database and return results as a markdown table.\nLarge results show the first 10 rows followed by a total count."
    )]
    async fn execute_query(&self, Parameters(input): Parameters<ExecuteQueryInput>) -> String {
        render(tools::execute_query(&self.ctx, &input.query, &input.db_id).await)
    }

    #[tool(
        description = "Execute a SQL query on the selected database and return results as JSON.\nIncludes column names, every row, and the total row count."
    )]
    async fn execute_query_json(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> String {
        render(tools::execute_query_json(&self.ctx, &input.query, &input.db_id).await)
    }

    #[tool(description = "Get the column names of a table as JSON.")]
    async fn get_table_columns(&self, Parameters(input): Parameters<TableInput>) -> String {
        render(tools::get_table_columns(&self.ctx, &input.table_name, &input.db_id).await)
    }

    #[tool(description = "Get the column types of a table as JSON.")]
    async fn get_table_types(&self, Parameters(input): Parameters<TableInput>) -> String {
        render(tools::get_table_types(&self.ctx, &input.table_name, &input.db_id).await)
    }

    #[tool(
        description = "Describe the structure of a table: column names with their types, one per line."
    )]
    async fn describe_table(&self, Parameters(input): Parameters<TableInput>) -> String {
        render(tools::describe_table(&self.ctx, &input.table_name, &input.db_id).await)
    }

    #[tool(
        description = "Fetch sample rows from a table as a markdown table.\nlimit defaults to 10 rows and is capped at 100."
    )]
    async fn get_table_sample(&self, Parameters(input): Parameters<TableSampleInput>) -> String {
        render(
            tools::get_table_sample(&self.ctx, &input.table_name, &input.db_id, input.limit).await,
        )
    }

    #[tool(
        description = "Find which databases contain a table with the given name.\nSearches the cached schema of every database."
    )]
    async fn find_table(&self, Parameters(input): Parameters<FindTableInput>) -> String {
        render(tools::find_table(&self.ctx, &input.table_name).await)
    }

    #[tool(description = "Get the queries executed in this session, most recent last.")]
    async fn get_query_history(&self) -> String {
        render(tools::get_query_history(&self.ctx).await)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "multidb-mcp-server".to_owned(),
                title: Some("Multi-Database MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Query tools for multiple SQL databases (PostgreSQL, MySQL, SQLite).\n\
                \n\
                ## Workflow\n\
                1. Call `list_databases` to see the configured databases and their IDs\n\
                2. Pass the `db_id` from step 1 to the query and inspection tools\n\
                3. Check `get_schema` or `describe_table` before writing queries\n\
                \n\
                ## Tools\n\
                - `list_databases`, `get_database_info`, `find_table`: discover databases and tables\n\
                - `get_schema`, `get_table_columns`, `get_table_types`, `describe_table`, `get_table_sample`: inspect structure and data\n\
                - `execute_query`, `execute_query_json`: run SQL, as a markdown table or JSON\n\
                - `get_query_history`: review the queries run in this session\n\
                \n\
                ## Resources and Prompts\n\
                - Resource `schema://all` is the schema of every database as JSON; `schema://{db_id}` is one database\n\
                - Prompts: `select_database`, `sql_query`, `explain_query`, `optimize_query`"
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            meta: None,
            resources: self.schema_resources(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let payload = self.schema_resource_payload(&request.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(payload, request.uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            meta: None,
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            meta: None,
            next_cursor: None,
            prompts: prompts::catalog(),
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        prompts::render(&request.name, request.arguments.as_ref())
    }
}
